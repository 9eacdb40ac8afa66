//! Effective level resolution.

use crate::config::LevelConfig;
use crate::level::Level;

/// Effective level for `component` under `config`.
///
/// An override keyed by exactly `component` wins; otherwise the default level
/// applies. There is no prefix or hierarchy matching.
pub fn resolve(config: &LevelConfig, component: &str) -> Level {
    config
        .overrides
        .get(component)
        .copied()
        .unwrap_or(config.default_level)
}
