//! Level configuration: schema types, settings and the file loader.
//!
//! ## Data Flow
//! ```text
//! levels.json / levels.yaml
//!     -> loader::read_document (read + parse)
//!     -> loader::validate      (schema check)
//!     -> Arc<LevelConfig>      (validated, immutable)
//!     -> LevelRegistry::apply_all
//! ```
//!
//! ## Environment Variables
//! - `LEVEL_WATCH_PATH` - Watched level file (default: `levels.json`)
//! - `LEVEL_WATCH_LEVEL` - Initial default level (default: `info`)
//! - `LEVEL_WATCH_BACKOFF_SECS` - Watch restart backoff (default: 10)

pub mod loader;
mod types;

pub use loader::{load, parse_document, read_document, validate, validate_or_previous};
pub use types::*;
