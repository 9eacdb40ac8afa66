//! Component to handle bindings and level application.
//!
//! The registry owns the configuration currently in effect and a map of
//! component names to logger handles. It never owns the handles themselves:
//! bindings are `Weak`, so a handle dropped by its creator is skipped on the
//! next application.
//!
//! Registration and application serialize on one mutex. The new configuration
//! is committed only after every live handle has been updated, so nobody can
//! observe a registry that claims a configuration its handles do not reflect.

mod resolver;

pub use resolver::resolve;

use crate::config::{LEVEL_CHANGER_COMPONENT, LevelConfig};
use crate::level::Level;
use crate::logging::Logger;
use arc_swap::ArcSwap;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// A live logger handle whose level can be read and written.
///
/// Implementations must make `set_level` visible to concurrent emitters
/// without external locking.
pub trait LevelHandle: Send + Sync {
    /// Current level of the handle.
    fn level(&self) -> Level;

    /// Replace the level of the handle.
    fn set_level(&self, level: Level);
}

/// Registry of named logger handles and the configuration applied to them.
pub struct LevelRegistry {
    bindings: Mutex<HashMap<String, Weak<dyn LevelHandle>>>,
    current: ArcSwap<LevelConfig>,
    /// The subsystem's own logger, registered as `LevelChanger`.
    diagnostics: Logger,
}

impl LevelRegistry {
    /// Create a registry holding `initial` as the current configuration.
    ///
    /// The registry's diagnostic logger is registered immediately, so its
    /// verbosity is controlled by the same file as everything else.
    pub fn new(initial: LevelConfig) -> Self {
        let diagnostics = Logger::new(LEVEL_CHANGER_COMPONENT, initial.default_level);
        let registry = Self {
            bindings: Mutex::new(HashMap::new()),
            current: ArcSwap::from_pointee(initial),
            diagnostics,
        };
        registry.register(LEVEL_CHANGER_COMPONENT, registry.diagnostics.level_filter());
        registry
    }

    /// Configuration currently in effect.
    pub fn current(&self) -> Arc<LevelConfig> {
        self.current.load_full()
    }

    /// Logger used for the subsystem's own diagnostics.
    pub fn diagnostics(&self) -> &Logger {
        &self.diagnostics
    }

    /// Bind `handle` to `component` and apply its effective level right away.
    ///
    /// Registering a name again replaces the previous binding.
    pub fn register<H: LevelHandle + 'static>(&self, component: &str, handle: &Arc<H>) {
        let weak: Weak<H> = Arc::downgrade(handle);
        let weak: Weak<dyn LevelHandle> = weak;
        let mut bindings = self.bindings.lock().unwrap();
        let config = self.current.load();
        self.apply_one(&config, component, &**handle);
        bindings.insert(component.to_string(), weak);
    }

    /// Apply `config` to every live binding, then commit it as current.
    ///
    /// Returns the number of handles that were updated.
    pub fn apply_all(&self, config: Arc<LevelConfig>) -> usize {
        let bindings = self.bindings.lock().unwrap();
        let mut applied = 0;
        for (component, weak) in bindings.iter() {
            match weak.upgrade() {
                Some(handle) => {
                    self.apply_one(&config, component, &*handle);
                    applied += 1;
                }
                None => self
                    .diagnostics
                    .trace(&format!("Skipping dropped logger {}", component)),
            }
        }
        self.current.store(config);
        applied
    }

    /// Whether a binding exists for `component`.
    pub fn is_registered(&self, component: &str) -> bool {
        self.bindings.lock().unwrap().contains_key(component)
    }

    /// Registered component names, sorted.
    pub fn components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of bindings, including ones whose handle was dropped.
    pub fn len(&self) -> usize {
        self.bindings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_one(&self, config: &LevelConfig, component: &str, handle: &dyn LevelHandle) {
        let level = resolve(config, component);
        if self.diagnostics.enabled(Level::Trace) {
            self.diagnostics.log_with_data(
                Level::Trace,
                "Changing logger level",
                json!({ "component": component, "level": level }),
            );
        }
        handle.set_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevelFilter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handle that counts how often its level was written.
    struct CountingHandle {
        filter: LogLevelFilter,
        writes: AtomicUsize,
    }

    impl CountingHandle {
        fn new(level: Level) -> Arc<Self> {
            Arc::new(Self {
                filter: LogLevelFilter::new(level),
                writes: AtomicUsize::new(0),
            })
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl LevelHandle for CountingHandle {
        fn level(&self) -> Level {
            self.filter.get()
        }

        fn set_level(&self, level: Level) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.filter.set(level);
        }
    }

    #[test]
    fn test_new_registers_diagnostics_logger() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Warn));
        assert!(registry.is_registered(LEVEL_CHANGER_COMPONENT));
        assert_eq!(registry.diagnostics().level(), Level::Warn);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_applies_current_level() {
        let registry = LevelRegistry::new(
            LevelConfig::new(Level::Info).with_override("Foo", Level::Error),
        );
        let foo = CountingHandle::new(Level::Fatal);
        let bar = CountingHandle::new(Level::Fatal);

        registry.register("Foo", &foo);
        registry.register("Bar", &bar);

        assert_eq!(foo.level(), Level::Error);
        assert_eq!(bar.level(), Level::Info);
    }

    #[test]
    fn test_register_twice_keeps_one_entry() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Debug));
        let handle = CountingHandle::new(Level::Fatal);

        registry.register("Foo", &handle);
        registry.register("Foo", &handle);

        assert_eq!(handle.writes(), 2);
        assert_eq!(handle.level(), Level::Debug);
        assert_eq!(registry.components(), vec!["Foo".to_string(), LEVEL_CHANGER_COMPONENT.to_string()]);
    }

    #[test]
    fn test_reregister_replaces_binding() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Info));
        let old = CountingHandle::new(Level::Fatal);
        let new = CountingHandle::new(Level::Fatal);

        registry.register("Foo", &old);
        registry.register("Foo", &new);
        registry.apply_all(Arc::new(LevelConfig::new(Level::Trace)));

        assert_eq!(old.level(), Level::Info);
        assert_eq!(new.level(), Level::Trace);
    }

    #[test]
    fn test_apply_all_updates_every_handle_and_commits() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Info));
        let foo = CountingHandle::new(Level::Info);
        let bar = CountingHandle::new(Level::Info);
        registry.register("Foo", &foo);
        registry.register("Bar", &bar);

        let next = Arc::new(LevelConfig::new(Level::Info).with_override("Foo", Level::Warn));
        let applied = registry.apply_all(Arc::clone(&next));

        assert_eq!(applied, 3);
        assert_eq!(foo.level(), Level::Warn);
        assert_eq!(bar.level(), Level::Info);
        assert!(Arc::ptr_eq(&registry.current(), &next));
    }

    #[test]
    fn test_apply_all_skips_dropped_handles() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Info));
        let kept = CountingHandle::new(Level::Info);
        {
            let dropped = CountingHandle::new(Level::Info);
            registry.register("Gone", &dropped);
        }
        registry.register("Kept", &kept);

        let applied = registry.apply_all(Arc::new(LevelConfig::new(Level::Error)));

        assert_eq!(applied, 2);
        assert_eq!(kept.level(), Level::Error);
        assert!(registry.is_registered("Gone"));
    }

    #[test]
    fn test_mixed_handle_types_share_registry() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Info));
        let filter = Arc::new(LogLevelFilter::new(Level::Fatal));
        let counting = CountingHandle::new(Level::Fatal);
        registry.register("Filter", &filter);
        registry.register("Counting", &counting);

        let applied = registry.apply_all(Arc::new(
            LevelConfig::new(Level::Warn).with_override("Filter", Level::Debug),
        ));

        assert_eq!(applied, 3);
        assert_eq!(filter.get(), Level::Debug);
        assert_eq!(counting.level(), Level::Warn);
        assert_eq!(counting.writes(), 2);
    }

    #[test]
    fn test_diagnostics_logger_follows_override() {
        let registry = LevelRegistry::new(LevelConfig::new(Level::Info));
        registry.apply_all(Arc::new(
            LevelConfig::new(Level::Info).with_override(LEVEL_CHANGER_COMPONENT, Level::Trace),
        ));
        assert_eq!(registry.diagnostics().level(), Level::Trace);
    }
}
