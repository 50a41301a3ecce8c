//! Plugin registry - active and disabled plugin sets

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use super::trait_def::Plugin;

/// Result of trying to move a plugin into the active set
pub enum Activation {
    /// Moved from disabled to active; its `on_start` is due
    Activated(Arc<dyn Plugin>),
    /// Already active, nothing moved
    AlreadyActive,
    /// Neither active nor disabled
    Unknown,
}

#[derive(Default)]
struct PluginSets {
    active: BTreeMap<String, Arc<dyn Plugin>>,
    disabled: BTreeMap<String, Arc<dyn Plugin>>,
}

/// Registry of compiled-in plugins.
///
/// Every identifier lives in at most one of the two sets. The registry only
/// moves entries; lifecycle hooks are run by the caller after the lock is
/// released, since hooks register commands and may re-enter the registry.
#[derive(Default)]
pub struct PluginRegistry {
    sets: RwLock<PluginSets>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PluginSets> {
        self.sets.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert into the active set, replacing any plugin with the same id
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> bool {
        let id = plugin.id().to_string();
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);

        let was_disabled = sets.disabled.remove(&id).is_some();
        let was_active = sets.active.insert(id, plugin).is_some();
        was_active || was_disabled
    }

    /// Move from active to disabled, returning the moved plugin
    pub fn deactivate(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);

        let plugin = sets.active.remove(id)?;
        sets.disabled.insert(id.to_string(), Arc::clone(&plugin));
        Some(plugin)
    }

    /// Move from disabled to active
    pub fn activate(&self, id: &str) -> Activation {
        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);

        if sets.active.contains_key(id) {
            return Activation::AlreadyActive;
        }
        match sets.disabled.remove(id) {
            Some(plugin) => {
                sets.active.insert(id.to_string(), Arc::clone(&plugin));
                Activation::Activated(plugin)
            }
            None => Activation::Unknown,
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.read().active.contains_key(id)
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.read().disabled.contains_key(id)
    }

    /// Active plugin ids, sorted
    pub fn active_ids(&self) -> Vec<String> {
        self.read().active.keys().cloned().collect()
    }

    /// Disabled plugin ids, sorted
    pub fn disabled_ids(&self) -> Vec<String> {
        self.read().disabled.keys().cloned().collect()
    }

    /// Snapshot of the active plugins, by id
    pub fn active(&self) -> Vec<Arc<dyn Plugin>> {
        self.read().active.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let sets = self.read();
        sets.active.len() + sets.disabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Command;

    struct Dummy(&'static str);

    #[async_trait::async_trait]
    impl Plugin for Dummy {
        fn id(&self) -> &str {
            self.0
        }

        fn commands(&self) -> Vec<Command> {
            Vec::new()
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = PluginRegistry::new();
        assert!(!registry.register(Arc::new(Dummy("a.Plugin"))));
        assert!(registry.register(Arc::new(Dummy("a.Plugin"))));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_active("a.Plugin"));
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Dummy("a.Plugin")));

        assert!(registry.deactivate("a.Plugin").is_some());
        assert!(!registry.is_active("a.Plugin"));
        assert!(registry.is_disabled("a.Plugin"));
        assert!(registry.deactivate("a.Plugin").is_none());

        // re-registering a disabled plugin puts it back in the active set only
        registry.register(Arc::new(Dummy("a.Plugin")));
        assert!(registry.is_active("a.Plugin"));
        assert!(!registry.is_disabled("a.Plugin"));
    }

    #[test]
    fn test_activate() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Dummy("a.Plugin")));

        assert!(matches!(registry.activate("a.Plugin"), Activation::AlreadyActive));
        assert!(matches!(registry.activate("b.Plugin"), Activation::Unknown));

        registry.deactivate("a.Plugin");
        assert!(matches!(registry.activate("a.Plugin"), Activation::Activated(_)));
        assert_eq!(registry.active_ids(), vec!["a.Plugin"]);
        assert!(registry.disabled_ids().is_empty());
    }

    #[test]
    fn test_reads_survive_poisoned_lock() {
        let registry = Arc::new(PluginRegistry::new());
        registry.register(Arc::new(Dummy("a.Plugin")));

        let poisoner = Arc::clone(&registry);
        let panicked = std::thread::spawn(move || {
            let _guard = poisoner.sets.write().unwrap();
            panic!("poison the plugin sets");
        })
        .join();
        assert!(panicked.is_err());
        assert!(registry.sets.is_poisoned());

        assert!(registry.is_active("a.Plugin"));
        assert_eq!(registry.active_ids(), vec!["a.Plugin"]);
        assert_eq!(registry.active().len(), 1);
        assert!(registry.deactivate("a.Plugin").is_some());
        assert_eq!(registry.disabled_ids(), vec!["a.Plugin"]);
        assert_eq!(registry.len(), 1);
    }
}
