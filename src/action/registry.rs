use std::collections::HashMap;

use parking_lot::RwLock;

use super::ActionDef;
use crate::model::{Resource, ResourceKey};

/// Operations permitted for each kind, registered at startup alongside the kinds themselves
#[derive(Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<ResourceKey, Vec<ActionDef>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action for a kind.
    ///
    /// An action with the same name is replaced in place, keeping its position.
    pub fn register(&self, key: &ResourceKey, action: ActionDef) {
        let mut actions = self.actions.write();
        let list = actions.entry(key.clone()).or_default();
        if let Some(existing) = list.iter_mut().find(|a| a.name == action.name) {
            tracing::warn!("Action {} was already registered for {key}, replacing it", action.name);
            *existing = action;
        } else {
            tracing::trace!("Registered action {} for {key}", action.name);
            list.push(action);
        }
    }

    /// Every action registered for the kind, in registration order
    pub fn actions_for(&self, key: &ResourceKey) -> Vec<ActionDef> {
        self.actions.read().get(key).cloned().unwrap_or_default()
    }

    /// The actions of the kind that can be applied to the given resource
    pub fn applicable(&self, key: &ResourceKey, resource: &Resource) -> Vec<ActionDef> {
        self.actions
            .read()
            .get(key)
            .map(|list| list.iter().filter(|a| a.applies_to(resource)).cloned().collect())
            .unwrap_or_default()
    }

    /// Finds the action bound to the shortcut that can be applied to the given resource
    pub fn find_by_shortcut(&self, key: &ResourceKey, shortcut: char, resource: &Resource) -> Option<ActionDef> {
        self.actions
            .read()
            .get(key)
            .and_then(|list| {
                list.iter()
                    .find(|a| a.shortcut == shortcut && a.applies_to(resource))
                    .cloned()
            })
    }

    /// Finds the action bound to the shortcut, regardless of whether it applies to any resource
    pub fn bound_to(&self, key: &ResourceKey, shortcut: char) -> Option<ActionDef> {
        self.actions
            .read()
            .get(key)
            .and_then(|list| list.iter().find(|a| a.shortcut == shortcut).cloned())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn key() -> ResourceKey {
        ResourceKey::new("ec2", "instances")
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ActionRegistry::new();
        registry.register(&key(), ActionDef::exec("ssh", 'x', "ssh ${PRIVATE_IP}"));
        registry.register(
            &key(),
            ActionDef::api("start", 's', "StartInstances").when_field_in("State", vec![String::from("stopped")]),
        );
        registry.register(&key(), ActionDef::exec("ssh", 'X', "ssh -v ${PRIVATE_IP}"));

        let names = registry.actions_for(&key()).into_iter().map(|a| a.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["ssh", "start"]);
        assert_eq!(registry.bound_to(&key(), 'X').map(|a| a.name), Some(String::from("ssh")));
        assert!(registry.bound_to(&key(), 'x').is_none());
        assert!(registry.actions_for(&ResourceKey::new("sqs", "queues")).is_empty());

        let running = Resource::new("i-1").with_raw(json!({ "State": "running" }));
        let applicable = registry.applicable(&key(), &running);
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].name, "ssh");
    }

    #[test]
    fn test_shortcut_lookup_filters_by_applicability() {
        let registry = ActionRegistry::new();
        registry.register(
            &key(),
            ActionDef::api("start", 's', "StartInstances").when_field_in("State", vec![String::from("stopped")]),
        );
        let running = Resource::new("i-1").with_raw(json!({ "State": "running" }));
        let stopped = Resource::new("i-2").with_raw(json!({ "State": "stopped" }));

        assert!(registry.find_by_shortcut(&key(), 's', &running).is_none());
        assert_eq!(
            registry.find_by_shortcut(&key(), 's', &stopped).map(|a| a.name),
            Some(String::from("start"))
        );
        assert!(registry.bound_to(&key(), 's').is_some());
    }
}
