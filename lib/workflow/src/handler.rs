//! Resolution of node types to configuration handlers.
//!
//! Every step is driven by a handler chosen from its
//! `(service, sub-service, role)` key. The registry is an explicit table
//! rather than nested matches at each call site, so adding a service means
//! adding rows here and nothing else.

use crate::node::{Node, NodeRole, ServiceKind, SubService};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The lookup key for a step's handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerKey {
    pub service: ServiceKind,
    pub sub_service: Option<SubService>,
    pub role: NodeRole,
}

impl HandlerKey {
    #[must_use]
    pub fn new(service: ServiceKind, sub_service: Option<SubService>, role: NodeRole) -> Self {
        Self {
            service,
            sub_service,
            role,
        }
    }
}

impl From<&Node> for HandlerKey {
    fn from(node: &Node) -> Self {
        Self::new(node.service.clone(), node.sub_service.clone(), node.role)
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_service {
            Some(sub) => write!(f, "{}/{}/{}", self.service, sub, self.role),
            None => write!(f, "{}/-/{}", self.service, self.role),
        }
    }
}

/// The configuration views available for steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    DriveTrigger,
    DriveAction,
    GmailTrigger,
    GmailAction,
    GithubTrigger,
    GithubAction,
}

/// Maps handler keys to handlers.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKey, HandlerKind>,
}

impl HandlerRegistry {
    /// Creates a registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the registry for the built-in services.
    #[must_use]
    pub fn standard() -> Self {
        use HandlerKind::*;
        use NodeRole::{Action, Trigger};

        let google = |sub: SubService, role| {
            HandlerKey::new(ServiceKind::Google, Some(sub), role)
        };
        let github = |role| HandlerKey::new(ServiceKind::Github, None, role);

        let mut registry = Self::empty();
        registry.register(google(SubService::GoogleDrive, Trigger), DriveTrigger);
        registry.register(google(SubService::GoogleDrive, Action), DriveAction);
        registry.register(google(SubService::GoogleMail, Trigger), GmailTrigger);
        registry.register(google(SubService::GoogleMail, Action), GmailAction);
        registry.register(github(Trigger), GithubTrigger);
        registry.register(github(Action), GithubAction);
        registry
    }

    /// Registers a handler, returning the one it replaced.
    pub fn register(&mut self, key: HandlerKey, kind: HandlerKind) -> Option<HandlerKind> {
        self.handlers.insert(key, kind)
    }

    /// Looks up the handler for a key.
    #[must_use]
    pub fn resolve(&self, key: &HandlerKey) -> Option<HandlerKind> {
        self.handlers.get(key).copied()
    }

    /// Returns the number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_six_keys() {
        assert_eq!(HandlerRegistry::standard().len(), 6);
    }

    #[test]
    fn resolves_by_sub_service_and_role() {
        let registry = HandlerRegistry::standard();
        let key = HandlerKey::new(
            ServiceKind::Google,
            Some(SubService::GoogleMail),
            NodeRole::Action,
        );
        assert_eq!(registry.resolve(&key), Some(HandlerKind::GmailAction));

        let key = HandlerKey::new(ServiceKind::Github, None, NodeRole::Trigger);
        assert_eq!(registry.resolve(&key), Some(HandlerKind::GithubTrigger));
    }

    #[test]
    fn google_without_sub_service_is_unmapped() {
        let registry = HandlerRegistry::standard();
        let key = HandlerKey::new(ServiceKind::Google, None, NodeRole::Trigger);
        assert_eq!(registry.resolve(&key), None);
    }

    #[test]
    fn unknown_service_is_unmapped() {
        let registry = HandlerRegistry::standard();
        let key = HandlerKey::new(ServiceKind::from("Slack"), None, NodeRole::Action);
        assert_eq!(registry.resolve(&key), None);
    }

    #[test]
    fn key_display() {
        let key = HandlerKey::new(
            ServiceKind::Google,
            Some(SubService::GoogleDrive),
            NodeRole::Trigger,
        );
        assert_eq!(key.to_string(), "Google/GoogleDrive/Trigger");
    }
}
