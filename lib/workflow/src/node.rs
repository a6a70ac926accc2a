//! Workflow node types.
//!
//! A node is one step of an automation. Each node has:
//! - An id that never changes once created
//! - A service kind (and optional sub-service) naming what it talks to
//! - A role: the single trigger that starts the workflow, or an action
//! - Descriptive fields and a canvas position, both freely editable

use flowline_core::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The third-party service a node belongs to.
///
/// Unrecognized names coming from storage are kept verbatim in `Other` so
/// that newer or hand-edited data still loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceKind {
    Google,
    Github,
    Other(String),
}

impl ServiceKind {
    /// Returns the canonical name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Google => "Google",
            Self::Github => "Github",
            Self::Other(name) => name,
        }
    }

    /// Returns whether a node of this kind may start a workflow.
    #[must_use]
    pub fn can_trigger(&self) -> bool {
        matches!(self, Self::Google | Self::Github)
    }
}

impl From<String> for ServiceKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Google" => Self::Google,
            "Github" => Self::Github,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for ServiceKind {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<ServiceKind> for String {
    fn from(kind: ServiceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product within a service kind (e.g. Drive or Gmail within Google).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubService {
    GoogleDrive,
    GoogleMail,
    Other(String),
}

impl SubService {
    /// Returns the canonical name of this sub-service.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GoogleDrive => "GoogleDrive",
            Self::GoogleMail => "GoogleMail",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for SubService {
    fn from(name: String) -> Self {
        match name.as_str() {
            "GoogleDrive" => Self::GoogleDrive,
            "GoogleMail" => Self::GoogleMail,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for SubService {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<SubService> for String {
    fn from(sub: SubService) -> Self {
        sub.as_str().to_string()
    }
}

impl fmt::Display for SubService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a node starts the workflow or performs work after it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Trigger,
    Action,
}

impl NodeRole {
    /// Returns the canonical name of this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Action => "Action",
        }
    }

    /// Parses a canonical role name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Trigger" => Some(Self::Trigger),
            "Action" => Some(Self::Action),
            _ => None,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier of this node within its graph.
    pub id: NodeId,
    /// The service this node talks to.
    pub service: ServiceKind,
    /// The product within the service, if the service has several.
    pub sub_service: Option<SubService>,
    /// Trigger or action.
    pub role: NodeRole,
    /// Human-readable name, shown as the node label.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Canvas position.
    pub position: Position,
}

impl Node {
    /// Returns whether this node is the workflow's trigger.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.role == NodeRole::Trigger
    }
}

/// The caller-supplied part of a new node.
///
/// Anything left unset is filled in by the graph when the node is added:
/// the role follows the first-node-is-trigger rule and the name and
/// description follow the `"<Kind> <Role>"` convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDraft {
    pub service: ServiceKind,
    #[serde(default)]
    pub sub_service: Option<SubService>,
    #[serde(default)]
    pub role: Option<NodeRole>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: Position,
}

impl NodeDraft {
    /// Creates a draft for the given service kind.
    #[must_use]
    pub fn new(service: impl Into<ServiceKind>) -> Self {
        Self {
            service: service.into(),
            sub_service: None,
            role: None,
            name: None,
            description: None,
            position: Position::default(),
        }
    }

    /// Sets the sub-service.
    #[must_use]
    pub fn with_sub_service(mut self, sub_service: impl Into<SubService>) -> Self {
        self.sub_service = Some(sub_service.into());
        self
    }

    /// Forces the role instead of deriving it from the graph.
    #[must_use]
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Builds the node, assigning a fresh id and the given default role.
    pub(crate) fn into_node(self, default_role: NodeRole) -> Node {
        let role = self.role.unwrap_or(default_role);
        let name = self
            .name
            .unwrap_or_else(|| format!("{} {}", self.service, role));
        let description = self.description.unwrap_or_else(|| {
            format!(
                "This is a {} node for {}.",
                role.as_str().to_lowercase(),
                self.service
            )
        });
        Node {
            id: NodeId::generate(),
            service: self.service,
            sub_service: self.sub_service,
            role,
            name,
            description,
            position: self.position,
        }
    }
}
