use std::collections::BTreeMap;
use std::fmt;

use crate::xml::Element;

pub(crate) const SEQUENCE_FLOW: &str = "sequenceFlow";
pub(crate) const ID: &str = "id";
pub(crate) const NAME: &str = "name";
pub(crate) const SOURCE_REF: &str = "sourceRef";
pub(crate) const TARGET_REF: &str = "targetRef";

/// Structural role of a flow node, derived from the element's local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    StartEvent,
    EndEvent,
    ServiceTask,
    Other(String),
}

impl Role {
    pub fn from_local_name(name: &str) -> Self {
        match name {
            "startEvent" => Role::StartEvent,
            "endEvent" => Role::EndEvent,
            "serviceTask" => Role::ServiceTask,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn local_name(&self) -> &str {
        match self {
            Role::StartEvent => "startEvent",
            Role::EndEvent => "endEvent",
            Role::ServiceTask => "serviceTask",
            Role::Other(name) => name,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Snapshot of a process child that is not a sequence flow.
///
/// Two nodes are equal when their identifiers are equal.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: String,
    pub name: Option<String>,
    pub role: Role,
    /// Every attribute other than `id` and `name`, keyed by qualified name.
    pub attributes: BTreeMap<String, String>,
}

impl FlowNode {
    pub(crate) fn from_element(element: &Element) -> Self {
        let attributes = element
            .attributes()
            .filter(|(key, _)| *key != ID && *key != NAME)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self {
            id: element.attribute(ID).unwrap_or_default().to_string(),
            name: element.attribute(NAME).map(str::to_string),
            role: Role::from_local_name(element.local_name()),
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl PartialEq for FlowNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FlowNode {}

/// Snapshot of a sequence flow, including where it sat in the process's
/// child list when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFlow {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
    pub(crate) position: usize,
}

impl SequenceFlow {
    pub(crate) fn from_element(position: usize, element: &Element) -> Self {
        Self {
            id: element.attribute(ID).unwrap_or_default().to_string(),
            source_ref: element.attribute(SOURCE_REF).unwrap_or_default().to_string(),
            target_ref: element.attribute(TARGET_REF).unwrap_or_default().to_string(),
            position,
        }
    }
}

/// Caller-supplied description of a custom service task.
///
/// `type` and `topic` are reserved: they land on the vendor execution
/// attributes (`camunda:type` / `camunda:topic` by default). Every other key is
/// written to the element verbatim, so a key such as `camunda:class` must
/// carry its own prefix.
///
/// Keys keep the order they were first inserted in and are applied to the
/// element in that order, so when `type` and `camunda:type` are both given the
/// later one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAttributes {
    name: String,
    values: Vec<(String, String)>,
}

impl TaskAttributes {
    pub const TYPE: &'static str = "type";
    pub const TOPIC: &'static str = "topic";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Builds from a flat map; `None` when the map carries no `name`.
    pub fn from_map(mut values: BTreeMap<String, String>) -> Option<Self> {
        let name = values.remove(NAME)?;
        Some(Self {
            name,
            values: values.into_iter().collect(),
        })
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key == NAME {
            self.name = value;
            return;
        }
        match self.values.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key, value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes other than `name`, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
