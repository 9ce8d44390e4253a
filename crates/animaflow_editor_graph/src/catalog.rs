// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-type catalog (registry) interface.
//!
//! The catalog is an external service; this module defines what the editor
//! needs from it plus an in-memory implementation for tests and offline use.

use crate::node::{Attributes, Node};
use crate::port::{PortType, Ports};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Category name used for definitions without one
pub const FALLBACK_CATEGORY: &str = "Other";

/// Errors from catalog lookups
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The kind is not registered
    #[error("Unknown node type: {0}")]
    UnknownKind(String),
    /// The registry could not be reached
    #[error("Node registry unavailable: {0}")]
    Unavailable(String),
    /// The registry answered with something unreadable
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}

/// Definition of a node kind as served by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Kind name, e.g. `Circle`
    #[serde(rename = "type")]
    pub kind: String,
    /// Human readable name
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    /// Palette category
    #[serde(default)]
    pub category: String,
    /// Input ports
    #[serde(default)]
    pub inputs: IndexMap<String, PortType>,
    /// Output ports
    #[serde(default)]
    pub outputs: IndexMap<String, PortType>,
    /// JSON schema of the attributes
    #[serde(default)]
    pub schema: Value,
}

impl NodeDefinition {
    /// Create a definition with no ports
    pub fn new(kind: impl Into<String>, category: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            display_name: kind.clone(),
            kind,
            category: category.into(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            schema: Value::Null,
        }
    }

    /// Add an input port
    pub fn with_input(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        self.inputs.insert(name.into(), port_type.into());
        self
    }

    /// Add an output port
    pub fn with_output(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Self {
        self.outputs.insert(name.into(), port_type.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Set the attribute schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Category, or [`FALLBACK_CATEGORY`] when empty
    pub fn category_or_default(&self) -> &str {
        if self.category.is_empty() {
            FALLBACK_CATEGORY
        } else {
            &self.category
        }
    }

    /// Port set for a new node of this kind
    pub fn ports(&self) -> Ports {
        Ports {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// Initial attributes: every schema property's default, `0` when absent or null
    pub fn default_attributes(&self) -> Attributes {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(key, property)| {
                        let default = match property.get("default") {
                            None | Some(Value::Null) => Value::from(0),
                            Some(value) => value.clone(),
                        };
                        (key.clone(), default)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Instantiate a node of this kind with default attributes
    pub fn instantiate(&self) -> Node {
        let mut node = Node::new(self.kind.clone(), self.ports());
        if !self.category.is_empty() {
            node.category = Some(self.category.clone());
        }
        node.attributes = self.default_attributes();
        node
    }
}

/// Source of node definitions
#[async_trait]
pub trait NodeCatalog: Send + Sync {
    /// Every registered kind
    async fn list(&self) -> Result<Vec<NodeDefinition>, CatalogError>;

    /// Full definition of one kind
    async fn get(&self, kind: &str) -> Result<NodeDefinition, CatalogError>;
}

/// Catalog backed by a local table
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    definitions: IndexMap<String, NodeDefinition>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any with the same kind
    pub fn register(&mut self, definition: NodeDefinition) {
        self.definitions.insert(definition.kind.clone(), definition);
    }

    /// Builder form of [`InMemoryCatalog::register`]
    pub fn with(mut self, definition: NodeDefinition) -> Self {
        self.register(definition);
        self
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[async_trait]
impl NodeCatalog for InMemoryCatalog {
    async fn list(&self) -> Result<Vec<NodeDefinition>, CatalogError> {
        Ok(self.definitions.values().cloned().collect())
    }

    async fn get(&self, kind: &str) -> Result<NodeDefinition, CatalogError> {
        self.definitions
            .get(kind)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownKind(kind.to_string()))
    }
}
