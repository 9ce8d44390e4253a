// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions and the port type compatibility rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard type tag accepted by pass-through junction nodes
pub const ANY_TYPE: &str = "Any";

/// Base categories and the concrete tags an input of that category accepts.
const TYPE_HIERARCHY: &[(&str, &[&str])] = &[
    (
        "Mobject",
        &[
            "Mobject", "shape", "mobject", "group", "text", "axes", "plane", "tex", "vector",
            "dot", "arrow",
        ],
    ),
    ("Animation", &["Animation"]),
    ("Color", &["Color"]),
];

/// Older lowercase tags that still interoperate with `Mobject` in both directions.
const LEGACY_MOBJECT_ALIASES: &[&str] = &["shape", "mobject", "group"];

/// Decide whether an output port of `output` type may feed an input port of `input` type.
///
/// Pure and allocation-free; safe to call while filtering large node lists.
pub fn is_compatible(output: &str, input: &str) -> bool {
    if output == input {
        return true;
    }

    if output == ANY_TYPE || input == ANY_TYPE {
        return true;
    }

    let listed = TYPE_HIERARCHY
        .iter()
        .any(|(base, subtypes)| input == *base && subtypes.contains(&output));
    if listed {
        return true;
    }

    (input == "Mobject" && LEGACY_MOBJECT_ALIASES.contains(&output))
        || (output == "Mobject" && LEGACY_MOBJECT_ALIASES.contains(&input))
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port (edge target)
    Input,
    /// Output port (edge source)
    Output,
}

impl PortDirection {
    /// The direction a port on the other end of an edge must have
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Type tag carried by a port, e.g. `Mobject`, `Animation`, `Any`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortType(pub String);

impl PortType {
    /// Create a port type from a tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The wildcard type
    pub fn any() -> Self {
        Self(ANY_TYPE.to_string())
    }

    /// Get the raw tag
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this type, used as an output, can feed `input`
    pub fn can_connect_to(&self, input: &PortType) -> bool {
        is_compatible(&self.0, &input.0)
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Named, typed ports of a node, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ports {
    /// Input ports by name
    pub inputs: IndexMap<String, PortType>,
    /// Output ports by name
    pub outputs: IndexMap<String, PortType>,
}

impl Ports {
    /// Create an empty port set
    pub fn new() -> Self {
        Self::default()
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

    /// Ports on one side
    pub fn side(&self, direction: PortDirection) -> &IndexMap<String, PortType> {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    /// Type of a named port
    pub fn port_type(&self, direction: PortDirection, name: &str) -> Option<&PortType> {
        self.side(direction).get(name)
    }

    /// Number of port rows a node needs to display these ports
    pub fn row_count(&self) -> usize {
        self.inputs.len().max(self.outputs.len())
    }

    /// First port on `direction` that can pair with a port of type `other`
    /// sitting on the opposite end of an edge.
    pub fn first_compatible(&self, direction: PortDirection, other: &PortType) -> Option<&str> {
        self.side(direction)
            .iter()
            .find(|(_, port_type)| match direction {
                PortDirection::Input => other.can_connect_to(port_type),
                PortDirection::Output => port_type.can_connect_to(other),
            })
            .map(|(name, _)| name.as_str())
    }
}
