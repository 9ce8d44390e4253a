// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render channel messages.
//!
//! Every frame is a JSON object tagged by `type`.

use animaflow_editor_graph::WireGraph;
use serde::{Deserialize, Serialize};

/// Prefix of a node-routed debug line: `[DEBUG:<node id>] <text>`
const DEBUG_TAG: &str = "[DEBUG:";

/// Messages sent to the render service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Compile and render a graph
    Render {
        /// Graph snapshot
        graph: WireGraph,
    },
    /// Keepalive
    Ping,
}

impl ClientMessage {
    /// Encode as a single JSON frame
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Messages received from the render service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Status line
    Status {
        /// Text
        message: String,
    },
    /// Progress line, possibly carrying a debug tag
    Progress {
        /// Text
        message: String,
    },
    /// Render finished
    Complete {
        /// Rendered media reference
        video_url: String,
        /// Generated code
        #[serde(default)]
        code: Option<String>,
    },
    /// Render failed
    Error {
        /// What went wrong
        message: String,
        /// Node the failure is attributed to
        #[serde(default)]
        node_id: Option<String>,
        /// Generated code, if it got that far
        #[serde(default)]
        code: Option<String>,
    },
    /// Keepalive answer
    Pong,
}

impl ServerMessage {
    /// Decode a JSON frame
    pub fn parse(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }
}

/// Split a `[DEBUG:<id>] <text>` line into node id and text.
///
/// The tag may appear anywhere in the line; `None` when it is absent or malformed.
pub fn parse_debug_tag(message: &str) -> Option<(&str, &str)> {
    let start = message.find(DEBUG_TAG)? + DEBUG_TAG.len();
    let rest = &message[start..];
    let end = rest.find(']')?;
    let node_id = rest[..end].trim();
    if node_id.is_empty() {
        return None;
    }
    Some((node_id, rest[end + 1..].trim()))
}
