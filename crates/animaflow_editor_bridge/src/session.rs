// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render session state and diagnostics routing.
//!
//! The session holds everything the editor shows about the current render:
//! the in-progress flag, the log, the result and the last error. Inbound
//! messages are applied here, on the event loop, so diagnostics never race
//! local edits.

use crate::protocol::{parse_debug_tag, ClientMessage, ServerMessage};
use animaflow_editor_graph::{Graph, GraphChange, NodeId, WireGraph};
use thiserror::Error;

/// Log line appended when a render completes
pub const COMPLETE_LOG_LINE: &str = "Render complete!";

/// Why a render could not be submitted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A render is already running
    #[error("A render is already in progress")]
    AlreadyRendering,
    /// The channel is down
    #[error("Not connected to the render service")]
    NotConnected,
}

/// State of the current render
#[derive(Debug, Clone, Default)]
pub struct RenderSession {
    rendering: bool,
    video_url: Option<String>,
    generated_code: Option<String>,
    error: Option<String>,
    log: Vec<String>,
    debug_log: Vec<String>,
}

impl RenderSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a render is in flight
    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Media reference of the last successful render
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    /// Code generated by the last render
    pub fn generated_code(&self) -> Option<&str> {
        self.generated_code.as_deref()
    }

    /// Last global error
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Status and progress lines, in arrival order
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Debug-tagged progress lines
    pub fn debug_log(&self) -> &[String] {
        &self.debug_log
    }

    /// Prepare a render request.
    ///
    /// Clears all node and edge diagnostics and the previous result, then
    /// snapshots the graph. Refused while a render is running, or when the
    /// channel is down (the refusal is also stored as the session error).
    pub fn begin_render(
        &mut self,
        graph: &mut Graph,
        connected: bool,
    ) -> Result<ClientMessage, SessionError> {
        if self.rendering {
            return Err(SessionError::AlreadyRendering);
        }
        if !connected {
            self.error = Some(SessionError::NotConnected.to_string());
            return Err(SessionError::NotConnected);
        }

        graph.clear_diagnostics();
        self.video_url = None;
        self.generated_code = None;
        self.error = None;
        self.log.clear();
        self.debug_log.clear();
        self.rendering = true;
        tracing::info!("Submitting render of {}", graph.name);

        Ok(ClientMessage::Render {
            graph: WireGraph::from_graph(graph),
        })
    }

    /// Drop an in-flight render that never reached the service
    pub fn abort(&mut self, reason: String) {
        self.rendering = false;
        self.error = Some(reason);
    }

    /// Apply one inbound message
    pub fn apply(&mut self, graph: &mut Graph, message: ServerMessage) {
        match message {
            ServerMessage::Status { message } => self.log.push(message),
            ServerMessage::Progress { message } => {
                if let Some((node_id, text)) = parse_debug_tag(&message) {
                    if !graph.set_node_debug(&NodeId::new(node_id), text) {
                        tracing::warn!("Debug output for unknown node {node_id}");
                    }
                    self.debug_log.push(message.clone());
                }
                self.log.push(message);
            }
            ServerMessage::Complete { video_url, code } => {
                self.rendering = false;
                tracing::info!("Render complete: {video_url}");
                self.video_url = Some(video_url);
                if code.is_some() {
                    self.generated_code = code;
                }
                self.log.push(COMPLETE_LOG_LINE.to_string());
            }
            ServerMessage::Error { message, node_id, code } => {
                self.rendering = false;
                tracing::warn!("Render failed: {message}");
                if let Some(node_id) = node_id {
                    let node_id = NodeId::new(node_id);
                    if graph.set_node_error(&node_id, message.clone()) {
                        graph.flag_edges_for_node(&node_id);
                    } else {
                        tracing::warn!("Render error names unknown node {node_id}");
                    }
                }
                if code.is_some() {
                    self.generated_code = code;
                }
                self.log.push(format!("Error: {message}"));
                self.error = Some(message);
            }
            ServerMessage::Pong => {}
        }
    }

    /// Clear the global error once the user edits the graph
    pub fn on_graph_changed(&mut self, changes: &[GraphChange]) {
        if self.error.is_some() && changes.iter().any(GraphChange::is_edit) {
            self.error = None;
        }
    }
}
