// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render client: a channel plus the session it feeds.

use crate::channel::{ChannelConfig, ChannelError, ChannelEvent, ChannelState, RenderChannel};
use crate::session::{RenderSession, SessionError};
use crate::transport::Connector;
use animaflow_editor_graph::{Graph, GraphChange};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Render client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Session refused the request
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Channel refused the frame
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Owns the render channel and session; the event loop drives it
#[derive(Debug)]
pub struct RenderClient {
    channel: RenderChannel,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    session: RenderSession,
}

impl RenderClient {
    /// Start a client over `connector`
    pub fn spawn(connector: Arc<dyn Connector>, config: ChannelConfig) -> Self {
        let (channel, events) = RenderChannel::spawn(connector, config);
        Self {
            channel,
            events,
            session: RenderSession::new(),
        }
    }

    /// Session state
    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    /// Channel state
    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Submit `graph` for rendering
    pub fn render(&mut self, graph: &mut Graph) -> Result<(), ClientError> {
        let request = self.session.begin_render(graph, self.channel.is_connected())?;
        if let Err(err) = self.channel.send(request) {
            // The channel dropped between the check and the send
            self.session.abort(err.to_string());
            return Err(err.into());
        }
        Ok(())
    }

    /// Wait for the next channel event. `None` once the channel has stopped.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Apply one channel event to the graph and session
    pub fn handle_event(&mut self, graph: &mut Graph, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(message) => self.session.apply(graph, message),
            ChannelEvent::Connected => tracing::debug!("Render channel up"),
            ChannelEvent::Disconnected => tracing::debug!("Render channel down"),
        }
    }

    /// Forward local graph changes to the session
    pub fn on_graph_changed(&mut self, changes: &[GraphChange]) {
        self.session.on_graph_changed(changes);
    }
}
