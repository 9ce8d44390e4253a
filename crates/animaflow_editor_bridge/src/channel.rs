// SPDX-License-Identifier: MIT OR Apache-2.0
//! Auto-reconnecting render channel.
//!
//! A supervisor task owns the transport. It reconnects after drops, sends a
//! keepalive ping while connected, and forwards every inbound message and
//! connection transition as a [`ChannelEvent`] on one queue, so the event
//! loop consumes them in order alongside local edits.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::{Connection, Connector};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The service is not reachable right now
    #[error("Not connected to the render service")]
    NotConnected,
    /// The supervisor has stopped
    #[error("Render channel closed")]
    Closed,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Connection attempt in progress
    Connecting,
    /// Open
    Connected,
    /// Down, waiting to retry
    Disconnected,
}

/// Something that happened on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection was established
    Connected,
    /// The connection dropped
    Disconnected,
    /// A message arrived
    Message(ServerMessage),
}

/// Channel timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Keepalive period while connected
    pub ping_interval: Duration,
    /// Pause before reconnecting
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Handle to the render channel supervisor
pub struct RenderChannel {
    state: Arc<RwLock<ChannelState>>,
    commands: mpsc::UnboundedSender<ClientMessage>,
    task: JoinHandle<()>,
}

impl RenderChannel {
    /// Start the supervisor. Events arrive on the returned receiver.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        config: ChannelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let state = Arc::new(RwLock::new(ChannelState::Connecting));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(supervise(
            connector,
            config,
            Arc::clone(&state),
            commands_rx,
            events,
        ));

        (Self { state, commands, task }, events_rx)
    }

    /// Current state
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// True when connected
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Queue a message. Refused unless connected.
    pub fn send(&self, message: ClientMessage) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.commands.send(message).map_err(|_| ChannelError::Closed)
    }
}

impl Drop for RenderChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for RenderChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderChannel")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn set_state(state: &RwLock<ChannelState>, value: ChannelState) {
    *state.write() = value;
}

async fn supervise(
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    state: Arc<RwLock<ChannelState>>,
    mut commands: mpsc::UnboundedReceiver<ClientMessage>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    loop {
        set_state(&state, ChannelState::Connecting);
        match connector.connect().await {
            Ok(connection) => {
                set_state(&state, ChannelState::Connected);
                tracing::info!("Connected to render service");
                if events.send(ChannelEvent::Connected).is_err() {
                    return;
                }

                let keep_running =
                    run_connection(connection, &config, &mut commands, &events).await;

                set_state(&state, ChannelState::Disconnected);
                tracing::info!("Disconnected from render service");
                if !keep_running || events.send(ChannelEvent::Disconnected).is_err() {
                    return;
                }
            }
            Err(err) => {
                set_state(&state, ChannelState::Disconnected);
                tracing::warn!("Render service unavailable: {err}");
            }
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

/// Pump one connection. Returns false when the channel itself is shutting down.
async fn run_connection(
    mut connection: Connection,
    config: &ChannelConfig,
    commands: &mut mpsc::UnboundedReceiver<ClientMessage>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> bool {
    let mut ping =
        tokio::time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = connection.incoming.recv() => {
                let Some(frame) = frame else {
                    return true;
                };
                match ServerMessage::parse(&frame) {
                    Ok(message) => {
                        if events.send(ChannelEvent::Message(message)).is_err() {
                            return false;
                        }
                    }
                    Err(err) => tracing::warn!("Dropping unreadable frame: {err}"),
                }
            }
            command = commands.recv() => {
                let Some(message) = command else {
                    return false;
                };
                if !send_frame(&connection, &message).await {
                    return true;
                }
            }
            _ = ping.tick() => {
                if !send_frame(&connection, &ClientMessage::Ping).await {
                    return true;
                }
            }
        }
    }
}

async fn send_frame(connection: &Connection, message: &ClientMessage) -> bool {
    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(err) => {
            tracing::error!("Failed to encode message: {err}");
            return true;
        }
    };
    connection.outgoing.send(frame).await.is_ok()
}
