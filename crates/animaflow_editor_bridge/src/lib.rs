// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render service bridge for the Animaflow editor.
//!
//! Connects the graph engine to the two external services:
//! - The render service, over a persistent auto-reconnecting channel
//! - The node registry, over HTTP
//!
//! Inbound render messages are queued and applied on the caller's event loop
//! through [`RenderClient::handle_event`], never from the channel task.

pub mod catalog_http;
pub mod channel;
pub mod client;
pub mod protocol;
pub mod session;
pub mod transport;

pub use catalog_http::HttpNodeCatalog;
pub use channel::{ChannelConfig, ChannelError, ChannelEvent, ChannelState, RenderChannel};
pub use client::{ClientError, RenderClient};
pub use protocol::{parse_debug_tag, ClientMessage, ServerMessage};
pub use session::{RenderSession, SessionError, COMPLETE_LOG_LINE};
pub use transport::{
    connector_for, Connection, Connector, TcpConnector, TransportError, WsConnector,
};
