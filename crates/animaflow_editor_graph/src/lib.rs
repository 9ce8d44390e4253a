// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph-editing engine for the Animaflow editor.
//!
//! An animation scene is a typed dataflow graph: shapes, transforms and
//! animations are nodes, and typed ports carry values between them. This
//! crate owns everything the editor does to that graph:
//! - Port type compatibility
//! - The graph model and its observable store
//! - Frames (visual grouping) and containment
//! - Drag-to-create connection mediation
//! - Edge cutting
//! - Canvas gesture handling
//! - The JSON wire format
//!
//! ## Architecture
//!
//! All mutations are synchronous and go through [`Graph`]. The only async
//! surface is the [`NodeCatalog`] used by the [`ConnectionMediator`] to look
//! up node kinds; rendering lives in a separate bridge crate.

pub mod bounds;
pub mod catalog;
pub mod connection;
pub mod containment;
pub mod cutter;
pub mod geometry;
pub mod graph;
pub mod interaction;
pub mod mediator;
pub mod node;
pub mod port;
pub mod store;
pub mod wire;

pub use bounds::{EstimatedBounds, MeasuredBounds, NodeBounds};
pub use catalog::{CatalogError, InMemoryCatalog, NodeCatalog, NodeDefinition};
pub use connection::{Edge, EdgeCandidate, EdgeId};
pub use containment::{ContainmentChange, ContainmentConfig, FrameResize};
pub use geometry::{Point, Rect, Segment, Size};
pub use graph::{Graph, GraphChange, GraphSettings, Viewport};
pub use interaction::{CanvasController, CanvasEvent, CanvasOutcome, EditKey, Hit, PointerButton};
pub use mediator::{ConnectionMediator, MediatorError, MediatorState, Placement};
pub use node::{DataKeys, Element, Frame, Node, NodeId, ViewState};
pub use port::{is_compatible, PortDirection, PortType, Ports};
pub use store::{GraphStore, SubscriptionId};
pub use wire::{LoadError, WireGraph};
