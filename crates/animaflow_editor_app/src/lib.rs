// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Animaflow` Editor application layer.
//!
//! Session state, configuration and command-line parsing shared by the
//! `animaflow_editor` binary and any front end built on top of it.

pub mod app;
pub mod cli;
pub mod config;

pub use app::{AppError, EditorApp, GraphSummary, RenderOutput};
pub use cli::{Cli, Command};
pub use config::{CanvasConfig, ConfigError, EditorConfig, ServiceConfig, CONFIG_FILE_NAME};
