// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session: one graph, its canvas, and the services around it.
//!
//! Everything runs on a single current-thread tokio runtime. Graph
//! mutations go through the [`GraphStore`], so observers see local edits
//! and render diagnostics in the same order they were applied.

use crate::config::{ConfigError, EditorConfig};
use animaflow_editor_bridge::{
    connector_for, ChannelEvent, ClientError, HttpNodeCatalog, RenderClient, RenderSession,
};
use animaflow_editor_graph::wire::{self, LoadError};
use animaflow_editor_graph::{
    CanvasController, CanvasEvent, CanvasOutcome, Graph, GraphChange, GraphStore, MeasuredBounds,
    MediatorError, NodeBounds, NodeCatalog, Placement, Point, Rect,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How long the CLI waits for the first connection to the render service
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// File access failed
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// A graph file could not be loaded
    #[error("Failed to load {path}: {source}")]
    Load {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: LoadError,
    },
    /// A graph could not be serialized
    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The async runtime could not start
    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),
    /// Node creation failed
    #[error(transparent)]
    Mediator(#[from] MediatorError),
    /// Node registry failure
    #[error(transparent)]
    Catalog(#[from] animaflow_editor_graph::CatalogError),
    /// The render request was refused
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The render service never answered
    #[error("Render service at {0} is unreachable")]
    Unreachable(String),
    /// The connection dropped mid-render
    #[error("Render service disconnected before the render finished")]
    Disconnected,
    /// The service reported a render failure
    #[error("Render failed: {0}")]
    Render(String),
}

/// Counts reported by `check`
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    /// Graph name
    pub name: String,
    /// Ordinary nodes
    pub nodes: usize,
    /// Frames
    pub frames: usize,
    /// Edges
    pub edges: usize,
    /// Nodes inside a frame
    pub framed: usize,
    /// Bounding box of everything, when non-empty
    pub extent: Option<Rect>,
}

impl std::fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} node(s) ({} in frames), {} frame(s), {} edge(s)",
            self.name, self.nodes, self.framed, self.frames, self.edges
        )?;
        if let Some(extent) = self.extent {
            write!(f, ", extent {}x{}", extent.size.width, extent.size.height)?;
        }
        Ok(())
    }
}

/// Result of a finished render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Rendered media reference
    pub video_url: String,
    /// Generated code, when the service sent it
    pub code: Option<String>,
}

/// Editor session state
pub struct EditorApp {
    config: EditorConfig,
    store: GraphStore,
    canvas: CanvasController,
    bounds: MeasuredBounds,
    catalog: Arc<dyn NodeCatalog>,
    render: Option<RenderClient>,
}

impl EditorApp {
    /// Create a session using the configured node registry
    pub fn new(config: EditorConfig) -> Self {
        let catalog = Arc::new(HttpNodeCatalog::new(config.service.catalog_url.clone()));
        Self::with_catalog(config, catalog)
    }

    /// Create a session with a specific node catalog
    pub fn with_catalog(config: EditorConfig, catalog: Arc<dyn NodeCatalog>) -> Self {
        let mut store = GraphStore::default();
        store.subscribe(|changes, graph| {
            tracing::debug!(
                "{}: {} change(s), dirty={}",
                graph.name,
                changes.len(),
                graph.is_dirty()
            );
        });

        Self {
            canvas: config.canvas.controller(),
            bounds: MeasuredBounds::new(config.canvas.node_estimate),
            config,
            store,
            catalog,
            render: None,
        }
    }

    /// Active configuration as RON
    pub fn config_ron(&self) -> Result<String, AppError> {
        Ok(self.config.to_ron()?)
    }

    /// Current graph
    pub fn graph(&self) -> &Graph {
        self.store.graph()
    }

    /// State of the render session, once connected
    pub fn render_session(&self) -> Option<&RenderSession> {
        self.render.as_ref().map(RenderClient::session)
    }

    /// Replace the graph with the contents of a wire-format file.
    ///
    /// On failure the current graph is left untouched.
    pub fn open(&mut self, path: &Path) -> Result<(), AppError> {
        let json = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (result, changes) = self.store.apply(|graph| wire::load_into(graph, &json));
        forward(&mut self.render, &changes);
        result.map_err(|source| AppError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Opened {} from {}", self.graph().name, path.display());
        Ok(())
    }

    /// Write the graph in wire format
    pub fn save_as(&mut self, path: &Path) -> Result<(), AppError> {
        let json = wire::save(self.graph())?;
        std::fs::write(path, json).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.store.apply(Graph::mark_clean);
        tracing::info!("Saved {} to {}", self.graph().name, path.display());
        Ok(())
    }

    /// Summarize the graph
    pub fn summary(&self) -> GraphSummary {
        let graph = self.graph();
        let extent = graph
            .elements()
            .filter_map(|element| self.bounds.absolute_rect(graph, element.id()))
            .reduce(|a, b| a.union(&b));

        GraphSummary {
            name: graph.name.clone(),
            nodes: graph.node_count(),
            frames: graph.frames().count(),
            edges: graph.edge_count(),
            framed: graph.nodes().filter(|node| node.parent_frame.is_some()).count(),
            extent,
        }
    }

    /// Feed one canvas event through the controller.
    ///
    /// Resulting edits are reported to the render session, so a failed
    /// render's error clears once the user changes the graph.
    pub fn canvas_event(&mut self, event: CanvasEvent) -> CanvasOutcome {
        let Self {
            store,
            canvas,
            bounds,
            render,
            ..
        } = self;
        let (outcome, changes) = store.apply(|graph| canvas.handle(graph, &*bounds, event));
        forward(render, &changes);
        outcome
    }

    /// Open the node picker after a connection drag ended on empty canvas
    pub async fn open_picker(&mut self, position: Point) -> Result<usize, AppError> {
        Ok(self
            .canvas
            .mediator_mut()
            .open_picker(self.catalog.as_ref(), position)
            .await?)
    }

    /// Create the picked kind and wire it to the dragged port
    pub async fn pick(&mut self, kind: &str) -> Result<Placement, AppError> {
        let definition = self
            .canvas
            .mediator_mut()
            .fetch_selection(self.catalog.as_ref(), kind)
            .await?;
        let Self {
            store,
            canvas,
            render,
            ..
        } = self;
        let (placement, changes) =
            store.apply(|graph| canvas.mediator_mut().place(graph, &definition));
        forward(render, &changes);
        Ok(placement?)
    }

    /// Registry contents grouped by category
    pub async fn node_kinds(&self) -> Result<Vec<(String, Vec<String>)>, AppError> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for definition in self.catalog.list().await? {
            let category = definition.category_or_default().to_string();
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, kinds)) => kinds.push(definition.kind),
                None => groups.push((category, vec![definition.kind])),
            }
        }
        Ok(groups)
    }

    /// Submit the graph to the render service and wait for the outcome.
    ///
    /// Connects first if needed. Log lines are handed to `on_log` as they
    /// arrive.
    pub async fn render(&mut self, mut on_log: impl FnMut(&str)) -> Result<RenderOutput, AppError> {
        if self.render.is_none() {
            self.connect().await?;
        }
        let Self { store, render, .. } = self;
        let Some(client) = render.as_mut() else {
            return Err(AppError::Disconnected);
        };
        let (submitted, _) = store.apply(|graph| client.render(graph));
        submitted?;

        let mut printed = 0;
        while client.session().is_rendering() {
            let Some(event) = client.next_event().await else {
                return Err(AppError::Disconnected);
            };
            if event == ChannelEvent::Disconnected {
                return Err(AppError::Disconnected);
            }
            store.apply(|graph| client.handle_event(graph, event));

            for line in &client.session().log()[printed..] {
                on_log(line);
            }
            printed = client.session().log().len();
        }

        let session = client.session();
        if let Some(error) = session.error() {
            return Err(AppError::Render(error.to_string()));
        }
        Ok(RenderOutput {
            video_url: session.video_url().unwrap_or_default().to_string(),
            code: session.generated_code().map(str::to_owned),
        })
    }

    /// Connect to the configured render service, replacing any previous
    /// connection
    pub async fn connect(&mut self) -> Result<(), AppError> {
        let service = &self.config.service;
        let mut client = RenderClient::spawn(connector_for(&service.render_url), service.channel());

        let connected = tokio::time::timeout(CONNECT_TIMEOUT, async {
            while let Some(event) = client.next_event().await {
                if event == ChannelEvent::Connected {
                    return true;
                }
            }
            false
        })
        .await;

        match connected {
            Ok(true) => {
                tracing::info!("Connected to render service at {}", service.render_url);
                self.render = Some(client);
                Ok(())
            }
            _ => Err(AppError::Unreachable(service.render_url.clone())),
        }
    }
}

fn forward(render: &mut Option<RenderClient>, changes: &[GraphChange]) {
    if let Some(client) = render {
        client.on_graph_changed(changes);
    }
}

impl std::fmt::Debug for EditorApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorApp")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Build the runtime used by the CLI
pub fn runtime() -> Result<tokio::runtime::Runtime, AppError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use animaflow_editor_graph::{
        EditKey, Hit, InMemoryCatalog, NodeDefinition, NodeId, PointerButton, PortDirection,
    };
    use pretty_assertions::assert_eq;

    const SCENE: &str = r#"{
        "name": "Intro",
        "nodes": [
            {"id": "frame_1", "type": "__groupFrame", "position": {"x": 0, "y": 0},
             "data": {"label": "Intro", "width": 400, "height": 300}},
            {"id": "circle_1", "type": "Circle", "position": {"x": 40, "y": 60},
             "parentNode": "frame_1",
             "data": {"name": "circle_1", "outputs": {"shape": "Mobject"}}}
        ],
        "edges": []
    }"#;

    fn catalog() -> Arc<dyn NodeCatalog> {
        Arc::new(
            InMemoryCatalog::new()
                .with(NodeDefinition::new("Circle", "Shapes").with_output("shape", "Mobject"))
                .with(
                    NodeDefinition::new("FadeIn", "Animations")
                        .with_input("target", "Mobject")
                        .with_output("animation", "Animation"),
                )
                .with(NodeDefinition::new("Wait", "")),
        )
    }

    fn app_with_scene(dir: &Path) -> EditorApp {
        let path = dir.join("scene.json");
        std::fs::write(&path, SCENE).unwrap();
        let mut app = EditorApp::with_catalog(EditorConfig::default(), catalog());
        app.open(&path).unwrap();
        app
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("animaflow_app_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_open_and_summarize() {
        let dir = scratch_dir("summary");
        let app = app_with_scene(&dir);

        let summary = app.summary();
        assert_eq!(summary.name, "Intro");
        assert_eq!((summary.nodes, summary.frames, summary.edges, summary.framed), (1, 1, 0, 1));
        let extent = summary.extent.unwrap();
        assert_eq!((extent.size.width, extent.size.height), (400.0, 300.0));
        assert!(summary.to_string().starts_with("Intro: 1 node(s)"));
    }

    #[test]
    fn test_bad_file_leaves_graph() {
        let dir = scratch_dir("bad");
        let mut app = app_with_scene(&dir);
        let path = dir.join("broken.json");
        std::fs::write(&path, "{\"nodes\": 3}").unwrap();

        assert!(matches!(app.open(&path), Err(AppError::Load { .. })));
        assert_eq!(app.graph().name, "Intro");
        assert_eq!(app.graph().node_count(), 1);
    }

    #[test]
    fn test_duplicate_uses_configured_offset() {
        let dir = scratch_dir("duplicate");
        let mut config = EditorConfig::default();
        config.canvas.duplicate_offset = Point::new(10.0, 20.0);
        let mut app = EditorApp::with_catalog(config, catalog());
        let path = dir.join("scene.json");
        std::fs::write(&path, SCENE).unwrap();
        app.open(&path).unwrap();

        app.canvas_event(CanvasEvent::PointerDown {
            position: Point::new(50.0, 70.0),
            button: PointerButton::Primary,
            hit: Hit::Element(NodeId::new("circle_1")),
            additive: false,
        });
        app.canvas_event(CanvasEvent::PointerUp {
            position: Point::new(50.0, 70.0),
            hit: Hit::Element(NodeId::new("circle_1")),
        });
        let outcome = app.canvas_event(CanvasEvent::Key(EditKey::Duplicate));

        let CanvasOutcome::Duplicated(ids) = outcome else {
            panic!("expected a duplicate, got {outcome:?}");
        };
        let copy = app.graph().node(&ids[0]).unwrap();
        assert_eq!(copy.position, Point::new(50.0, 80.0));
    }

    #[tokio::test]
    async fn test_drag_to_canvas_then_pick() {
        let dir = scratch_dir("pick");
        let mut app = app_with_scene(&dir);

        app.canvas_event(CanvasEvent::PointerDown {
            position: Point::new(220.0, 100.0),
            button: PointerButton::Primary,
            hit: Hit::Port {
                node: NodeId::new("circle_1"),
                port: "shape".into(),
                direction: PortDirection::Output,
            },
            additive: false,
        });
        let outcome = app.canvas_event(CanvasEvent::PointerUp {
            position: Point::new(600.0, 400.0),
            hit: Hit::Canvas,
        });
        assert_eq!(outcome, CanvasOutcome::OpenPicker(Point::new(600.0, 400.0)));

        assert_eq!(app.open_picker(Point::new(600.0, 400.0)).await.unwrap(), 1);
        let placement = app.pick("FadeIn").await.unwrap();

        let edge = app.graph().edge(&placement.edge.unwrap()).unwrap();
        assert_eq!(edge.source, NodeId::new("circle_1"));
        assert_eq!(edge.target, placement.node);
        assert!(app.graph().is_dirty());

        let saved = dir.join("saved.json");
        app.save_as(&saved).unwrap();
        assert!(!app.graph().is_dirty());
    }

    #[tokio::test]
    async fn test_node_kinds_grouped() {
        let app = EditorApp::with_catalog(EditorConfig::default(), catalog());
        let groups = app.node_kinds().await.unwrap();
        assert_eq!(
            groups,
            vec![
                ("Shapes".to_string(), vec!["Circle".to_string()]),
                ("Animations".to_string(), vec!["FadeIn".to_string()]),
                ("Other".to_string(), vec!["Wait".to_string()]),
            ]
        );
    }
}
