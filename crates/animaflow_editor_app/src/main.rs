// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Animaflow` Editor - graph tooling for animation scenes
//!
//! Command-line front end over the graph engine:
//! - Validate and summarize scene graphs
//! - Normalize files through a load/save round trip
//! - Submit graphs to the render service and stream its log
//! - Browse the node registry
//!
//! ## Architecture
//!
//! The editor session ([`EditorApp`]) owns the graph store, the canvas
//! controller and the service clients. Everything runs on one current-thread
//! tokio runtime; render messages are applied on that loop in arrival order.

use animaflow_editor_app::{app, cli, AppError, Cli, Command, EditorApp, EditorConfig};
use animaflow_editor_bridge::RenderSession;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("animaflow_editor_app=debug,animaflow_editor_bridge=info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}\n\n{}", cli::usage());
            std::process::exit(2);
        }
    };

    tracing::info!("Starting Animaflow Editor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if cli.command == Command::Help {
        print!("{}", cli::usage());
        return Ok(());
    }

    let config = EditorConfig::resolve(cli.config.as_deref())?;
    let mut app = EditorApp::new(config);

    match cli.command {
        Command::Help => Ok(()),
        Command::Check { graph } => {
            app.open(&graph)?;
            println!("{}", app.summary());
            Ok(())
        }
        Command::Normalize { input, output } => {
            app.open(&input)?;
            app.save_as(&output)
        }
        Command::Render { graph, code } => {
            app.open(&graph)?;
            let runtime = app::runtime()?;
            runtime.block_on(async {
                let result = app.render(|line| println!("{line}")).await;

                let generated = match &result {
                    Ok(output) => output.code.clone(),
                    Err(_) => app
                        .render_session()
                        .and_then(RenderSession::generated_code)
                        .map(str::to_owned),
                };
                if let (Some(path), Some(generated)) = (code.as_ref(), generated) {
                    tokio::fs::write(path, generated).await.map_err(|source| AppError::Io {
                        path: path.clone(),
                        source,
                    })?;
                }

                let output = result?;
                println!("{}", output.video_url);
                Ok::<(), AppError>(())
            })
        }
        Command::Config => {
            print!("{}", app.config_ron()?);
            Ok(())
        }
        Command::Nodes => {
            let runtime = app::runtime()?;
            let groups = runtime.block_on(app.node_kinds())?;
            for (category, kinds) in groups {
                println!("{category}: {}", kinds.join(", "));
            }
            Ok(())
        }
    }
}
