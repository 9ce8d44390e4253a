// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line parsing.

use std::path::PathBuf;

/// Usage text
pub fn usage() -> &'static str {
    "Usage: animaflow_editor [--config <animaflow.ron>] <command>\n\
     \n\
     Commands:\n\
     \x20 check <graph.json>                 Load a graph and print a summary\n\
     \x20 normalize <in.json> <out.json>     Load a graph and save it back\n\
     \x20 render <graph.json> [--code <out>] Render a graph on the render service\n\
     \x20 nodes                              List node types from the registry\n\
     \x20 config                             Print the effective configuration\n"
}

/// What to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print usage
    Help,
    /// Load and summarize
    Check {
        /// Graph file
        graph: PathBuf,
    },
    /// Load then save
    Normalize {
        /// Source graph
        input: PathBuf,
        /// Destination
        output: PathBuf,
    },
    /// Submit for rendering
    Render {
        /// Graph file
        graph: PathBuf,
        /// Where to write the generated code
        code: Option<PathBuf>,
    },
    /// List registry node types
    Nodes,
    /// Print the effective configuration
    Config,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Subcommand
    pub command: Command,
}

impl Cli {
    /// Parse arguments, program name excluded
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut config = None;
        let mut code = None;
        let mut positional = Vec::new();

        let mut i = 0usize;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => {
                    return Ok(Self {
                        config,
                        command: Command::Help,
                    });
                }
                "--config" => {
                    i += 1;
                    let value = args.get(i).ok_or("--config requires PATH")?;
                    config = Some(PathBuf::from(value));
                }
                "--code" => {
                    i += 1;
                    let value = args.get(i).ok_or("--code requires PATH")?;
                    code = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => return Err(format!("Unknown option {flag}")),
                value => positional.push(value.to_string()),
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or("Missing command")?;
        let mut path = |what: &str| {
            positional
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("{name} requires {what}"))
        };

        let command = match name.as_str() {
            "check" => Command::Check { graph: path("GRAPH")? },
            "normalize" => Command::Normalize {
                input: path("INPUT")?,
                output: path("OUTPUT")?,
            },
            "render" => Command::Render {
                graph: path("GRAPH")?,
                code: code.take(),
            },
            "nodes" => Command::Nodes,
            "config" => Command::Config,
            other => return Err(format!("Unknown command {other}")),
        };

        if code.is_some() {
            return Err("--code only applies to render".to_string());
        }
        if let Some(extra) = positional.next() {
            return Err(format!("Unexpected argument {extra}"));
        }
        Ok(Self { config, command })
    }
}
