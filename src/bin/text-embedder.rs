//! text-embedder CLI - drive the embedder bridge from a terminal or a host process
//!
//! # Commands
//!
//! ```bash
//! # Fetch the default model into ./models
//! text-embedder download
//!
//! # Embed text and print the method result
//! text-embedder embed "How do I reset my password?"
//!
//! # Compare two texts
//! text-embedder similarity "cheap flights" "low-cost airfare"
//!
//! # Serve JSON-lines method calls on stdin/stdout
//! echo '{"method":"initialize"}' | text-embedder serve
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use text_embedder_lib::channel::{self, MethodCall, MethodResult};
use text_embedder_lib::embedding::download;
use text_embedder_lib::{Bridge, EmbedderConfig, TextBackend};

#[derive(Parser)]
#[command(name = "text-embedder")]
#[command(about = "On-device sentence embeddings behind a method-call bridge")]
#[command(version)]
struct Cli {
    /// JSON config file (assetsDir, defaultModel, platform)
    #[arg(long, env = "TEXT_EMBEDDER_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured assets directory
    #[arg(long, env = "TEXT_EMBEDDER_ASSETS")]
    assets_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a known model into the assets directory
    Download {
        /// Model id (defaults to the configured default model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Embed text and print the vector
    Embed {
        text: String,

        /// Model identifier or path
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        quantize: bool,
    },

    /// Cosine similarity of two texts
    Similarity {
        text1: String,
        text2: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Load the model and print model info
    Info {
        #[arg(long)]
        model: Option<String>,
    },

    /// Answer JSON-lines method calls on stdin until EOF
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EmbedderConfig::load(path)?,
        None => EmbedderConfig::default(),
    };
    if let Some(dir) = cli.assets_dir {
        config = config.with_assets_dir(dir);
    }

    match cli.command {
        Commands::Download { model } => {
            let id = model.unwrap_or_else(|| config.default_model.clone());
            let spec = download::find_model(&id)
                .ok_or_else(|| anyhow!("No download source known for model {}", id))?;

            let dir = download::download_model(&config.assets_dir, spec, |p| {
                log::info!(
                    "{}: {:.1}%",
                    p.filename,
                    p.downloaded as f64 / p.total.max(1) as f64 * 100.0
                );
            })
            .await?;
            println!("{}", dir.display());
        }

        Commands::Embed {
            text,
            model,
            quantize,
        } => {
            let mut bridge = Bridge::new(TextBackend::new(), config);
            initialize(&mut bridge, model, quantize)?;
            print(&bridge.handle_call(&MethodCall::new("embed", json!({ "text": text }))))?;
        }

        Commands::Similarity {
            text1,
            text2,
            model,
        } => {
            let mut bridge = Bridge::new(TextBackend::new(), config);
            initialize(&mut bridge, model, false)?;
            print(&bridge.handle_call(&MethodCall::new(
                "cosineSimilarity",
                json!({ "text1": text1, "text2": text2 }),
            )))?;
        }

        Commands::Info { model } => {
            let mut bridge = Bridge::new(TextBackend::new(), config);
            initialize(&mut bridge, model, false)?;
            print(&bridge.handle_call(&MethodCall::new("getModelInfo", json!({}))))?;
        }

        Commands::Serve => {
            let mut bridge = Bridge::new(TextBackend::new(), config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            channel::serve_lines(&mut bridge, stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}

fn initialize(
    bridge: &mut Bridge<TextBackend>,
    model: Option<String>,
    quantize: bool,
) -> Result<()> {
    let call = MethodCall::new("initialize", json!({ "modelPath": model, "quantize": quantize }));
    match bridge.handle_call(&call) {
        MethodResult::Error(e) => Err(anyhow!("{}: {}", e.code, e.message))
            .with_context(|| format!("Could not load model from {:?}", bridge.config().assets_dir)),
        _ => Ok(()),
    }
}

fn print(result: &MethodResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
