//! Callscreen gateway binary
//!
//! Wires the screening engine to its concrete adapters and serves the HTTP
//! front door.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callscreen_adapters::{
    DiskRecordingStore, HttpTranscriptionClient, OllamaReasoningClient, SimulatedTelephony,
};
use callscreen_core::{ScreenConfig, ScreeningEngine, ScreeningServer};
use callscreen_gateway::build_router;

#[derive(Parser, Debug)]
#[command(name = "callscreen-gateway", version, about = "HTTP front door for the callscreen engine")]
struct Args {
    /// Address to bind the HTTP API on
    #[arg(long, default_value = "0.0.0.0:8088")]
    bind: String,

    /// Ollama endpoint for the reasoning service
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model used for routing decisions
    #[arg(long, default_value = "llama3")]
    ollama_model: String,

    /// Transcription service endpoint
    #[arg(long, default_value = "http://localhost:9000")]
    transcriber_url: String,

    /// Directory for voicemail recordings and the capture spool
    #[arg(long, default_value = "./recordings")]
    recordings_dir: PathBuf,

    /// Minimum free space (MB) required to accept a voicemail; 0 disables
    /// the guard
    #[arg(long, default_value_t = 50)]
    min_free_space_mb: u64,

    /// Known transfer destination as a NAME=EXTENSION pair; repeatable
    #[arg(long = "destination", value_name = "NAME=EXT")]
    destinations: Vec<String>,

    /// Maximum clarifying questions before forcing voicemail
    #[arg(long, default_value_t = 3)]
    max_ask_attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ScreenConfig::default();
    config.actions.max_ask_attempts = args.max_ask_attempts;
    for pair in &args.destinations {
        let (name, extension) = pair
            .split_once('=')
            .with_context(|| format!("invalid destination '{}', expected NAME=EXT", pair))?;
        config
            .actions
            .destinations
            .insert(name.trim().to_string(), extension.trim().to_string());
    }

    let telephony = Arc::new(SimulatedTelephony::new(args.recordings_dir.join("spool"))?);
    let transcription = Arc::new(HttpTranscriptionClient::new(
        &args.transcriber_url,
        config.transcription.timeout,
    )?);
    let reasoning = Arc::new(OllamaReasoningClient::new(
        &args.ollama_url,
        &args.ollama_model,
        config.reasoning.timeout,
    )?);
    let store = Arc::new(DiskRecordingStore::new(
        &args.recordings_dir,
        args.min_free_space_mb,
    )?);

    let engine = Arc::new(ScreeningEngine::new(
        config,
        telephony,
        transcription,
        reasoning,
        store,
    )?);

    let mut server = ScreeningServer::new(Arc::clone(&engine));
    server.start();

    let app = build_router(engine);
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("cannot bind {}", args.bind))?;
    info!("🌐 Callscreen gateway listening on {}", args.bind);

    axum::serve(listener, app).await?;

    server.stop();
    Ok(())
}
