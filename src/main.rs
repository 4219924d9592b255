//! Plant classification HTTP service.
//!
//! Loads the model and class names once, then serves `POST /predict` and
//! `GET /health`. A missing or broken model stops the process before it binds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use vrikzo_cnn::config::ServerConfig;
use vrikzo_cnn::logging::{self, LogTarget};
use vrikzo_cnn::server::{self, AppState};
use vrikzo_cnn::ClassifierContext;

#[derive(Parser, Debug)]
#[command(name = "vrikzo-cnn")]
#[command(version)]
#[command(about = "HTTP API classifying plant photos by species and condition")]
struct Cli {
    /// JSON configuration file; flags below override it
    #[arg(short, long, env = "VRIKZO_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "VRIKZO_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "VRIKZO_PORT")]
    port: Option<u16>,

    /// ONNX model file
    #[arg(long, env = "VRIKZO_MODEL")]
    model: Option<PathBuf>,

    /// JSON array of class names
    #[arg(long, env = "VRIKZO_LABELS")]
    labels: Option<PathBuf>,

    /// Forward passes allowed to run at once
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-request deadline in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = self.model {
            config.model.model_path = model;
        }
        if let Some(labels) = self.labels {
            config.model.labels_path = labels;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent_inferences = max_concurrent;
        }
        if let Some(timeout) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(timeout);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, LogTarget::Stdout);

    let config = cli.into_config()?;
    info!("Vrikzo CNN API v{}", env!("CARGO_PKG_VERSION"));
    info!("  Model:       {}", config.model.model_path.display());
    info!("  Class names: {}", config.model.labels_path.display());
    info!("  Concurrency: {}", config.max_concurrent_inferences);
    info!("  Timeout:     {:?}", config.request_timeout);

    let model_config = config.model.clone();
    let context = match tokio::task::spawn_blocking(move || ClassifierContext::load(&model_config))
        .await
        .context("model loading task failed")?
    {
        Ok(context) => context,
        Err(e) if e.is_startup() => {
            error!("cannot start without a usable model and class names: {e}");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    let input_size = context.input_size();
    info!("Image size: {}x{}", input_size.width, input_size.height);

    let state = Arc::new(AppState::new(context, &config));
    let app = server::router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("Starting CNN API on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
