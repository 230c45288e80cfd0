use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use plantdoc::{
    AppState, ModelManager, ModelSource, RuntimeConfig, ServiceConfig, StartupError,
    DEFAULT_MODEL_FILE,
};

#[derive(Parser)]
#[command(author, version, about = "Plant disease detection service", long_about = None)]
struct Args {
    /// Path to the ONNX model; defaults to the plantdoc models cache
    #[arg(long, env = "PLANTDOC_MODEL")]
    model: Option<PathBuf>,

    /// URL to download the model from when it is missing or fails verification
    #[arg(long, env = "PLANTDOC_MODEL_URL")]
    model_url: Option<String>,

    /// Expected SHA-256 of the model file
    #[arg(long, env = "PLANTDOC_MODEL_SHA256")]
    model_sha256: Option<String>,

    /// Force a fresh download of the model file
    #[arg(short, long)]
    fresh: bool,

    /// Disease reference table (CSV)
    #[arg(long, env = "PLANTDOC_DISEASE_TABLE", default_value = "disease_info.csv")]
    disease_table: PathBuf,

    /// Supplement reference table (CSV)
    #[arg(long, env = "PLANTDOC_SUPPLEMENT_TABLE", default_value = "supplement_info.csv")]
    supplement_table: PathBuf,

    /// Keep uploaded photos in this directory
    #[arg(long, env = "PLANTDOC_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value = "0")]
    intra_threads: usize,
}

async fn resolve_model(args: &Args) -> anyhow::Result<PathBuf> {
    let (dir, name) = match &args.model {
        Some(path) => {
            let dir = path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let name = path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .with_context(|| format!("Model path {:?} has no file name", path))?;
            (dir, name)
        }
        None => (ModelManager::get_default_models_dir(), DEFAULT_MODEL_FILE.to_string()),
    };

    let manager = ModelManager::new(&dir)
        .with_context(|| format!("Cannot use models directory {:?}", dir))?;

    let mut source = ModelSource::new(name);
    if let Some(url) = &args.model_url {
        source = source.with_url(url);
    }
    if let Some(sha256) = &args.model_sha256 {
        source = source.with_sha256(sha256);
    }

    if args.fresh {
        if source.url.is_some() {
            info!("Fresh download requested - removing any existing model file...");
            manager.remove_download(&source.name).map_err(StartupError::ModelFetch)?;
        } else {
            warn!("--fresh ignored: no model URL configured");
        }
    }

    let path = manager.ensure_model_downloaded(&source).await
        .map_err(StartupError::ModelFetch)?;
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    plantdoc::init_logger();
    let args = Args::parse();

    info!("=== Starting plantdoc v{} ===", env!("CARGO_PKG_VERSION"));
    let start_time = Instant::now();

    let model_path = resolve_model(&args).await?;

    let mut config = ServiceConfig::new(model_path, &args.disease_table, &args.supplement_table);
    config.runtime = RuntimeConfig::default().with_intra_threads(args.intra_threads);
    config.upload_dir = args.upload_dir.clone();

    info!("Configuration:");
    info!("  Model:            {:?}", config.model_path);
    info!("  Disease table:    {:?}", config.disease_table);
    info!("  Supplement table: {:?}", config.supplement_table);
    info!("  Upload dir:       {:?}", config.upload_dir);

    let state = Arc::new(AppState::initialize(&config)?);
    info!(
        "=== Service ready: {} classes (took {:.2?}) ===",
        state.num_classes(),
        start_time.elapsed()
    );

    let app = plantdoc::service::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
