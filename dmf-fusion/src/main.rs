//! DesignModel Fusion (dmf-fusion) - Main entry point
//!
//! Analyzes one design document and prints the fused `CombinedAnalysis` as
//! JSON on stdout. Analyzer payloads are replayed from files captured
//! earlier; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dmf_fusion::analyzers::{ReplayTextAnalyzer, ReplayVisionAnalyzer, UnavailableTextAnalyzer};
use dmf_fusion::{DesignDocument, FallbackCoordinator, FusionConfig, TextAnalyzer};

/// Command-line arguments for dmf-fusion
#[derive(Parser, Debug)]
#[command(name = "dmf-fusion")]
#[command(about = "Fuse text and vision analyses of a UI design into one data model")]
#[command(version)]
struct Args {
    /// Design document (JSON)
    #[arg(short, long)]
    design: PathBuf,

    /// Captured text analyzer payload (JSON)
    #[arg(long)]
    text_result: Option<PathBuf>,

    /// Captured vision analyzer payload (JSON)
    #[arg(long)]
    vision_result: Option<PathBuf>,

    /// Config file (overrides DMF_CONFIG and the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = dmf_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over [logging] level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = FusionConfig::resolve(&toml_config).context("Invalid configuration")?;

    let content = tokio::fs::read_to_string(&args.design)
        .await
        .with_context(|| format!("Failed to read design document {}", args.design.display()))?;
    let design: DesignDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse design document {}", args.design.display()))?;
    info!(
        design = %args.design.display(),
        pages = design.pages.len(),
        screenshots = design.screenshots.len(),
        "Design document loaded"
    );

    let text: Arc<dyn TextAnalyzer> = match &args.text_result {
        Some(path) => Arc::new(ReplayTextAnalyzer::new(path)),
        None => Arc::new(UnavailableTextAnalyzer),
    };

    let mut coordinator = FallbackCoordinator::new(config, text)
        .context("Failed to initialize analysis coordinator")?;
    if let Some(path) = &args.vision_result {
        coordinator = coordinator
            .with_vision(Arc::new(ReplayVisionAnalyzer::new(path)))
            .context("Failed to attach vision analyzer")?;
    }

    let analysis = coordinator.analyze(&design).await;

    let output = if args.pretty {
        serde_json::to_string_pretty(&analysis)
    } else {
        serde_json::to_string(&analysis)
    }
    .context("Failed to serialize analysis")?;
    println!("{}", output);

    Ok(())
}
