use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ratscan::inputs::scan_input_dir;
use ratscan::{BatchExecutor, Pipeline, PipelineConfig, report};

#[derive(Parser)]
#[command(name = "ratscan")]
#[command(about = "Read rapid antigen test strips from photos")]
struct Cli {
    /// Single image to classify (enables the panel report); omit to scan --input-dir
    #[arg(value_name = "IMAGE")]
    image_path: Option<PathBuf>,

    /// Directory scanned when no IMAGE is given
    #[arg(long, value_name = "DIR", default_value = "images")]
    input_dir: PathBuf,

    /// Directory for the label images and panels
    #[arg(long, value_name = "DIR", default_value = "output_images")]
    output_dir: PathBuf,

    /// Write diagnostic panels in batch mode too
    #[arg(long)]
    visualize: bool,

    /// Save every step's intermediate images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// JSON file overriding pipeline parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let (inputs, visualize) = match &args.image_path {
        Some(path) => (vec![path.clone()], true),
        None => (scan_input_dir(&args.input_dir)?, args.visualize),
    };

    if inputs.is_empty() {
        anyhow::bail!("No images found in {}", args.input_dir.display());
    }
    tracing::info!(count = inputs.len(), "Processing images");

    let mut pipeline = Pipeline::standard(config)?.with_visualize(visualize);
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let executor = BatchExecutor::new(pipeline, args.output_dir.clone());
    let items = executor.execute(&inputs)?;

    let failures = report::report_batch(&items, &args.output_dir, visualize);
    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, items.len());
    }

    Ok(())
}
