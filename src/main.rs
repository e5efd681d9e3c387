use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tumorscan::{Config, OfflineProcessor, TumorDetector, server};

#[derive(Parser)]
#[command(name = "tumorscan")]
#[command(about = "Detect and highlight tumors in CT scan images")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding tumor_model.rten / segmentation_model.rten
    #[arg(long, value_name = "DIR", default_value = "models", global = true)]
    models_dir: PathBuf,

    /// Directory for cached offline reports
    #[arg(long, value_name = "DIR", default_value = "cache", global = true)]
    cache_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR", global = true)]
    debug_out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Where uploaded files are stored
        #[arg(long, value_name = "DIR", default_value = "uploads")]
        upload_dir: PathBuf,
    },
    /// Process one image and cache its report
    Process {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,
    },
    /// List cached reports
    Cached,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::default()
        .with_models_dir(&args.models_dir)
        .with_cache_dir(&args.cache_dir);
    config.debug_out = args.debug_out.clone();

    match args.command {
        Command::Serve { bind, upload_dir } => {
            config = config.with_upload_dir(upload_dir);
            config.bind = bind;
            let detector = Arc::new(TumorDetector::from_config(&config)?);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config, detector))?;
        }
        Command::Process { image_path } => {
            let detector = Arc::new(TumorDetector::from_config(&config)?);
            let processor = OfflineProcessor::new(detector, &config.cache_dir)?;
            let result = processor.process_image(&image_path, &mut rand::rng())?;

            println!("\n=== Tumor Detection Result ===");
            println!("File: {}", result.filename);
            println!("Tumor detected: {}", if result.has_tumor { "yes" } else { "no" });
            if result.has_tumor {
                println!("Tumor area: {:.2}%", result.tumor_area);
            }
            println!("Report saved to {}", result.cache_path);
        }
        Command::Cached => {
            if !config.cache_dir.exists() {
                println!("No cache directory at {}", config.cache_dir.display());
                return Ok(());
            }
            let results = OfflineProcessor::list_cache(&config.cache_dir)?;
            if results.is_empty() {
                println!("No cached results.");
            }
            for name in results {
                println!("{name}");
            }
        }
    }

    Ok(())
}
