use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hakushin_harvester::{HarvestConfig, Harvester};

static INIT_TRACING: Once = Once::new();

#[derive(Parser, Debug)]
#[command(author, version, about = "Harvest Wuthering Waves data and assets from hakush.in", long_about = None)]
struct Args {
    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Comma-separated language codes (default: zh,en,ja,ko)
    #[arg(long, value_delimiter = ',')]
    langs: Option<Vec<String>>,

    /// Re-download everything, ignoring files already on disk
    #[arg(long)]
    force: bool,

    /// Maximum simultaneous requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// JSON settings file; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

fn build_config(args: Args) -> Result<HarvestConfig> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::from_json_file(path)?,
        None => HarvestConfig::default(),
    };

    if let Some(out) = args.out {
        config.output_dir = out;
    }
    if let Some(langs) = args.langs {
        config.languages = langs
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }
    if args.force {
        config.force = true;
    }
    if let Some(n) = args.concurrency {
        config.max_concurrency = n;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = build_config(Args::parse())?;
    info!(
        "output: {}, languages: {:?}",
        config.output_dir.display(),
        config.languages
    );

    let harvester = Harvester::new(config).context("invalid harvest configuration")?;
    let snap = harvester.run().await;

    if snap.json_failed > 0 || snap.assets_failed > 0 || snap.categories_skipped > 0 {
        warn!("harvest finished with gaps, see errors above");
    }
    Ok(())
}
