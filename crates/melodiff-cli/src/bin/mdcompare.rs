//! mdcompare - Audio similarity
//!
//! Usage: mdcompare <track_a> <track_b> [--config <path>] [--band <frames>] [--path]
//!
//! Each track is an audio file or a feature file written by mdextract.

use anyhow::Result;
use clap::Parser;
use melodiff_cli::input::{load_config, load_pair};
use melodiff_cli::output::print_report;
use melodiff_core::{compare_features, Budget};
use melodiff_store::{DirectoryStore, FeatureStore};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdcompare")]
#[command(about = "Compare two tracks by timbre, harmony and tempo", long_about = None)]
struct Args {
    /// First track (audio, .mdf or .json)
    track_a: PathBuf,

    /// Second track (audio, .mdf or .json)
    track_b: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sakoe-Chiba band radius in frames (overrides config)
    #[arg(long)]
    band: Option<usize>,

    /// Include the warping path in the report
    #[arg(long)]
    path: bool,

    /// Processing time limit in seconds, 0 disables it (overrides config)
    #[arg(long)]
    budget_secs: Option<f64>,

    /// Directory for cached features of audio inputs
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    melodiff_cli::init_logging(args.verbose);

    run_mdcompare(&args)
}

fn run_mdcompare(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.band.is_some() {
        config.similarity.dtw_band_radius = args.band;
    }
    if args.path {
        config.similarity.include_alignment_path = true;
    }
    if let Some(secs) = args.budget_secs {
        config.budget_secs = Some(secs);
    }
    config.validate()?;

    let store = match &args.cache_dir {
        Some(dir) => {
            log::info!("Using feature cache at {}", dir.display());
            Some(DirectoryStore::open(dir)?)
        }
        None => None,
    };
    let store = store.as_ref().map(|s| s as &dyn FeatureStore);

    let budget = Budget::from_secs(config.budget_secs);
    let start = std::time::Instant::now();

    let (features_a, features_b) =
        load_pair(&args.track_a, &args.track_b, &config.extraction, store, &budget)?;

    log::info!(
        "Loaded features in {:.2}s ({} and {} frames)",
        start.elapsed().as_secs_f64(),
        features_a.info.num_frames,
        features_b.info.num_frames
    );

    let report = compare_features(&features_a, &features_b, &config, &budget)?;
    print_report(&report);

    Ok(())
}
