//! mdextract - Feature extractor
//!
//! Usage: mdextract <input_audio_path> <output_dir> [--json] [--config <path>]

use anyhow::{Context, Result};
use clap::Parser;
use melodiff_cli::input::load_config;
use melodiff_cli::output::{print_json, ExtractSummary};
use melodiff_core::{audio, extract_features, Budget, Track};
use melodiff_store::format::{MdfMetadata, ALGORITHM_ID};
use melodiff_store::{FeatureKey, MdfFile, MdfJsonFile, MdfWriter};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mdextract")]
#[command(about = "Extract melodiff features from an audio file", long_about = None)]
struct Args {
    /// Input audio file path
    input_audio_path: PathBuf,

    /// Output directory for feature files
    output_dir: PathBuf,

    /// Write a JSON feature file (full matrices and statistics) instead of .mdf
    #[arg(long)]
    json: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    melodiff_cli::init_logging(args.verbose);

    run_mdextract(&args)
}

fn run_mdextract(args: &Args) -> Result<()> {
    let input_path = args.input_audio_path.as_path();
    let output_dir = args.output_dir.as_path();

    // Validate input
    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }

    // Create output directory if needed
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let config = load_config(args.config.as_deref())?;
    config.validate()?;

    log::info!("Processing: {}", input_path.display());

    let start = std::time::Instant::now();
    let buffer = audio::decode_audio(input_path, config.extraction.sample_rate)?;

    log::info!(
        "Decoded audio: {:.1}s duration, {} samples @ {}Hz",
        buffer.duration_secs(),
        buffer.samples().len(),
        buffer.sample_rate()
    );

    let budget = Budget::from_secs(config.budget_secs);
    let features = extract_features(&buffer, &config.extraction, &budget, Track::A)?;
    let key = FeatureKey::new(&buffer, &config.extraction)?;
    let elapsed = start.elapsed();

    log::info!(
        "Extracted {} frames in {:.2}s (key {})",
        features.info.num_frames,
        elapsed.as_secs_f64(),
        key
    );

    let output_path = output_path(input_path, output_dir, args.json)?;

    if args.json {
        MdfJsonFile::new(input_path, &features, &config.extraction, &key).save(&output_path)?;
    } else {
        let metadata = MdfMetadata {
            algorithm_id: ALGORITHM_ID.to_string(),
            extraction_params: key.params.clone(),
            original_filename: input_path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
            content_key: key.content,
            config_key: key.config,
        };
        MdfWriter::new().write(&output_path, &MdfFile::new(features.clone(), metadata))?;
    }

    print_json(&ExtractSummary::new(
        input_path.display().to_string(),
        output_path.display().to_string(),
        &features,
        elapsed.as_secs_f64(),
    ));

    Ok(())
}

/// `<output_dir>/<input stem>.mdf` (or `.json`)
fn output_path(input_path: &Path, output_dir: &Path, json: bool) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Input path has no usable file name: {}", input_path.display()))?;
    let ext = if json { "json" } else { "mdf" };
    Ok(output_dir.join(format!("{}.{}", stem, ext)))
}
