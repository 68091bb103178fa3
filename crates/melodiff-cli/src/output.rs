//! JSON output formatting

use melodiff_core::{SimilarityReport, TrackFeatures};
use serde::Serialize;

/// Summary printed by `mdextract`
#[derive(Debug, Serialize)]
pub struct ExtractSummary {
    pub status: &'static str,
    pub input_file: String,
    pub output_file: String,
    pub duration_s: f64,
    pub num_frames: usize,
    pub mfcc_dim: usize,
    pub chroma_dim: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<f32>,
    pub degenerate_frames: usize,
    pub processing_time_seconds: f64,
}

impl ExtractSummary {
    pub fn new(
        input_file: String,
        output_file: String,
        features: &TrackFeatures,
        processing_time_seconds: f64,
    ) -> Self {
        Self {
            status: "success",
            input_file,
            output_file,
            duration_s: features.info.duration_secs,
            num_frames: features.info.num_frames,
            mfcc_dim: features.mfcc.dim(),
            chroma_dim: features.chroma.dim(),
            tempo_bpm: features.tempo.bpm,
            degenerate_frames: features.mfcc.degenerate_frames()
                + features.chroma.degenerate_frames(),
            processing_time_seconds,
        }
    }
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

/// Print the similarity report as JSON and log a human summary
pub fn print_report(report: &SimilarityReport) {
    for (name, cmp) in &report.features {
        log::info!(
            "{:>6}: dtw {:.3} (cost {:.4}, {} steps), direct {:.3}, profile {:.3}",
            name,
            cmp.dtw_score,
            cmp.dtw_normalized_cost,
            cmp.dtw_path_length,
            cmp.direct_similarity,
            cmp.profile_similarity
        );
    }
    log::info!("Overall: {}", report.summary());

    print_json(report);
}
