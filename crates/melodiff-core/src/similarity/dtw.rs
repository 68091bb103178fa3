//! Dynamic time warping over two feature sequences
//!
//! Accumulated cost `D[i][j] = d(i, j) + min(D[i-1][j-1], D[i-1][j], D[i][j-1])`
//! on an `(n+1) × (m+1)` grid with `D[0][0] = 0` and infinite borders. The
//! full grid lives in one row-major arena only when the warping path is
//! wanted; otherwise two rolling rows carry cost and path length.

use super::LocalDistance;
use crate::budget::Budget;
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::features::FeatureSequence;
use serde::{Deserialize, Serialize};

/// Result of aligning two sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtwAlignment {
    pub total_cost: f64,
    /// Number of cells on the optimal path
    pub path_length: usize,
    /// `total_cost / path_length`
    pub normalized_cost: f64,
    /// Normalized cost mapped onto [0, 1], see [`LocalDistance::score`]
    pub score: f64,
    /// Frame index pairs from `(0, 0)` to `(n-1, m-1)`, when requested
    pub path: Option<Vec<(usize, usize)>>,
    /// Band radius actually applied
    pub band_radius: Option<usize>,
}

/// Smallest radius that keeps the end cell reachable for an `n × m` grid
pub fn effective_band_radius(requested: usize, n: usize, m: usize) -> usize {
    let (lo, hi) = (n.min(m).max(1), n.max(m));
    requested.max(hi.div_ceil(lo))
}

/// Whether frame pair `(i, j)` lies within `radius` of the scaled diagonal
pub fn band_contains(i: usize, j: usize, n: usize, m: usize, radius: usize) -> bool {
    let center = i as f64 * m as f64 / n as f64;
    (j as f64 - center).abs() <= radius as f64
}

/// Inclusive column range of row `i` inside the band, 0-based frames
fn band_columns(i: usize, n: usize, m: usize, radius: Option<usize>) -> (usize, usize) {
    match radius {
        None => (0, m - 1),
        Some(r) => {
            let center = i as f64 * m as f64 / n as f64;
            let lo = (center - r as f64).ceil().max(0.0) as usize;
            let hi = ((center + r as f64).floor() as usize).min(m - 1);
            (lo, hi)
        }
    }
}

/// Predecessor step, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Vertical,
    Horizontal,
}

fn best_step(diagonal: f64, vertical: f64, horizontal: f64) -> (Step, f64) {
    let mut best = (Step::Diagonal, diagonal);
    if vertical < best.1 {
        best = (Step::Vertical, vertical);
    }
    if horizontal < best.1 {
        best = (Step::Horizontal, horizontal);
    }
    best
}

/// DTW aligner
#[derive(Debug, Clone, Copy, Default)]
pub struct Dtw {
    distance: LocalDistance,
    band_radius: Option<usize>,
    keep_path: bool,
}

impl Dtw {
    pub fn new(distance: LocalDistance) -> Self {
        Self {
            distance,
            band_radius: None,
            keep_path: false,
        }
    }

    /// Restrict the search to a Sakoe-Chiba band of `radius` frames
    pub fn with_band(mut self, radius: Option<usize>) -> Self {
        self.band_radius = radius;
        self
    }

    pub fn with_path(mut self, keep_path: bool) -> Self {
        self.keep_path = keep_path;
        self
    }

    pub fn align(
        &self,
        a: &FeatureSequence,
        b: &FeatureSequence,
        budget: &Budget,
    ) -> Result<DtwAlignment> {
        if a.dim() != b.dim() {
            return Err(AnalysisError::IncompatibleInput {
                kind: a.kind(),
                left: a.dim(),
                right: b.dim(),
            });
        }
        if a.is_empty() {
            return Err(AnalysisError::EmptyInput { track: Track::A });
        }
        if b.is_empty() {
            return Err(AnalysisError::EmptyInput { track: Track::B });
        }

        let (n, m) = (a.len(), b.len());
        let radius = self
            .band_radius
            .map(|r| effective_band_radius(r, n, m));
        if let (Some(requested), Some(effective)) = (self.band_radius, radius) {
            if effective != requested {
                log::debug!(
                    "{}: band radius widened from {} to {} for {}x{} frames",
                    a.kind(),
                    requested,
                    effective,
                    n,
                    m
                );
            }
        }

        let (total_cost, path_length, path) = if self.keep_path {
            let (cost, path) = self.align_full(a, b, radius, budget)?;
            (cost, path.len(), Some(path))
        } else {
            let (cost, len) = self.align_rolling(a, b, radius, budget)?;
            (cost, len, None)
        };

        let normalized_cost = total_cost / path_length as f64;
        let non_negative = [a, b]
            .iter()
            .flat_map(|s| s.vectors().iter().flatten())
            .all(|&x| x >= 0.0);
        let score = self.distance.score(normalized_cost, non_negative);
        log::debug!(
            "{}: DTW {}x{} cost {:.4} over {} steps, score {:.4}",
            a.kind(),
            n,
            m,
            total_cost,
            path_length,
            score
        );

        Ok(DtwAlignment {
            total_cost,
            path_length,
            normalized_cost,
            score,
            path,
            band_radius: radius,
        })
    }

    /// Two rolling rows of (cost, path length)
    fn align_rolling(
        &self,
        a: &FeatureSequence,
        b: &FeatureSequence,
        radius: Option<usize>,
        budget: &Budget,
    ) -> Result<(f64, usize)> {
        let (n, m) = (a.len(), b.len());
        let mut prev = vec![(f64::INFINITY, 0usize); m + 1];
        let mut curr = vec![(f64::INFINITY, 0usize); m + 1];
        prev[0] = (0.0, 0);

        for i in 1..=n {
            budget.check(Stage::Similarity, None)?;
            curr.fill((f64::INFINITY, 0));

            let u = &a.vectors()[i - 1];
            let (lo, hi) = band_columns(i - 1, n, m, radius);
            for j in lo + 1..=hi + 1 {
                let (step, cost) = best_step(prev[j - 1].0, prev[j].0, curr[j - 1].0);
                if cost.is_infinite() {
                    continue;
                }
                let len = match step {
                    Step::Diagonal => prev[j - 1].1,
                    Step::Vertical => prev[j].1,
                    Step::Horizontal => curr[j - 1].1,
                };
                let d = self.distance.distance(u, &b.vectors()[j - 1]);
                curr[j] = (d + cost, len + 1);
            }

            std::mem::swap(&mut prev, &mut curr);
        }

        Ok(prev[m])
    }

    /// Full arena with backtracking
    fn align_full(
        &self,
        a: &FeatureSequence,
        b: &FeatureSequence,
        radius: Option<usize>,
        budget: &Budget,
    ) -> Result<(f64, Vec<(usize, usize)>)> {
        let (n, m) = (a.len(), b.len());
        let width = m + 1;
        let at = |i: usize, j: usize| i * width + j;

        let mut acc = vec![f64::INFINITY; (n + 1) * width];
        acc[0] = 0.0;

        for i in 1..=n {
            budget.check(Stage::Similarity, None)?;

            let u = &a.vectors()[i - 1];
            let (lo, hi) = band_columns(i - 1, n, m, radius);
            for j in lo + 1..=hi + 1 {
                let (_, cost) = best_step(acc[at(i - 1, j - 1)], acc[at(i - 1, j)], acc[at(i, j - 1)]);
                if cost.is_infinite() {
                    continue;
                }
                acc[at(i, j)] = self.distance.distance(u, &b.vectors()[j - 1]) + cost;
            }
        }

        let total_cost = acc[at(n, m)];
        let mut path = Vec::with_capacity(n + m);
        let (mut i, mut j) = (n, m);
        while i > 0 && j > 0 {
            path.push((i - 1, j - 1));
            let (step, _) = best_step(acc[at(i - 1, j - 1)], acc[at(i - 1, j)], acc[at(i, j - 1)]);
            match step {
                Step::Diagonal => {
                    i -= 1;
                    j -= 1;
                }
                Step::Vertical => i -= 1,
                Step::Horizontal => j -= 1,
            }
        }
        path.reverse();

        Ok((total_cost, path))
    }
}
