//! Wall-clock processing budget with cooperative cancellation
//!
//! CPU-bound stages call [`Budget::check`] between frames (spectral stage)
//! and between DTW rows (similarity stage). A budget is cheap to clone and
//! every clone shares the same cancellation flag, so both extraction
//! branches of a comparison observe a cancel from either side.

use crate::error::{AnalysisError, Result, Stage, Track};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Budget {
    started: Instant,
    limit: Option<Duration>,
    cancelled: Arc<AtomicBool>,
}

impl Budget {
    /// Budget that never expires (cancellation still works)
    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Budget expiring `limit` after creation
    pub fn with_limit(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build from an optional limit in seconds, as stored in configuration
    pub fn from_secs(limit_secs: Option<f64>) -> Self {
        match limit_secs {
            Some(secs) if secs.is_finite() && secs > 0.0 => {
                Self::with_limit(Duration::from_secs_f64(secs))
            }
            _ => Self::unlimited(),
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Request cancellation; every clone observes it at its next check
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_exhausted(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.limit {
            Some(limit) => self.started.elapsed() >= limit,
            None => false,
        }
    }

    /// Fail with `BudgetExceeded` once cancelled or past the deadline
    pub fn check(&self, stage: Stage, track: Option<Track>) -> Result<()> {
        if self.is_exhausted() {
            log::debug!(
                "Budget exhausted after {:.2}s during {} ({:?})",
                self.elapsed().as_secs_f64(),
                stage,
                track
            );
            return Err(AnalysisError::BudgetExceeded {
                track,
                stage,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_budget_passes() {
        let budget = Budget::unlimited();
        assert!(budget.check(Stage::Spectral, Some(Track::A)).is_ok());
        assert!(budget.limit().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let budget = Budget::unlimited();
        let clone = budget.clone();
        clone.cancel();

        let err = budget.check(Stage::Similarity, None).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::BudgetExceeded {
                stage: Stage::Similarity,
                track: None,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_limit_is_exhausted() {
        let budget = Budget::with_limit(Duration::ZERO);
        assert!(budget.is_exhausted());
        assert!(budget.check(Stage::Framing, Some(Track::B)).is_err());
    }

    #[test]
    fn test_from_secs_ignores_non_positive() {
        assert!(Budget::from_secs(None).limit().is_none());
        assert!(Budget::from_secs(Some(0.0)).limit().is_none());
        assert_eq!(
            Budget::from_secs(Some(30.0)).limit(),
            Some(Duration::from_secs(30))
        );
    }
}
