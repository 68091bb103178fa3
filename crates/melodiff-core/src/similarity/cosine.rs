//! Index-matched and summary-vector comparisons

use crate::error::{AnalysisError, Result};
use crate::features::FeatureSequence;

/// `(u·v) / (‖u‖‖v‖)`, 0 when either vector has zero norm
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> f64 {
    cosine_f64(
        u.iter().map(|&x| x as f64),
        v.iter().map(|&x| x as f64),
    )
}

fn cosine_f64(u: impl Iterator<Item = f64>, v: impl Iterator<Item = f64>) -> f64 {
    let (mut dot, mut uu, mut vv) = (0.0f64, 0.0f64, 0.0f64);
    for (a, b) in u.zip(v) {
        dot += a * b;
        uu += a * a;
        vv += b * b;
    }
    // sqrt of the product keeps cos(u, u) exactly 1
    let denom = (uu * vv).sqrt();
    if denom > 0.0 && denom.is_finite() {
        (dot / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Euclidean distance between two frames
pub fn euclidean_distance(u: &[f32], v: &[f32]) -> f64 {
    u.iter()
        .zip(v.iter())
        .map(|(&a, &b)| {
            let d = a as f64 - b as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn check_dims(a: &FeatureSequence, b: &FeatureSequence) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(AnalysisError::IncompatibleInput {
            kind: a.kind(),
            left: a.dim(),
            right: b.dim(),
        });
    }
    Ok(())
}

/// Mean cosine over frames `0..min(len a, len b)`, 0 when either is empty
pub fn direct_similarity(a: &FeatureSequence, b: &FeatureSequence) -> Result<f64> {
    check_dims(a, b)?;
    let n = a.len().min(b.len());
    if n == 0 {
        return Ok(0.0);
    }
    let total: f64 = a
        .vectors()
        .iter()
        .zip(b.vectors().iter())
        .map(|(u, v)| cosine_similarity(u, v))
        .sum();
    Ok(total / n as f64)
}

/// Cosine similarity of the two mean vectors
pub fn profile_similarity(a: &FeatureSequence, b: &FeatureSequence) -> Result<f64> {
    check_dims(a, b)?;
    Ok(cosine_f64(a.mean().into_iter(), b.mean().into_iter()))
}

/// Euclidean distance between the two mean vectors
pub fn mean_distance(a: &FeatureSequence, b: &FeatureSequence) -> Result<f64> {
    check_dims(a, b)?;
    Ok(a.mean()
        .iter()
        .zip(b.mean().iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;
    use approx::assert_relative_eq;

    fn seq(vectors: Vec<Vec<f32>>) -> FeatureSequence {
        let dim = vectors.first().map(|v| v.len()).unwrap_or(2);
        FeatureSequence::new(FeatureKind::Chroma, dim, vectors).unwrap()
    }

    #[test]
    fn test_cosine_identity_and_symmetry() {
        let u = [0.3, -1.2, 4.0, 0.01];
        let v = [1.0, 2.0, -0.5, 3.0];
        assert_eq!(cosine_similarity(&u, &u), 1.0);
        assert_eq!(cosine_similarity(&u, &v), cosine_similarity(&v, &u));
        assert_relative_eq!(cosine_similarity(&u, &[-0.3, 1.2, -4.0, -0.01]), -1.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_direct_uses_shorter_length() {
        let a = seq(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let b = seq(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]);
        // frame 0 matches, frame 1 is orthogonal
        assert_relative_eq!(direct_similarity(&a, &b).unwrap(), 0.5);
    }

    #[test]
    fn test_profile_and_mean_distance() {
        let a = seq(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let b = seq(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        // same mean, different order
        assert_relative_eq!(profile_similarity(&a, &b).unwrap(), 1.0);
        assert_eq!(mean_distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = FeatureSequence::new(FeatureKind::Mfcc, 13, vec![vec![0.0; 13]]).unwrap();
        let b = FeatureSequence::new(FeatureKind::Mfcc, 9, vec![vec![0.0; 9]]).unwrap();
        assert!(matches!(
            direct_similarity(&a, &b),
            Err(AnalysisError::IncompatibleInput { left: 13, right: 9, .. })
        ));
    }
}
