//! Point density estimation for coordinate layers.

use geomap_core::{GeomapError, Result};
use std::f64::consts::PI;

/// Estimates a density value at each input point.
pub trait DensityEstimator {
    /// `points` are `(x, y)` pairs; the result has one density per point.
    fn estimate(&self, points: &[(f64, f64)]) -> Result<Vec<f64>>;
}

/// Two-dimensional Gaussian kernel density estimate.
///
/// The kernel covariance is the sample covariance of the points scaled by
/// Scott's factor `n^(-1/6)` squared, and the density is evaluated at the
/// input points themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianKde;

impl DensityEstimator for GaussianKde {
    fn estimate(&self, points: &[(f64, f64)]) -> Result<Vec<f64>> {
        let n = points.len();
        if n < 3 {
            return Err(GeomapError::Density(format!(
                "need at least 3 points, got {}",
                n
            )));
        }
        let nf = n as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            let (dx, dy) = (x - mean_x, y - mean_y);
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        let factor = nf.powf(-1.0 / 6.0);
        let scale = factor * factor / (nf - 1.0);
        let (a, d, b) = (sxx * scale, syy * scale, sxy * scale);

        let det = a * d - b * b;
        if !det.is_finite() || det <= f64::EPSILON * (a * d).abs().max(f64::MIN_POSITIVE) {
            return Err(GeomapError::Density(
                "points are collinear or identical, the covariance is singular".to_string(),
            ));
        }
        let (ia, id, ib) = (d / det, a / det, -b / det);
        let norm = 1.0 / (2.0 * PI * det.sqrt() * nf);

        log::debug!("[Geomap] density: Evaluating KDE over {} points", n);
        Ok(points
            .iter()
            .map(|&(x, y)| {
                points
                    .iter()
                    .map(|&(px, py)| {
                        let (dx, dy) = (x - px, y - py);
                        let q = ia * dx * dx + 2.0 * ib * dx * dy + id * dy * dy;
                        (-0.5 * q).exp()
                    })
                    .sum::<f64>()
                    * norm
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> Vec<(f64, f64)> {
        vec![
            (0.0, 0.0),
            (0.1, 0.05),
            (-0.05, 0.1),
            (0.02, -0.08),
            (5.0, 4.0),
        ]
    }

    #[test]
    fn dense_points_score_higher() {
        let densities = GaussianKde.estimate(&cloud()).unwrap();
        assert_eq!(densities.len(), 5);
        assert!(densities.iter().all(|d| *d > 0.0));
        assert!(densities[0] > densities[4]);
    }

    #[test]
    fn symmetric_points_have_equal_density() {
        let points = vec![(-1.0, 0.0), (1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];
        let densities = GaussianKde.estimate(&points).unwrap();
        for d in &densities[1..] {
            assert!((d - densities[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn too_few_points_fail() {
        let err = GaussianKde.estimate(&[(0.0, 0.0)]).unwrap_err();
        assert_eq!(err.class(), geomap_core::ErrorClass::Guard);
    }

    #[test]
    fn collinear_points_fail() {
        let points = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
        assert!(GaussianKde.estimate(&points).is_err());
    }
}
