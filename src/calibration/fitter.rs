//! Least-squares affine correction fitted from calibration samples.

use crate::error::{Error, Result};
use crate::models::GazePoint;
use log::warn;
use serde::{Deserialize, Serialize};

/// Predictor variance below this is treated as degenerate and falls back to
/// the identity axis instead of dividing by a near-zero value.
const VARIANCE_TOLERANCE: f64 = 1e-6;

/// One averaged calibration observation: mean predicted coordinates recorded
/// while a fixation target was active, paired with the target's true center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub pred_x: f64,
    pub pred_y: f64,
    pub true_x: f64,
    pub true_y: f64,
}

/// Per-axis correction: corrected = a * raw + b.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFit {
    pub a: f64,
    pub b: f64,
}

impl AxisFit {
    pub const IDENTITY: AxisFit = AxisFit { a: 1.0, b: 0.0 };
}

/// Active affine calibration mapping. Invariant: all four coefficients are
/// finite; anything else is sanitized back to the identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AffineMapping {
    pub ax: f64,
    pub bx: f64,
    pub ay: f64,
    pub by: f64,
}

impl Default for AffineMapping {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineMapping {
    pub fn identity() -> Self {
        Self {
            ax: 1.0,
            bx: 0.0,
            ay: 1.0,
            by: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.ax, self.bx, self.ay, self.by]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Returns self when valid, otherwise the identity mapping.
    pub fn sanitized(self) -> Self {
        if self.is_valid() {
            self
        } else {
            warn!("invalid calibration mapping {self:?}, falling back to identity");
            Self::identity()
        }
    }

    pub fn apply(&self, point: GazePoint) -> GazePoint {
        GazePoint::new(self.ax * point.x + self.bx, self.ay * point.y + self.by)
    }

    /// Absent input maps to absent output.
    pub fn apply_raw(&self, raw: Option<GazePoint>) -> Option<GazePoint> {
        raw.map(|p| self.apply(p))
    }
}

/// Ordinary least squares fit of `true = a * pred + b` for one axis.
/// Deterministic and order-independent; only sums and means matter.
pub fn fit_axis(samples: &[(f64, f64)]) -> Result<AxisFit> {
    if samples.len() < 2 {
        return Err(Error::InsufficientData(samples.len()));
    }

    let n = samples.len() as f64;
    let (sum_p, sum_t) = samples
        .iter()
        .fold((0.0, 0.0), |(sp, st), (p, t)| (sp + p, st + t));
    let mean_p = sum_p / n;
    let mean_t = sum_t / n;

    let (num, den) = samples.iter().fold((0.0, 0.0), |(num, den), (p, t)| {
        let dp = p - mean_p;
        let dt = t - mean_t;
        (num + dp * dt, den + dp * dp)
    });

    if den.abs() < VARIANCE_TOLERANCE {
        // Near-constant predictor; a slope would be meaningless.
        return Ok(AxisFit::IDENTITY);
    }

    let a = num / den;
    Ok(AxisFit {
        a,
        b: mean_t - a * mean_p,
    })
}

/// Fit the X and Y axes independently over the collected calibration samples.
pub fn fit_mapping(samples: &[CalibrationSample]) -> Result<AffineMapping> {
    let xs: Vec<(f64, f64)> = samples.iter().map(|s| (s.pred_x, s.true_x)).collect();
    let ys: Vec<(f64, f64)> = samples.iter().map(|s| (s.pred_y, s.true_y)).collect();

    let x_fit = fit_axis(&xs)?;
    let y_fit = fit_axis(&ys)?;

    Ok(AffineMapping {
        ax: x_fit.a,
        bx: x_fit.b,
        ay: y_fit.a,
        by: y_fit.b,
    }
    .sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_relationship_recovered() {
        // true = 2 * pred + 3
        let samples: Vec<(f64, f64)> = [10.0, 20.0, 35.0, 50.0]
            .iter()
            .map(|&p| (p, 2.0 * p + 3.0))
            .collect();
        let fit = fit_axis(&samples).unwrap();
        assert!((fit.a - 2.0).abs() < 1e-9);
        assert!((fit.b - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_variance_falls_back_to_identity() {
        let samples = vec![(100.0, 50.0), (100.0, 200.0), (100.0, 350.0)];
        let fit = fit_axis(&samples).unwrap();
        assert_eq!(fit, AxisFit::IDENTITY);
    }

    #[test]
    fn test_insufficient_samples_rejected() {
        assert!(matches!(
            fit_axis(&[]),
            Err(Error::InsufficientData(0))
        ));
        assert!(matches!(
            fit_axis(&[(1.0, 2.0)]),
            Err(Error::InsufficientData(1))
        ));
    }

    #[test]
    fn test_fit_is_order_independent() {
        let a = vec![(10.0, 23.0), (20.0, 43.0), (30.0, 63.0)];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(fit_axis(&a).unwrap(), fit_axis(&b).unwrap());
    }

    #[test]
    fn test_mapping_applies_exactly() {
        let mapping = AffineMapping {
            ax: 1.5,
            bx: 10.0,
            ay: 0.5,
            by: -20.0,
        };
        let mapped = mapping.apply(GazePoint::new(100.0, 200.0));
        assert_eq!(mapped, GazePoint::new(160.0, 80.0));
        assert_eq!(mapping.apply_raw(None), None);
    }

    #[test]
    fn test_non_finite_mapping_sanitized() {
        let mapping = AffineMapping {
            ax: f64::NAN,
            bx: 0.0,
            ay: 1.0,
            by: 0.0,
        };
        assert_eq!(mapping.sanitized(), AffineMapping::identity());
    }
}
