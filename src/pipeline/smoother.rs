//! Render-path smoothing for the gaze dot: exponential moving average plus
//! update throttling and small-movement jitter suppression. The recording
//! path bypasses this entirely so downstream statistics see the directly
//! mapped signal.

use std::time::{Duration, Instant};

pub const SMOOTHING_ALPHA: f64 = 0.35;
pub const RENDER_THROTTLE: Duration = Duration::from_millis(300);
pub const JITTER_THRESHOLD_PX: f64 = 8.0;

/// What the display surface should do after one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DotUpdate {
    /// Hide the dot (gap in the signal).
    Hide,
    /// Keep the previous rendering untouched.
    Skip,
    /// Move the dot to the smoothed coordinate.
    Render { x: f64, y: f64 },
}

#[derive(Debug)]
pub struct DotSmoother {
    alpha: f64,
    throttle: Duration,
    jitter_px: f64,
    smooth: Option<(f64, f64)>,
    last_rendered: Option<(f64, f64)>,
    last_render_at: Option<Instant>,
}

impl Default for DotSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_ALPHA, RENDER_THROTTLE, JITTER_THRESHOLD_PX)
    }
}

impl DotSmoother {
    pub fn new(alpha: f64, throttle: Duration, jitter_px: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "alpha must be in (0, 1]");
        Self {
            alpha,
            throttle,
            jitter_px,
            smooth: None,
            last_rendered: None,
            last_render_at: None,
        }
    }

    /// Feed one mapped coordinate (or absence) into the smoothing stage.
    pub fn observe(&mut self, point: Option<(f64, f64)>, now: Instant) -> DotUpdate {
        let Some((x, y)) = point else {
            // No stale position carried across gaps.
            self.smooth = None;
            return DotUpdate::Hide;
        };

        let (sx, sy) = match self.smooth {
            Some((px, py)) => (
                self.alpha * x + (1.0 - self.alpha) * px,
                self.alpha * y + (1.0 - self.alpha) * py,
            ),
            None => (x, y),
        };
        self.smooth = Some((sx, sy));

        if let Some(last) = self.last_render_at {
            if now.duration_since(last) < self.throttle {
                return DotUpdate::Skip;
            }
        }

        if let Some((rx, ry)) = self.last_rendered {
            let dist = ((sx - rx).powi(2) + (sy - ry).powi(2)).sqrt();
            if dist < self.jitter_px {
                return DotUpdate::Skip;
            }
        }

        self.last_render_at = Some(now);
        self.last_rendered = Some((sx, sy));
        DotUpdate::Render { x: sx, y: sy }
    }

    /// Drop the smoothing accumulator, as when a tracking window closes.
    pub fn reset(&mut self) {
        self.smooth = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother_without_gating() -> DotSmoother {
        DotSmoother::new(SMOOTHING_ALPHA, Duration::ZERO, 0.0)
    }

    #[test]
    fn test_first_sample_seeds_average() {
        let mut s = smoother_without_gating();
        let update = s.observe(Some((120.0, 340.0)), Instant::now());
        assert_eq!(update, DotUpdate::Render { x: 120.0, y: 340.0 });
    }

    #[test]
    fn test_constant_stream_converges() {
        let mut s = smoother_without_gating();
        let t0 = Instant::now();
        s.observe(Some((0.0, 0.0)), t0);

        let mut last = (0.0, 0.0);
        for i in 1..=10 {
            if let DotUpdate::Render { x, y } =
                s.observe(Some((100.0, 100.0)), t0 + Duration::from_secs(i))
            {
                last = (x, y);
            }
        }
        // EMA fixpoint: a constant input pulls the smoothed value onto itself.
        assert!((last.0 - 100.0).abs() < 2.0);
        assert!((last.1 - 100.0).abs() < 2.0);
    }

    #[test]
    fn test_ema_weights_match_alpha() {
        let mut s = smoother_without_gating();
        let t0 = Instant::now();
        s.observe(Some((10.0, 20.0)), t0);
        let update = s.observe(Some((20.0, 30.0)), t0 + Duration::from_secs(1));
        // 0.35 * 20 + 0.65 * 10 = 13.5
        assert_eq!(update, DotUpdate::Render { x: 13.5, y: 23.5 });
    }

    #[test]
    fn test_throttle_skips_fast_updates() {
        let mut s = DotSmoother::new(1.0, RENDER_THROTTLE, 0.0);
        let t0 = Instant::now();
        assert!(matches!(
            s.observe(Some((0.0, 0.0)), t0),
            DotUpdate::Render { .. }
        ));
        assert_eq!(
            s.observe(Some((500.0, 500.0)), t0 + Duration::from_millis(100)),
            DotUpdate::Skip
        );
        assert!(matches!(
            s.observe(Some((500.0, 500.0)), t0 + Duration::from_millis(400)),
            DotUpdate::Render { .. }
        ));
    }

    #[test]
    fn test_jitter_within_threshold_never_rerenders() {
        // alpha = 1 makes the smoothed point track the input exactly, so the
        // jitter gate is the only thing under test.
        let mut s = DotSmoother::new(1.0, RENDER_THROTTLE, JITTER_THRESHOLD_PX);
        let t0 = Instant::now();
        assert!(matches!(
            s.observe(Some((100.0, 100.0)), t0),
            DotUpdate::Render { .. }
        ));
        // Well past the throttle window, but only 5 px away.
        assert_eq!(
            s.observe(Some((103.0, 104.0)), t0 + Duration::from_secs(1)),
            DotUpdate::Skip
        );
    }

    #[test]
    fn test_absence_hides_and_resets_accumulator() {
        let mut s = smoother_without_gating();
        let t0 = Instant::now();
        s.observe(Some((10.0, 10.0)), t0);
        s.observe(Some((10.0, 10.0)), t0 + Duration::from_secs(1));
        assert_eq!(s.observe(None, t0 + Duration::from_secs(2)), DotUpdate::Hide);
        // Next presence seeds from scratch instead of blending with stale state.
        let update = s.observe(Some((900.0, 900.0)), t0 + Duration::from_secs(3));
        assert_eq!(update, DotUpdate::Render { x: 900.0, y: 900.0 });
    }
}
