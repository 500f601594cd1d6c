//! Calibration sampling: drive the fixed sequence of fixation targets,
//! collect raw predictions against each, and fit the affine correction.

use crate::calibration::fitter::{fit_mapping, AffineMapping, CalibrationSample};
use crate::pipeline::GazePipeline;
use crate::ports::{DisplaySurface, GazeSource};
use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;

/// On-screen fixation points, visited in the fixed order center, up, right,
/// down, left.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationTarget {
    Center,
    Up,
    Right,
    Down,
    Left,
}

impl CalibrationTarget {
    pub const SEQUENCE: [CalibrationTarget; 5] = [
        CalibrationTarget::Center,
        CalibrationTarget::Up,
        CalibrationTarget::Right,
        CalibrationTarget::Down,
        CalibrationTarget::Left,
    ];
}

/// Screen-space bounding rectangle of a calibration target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Sampling ticks per fixation target.
    pub samples_per_target: u32,
    /// Total sampling time per target; divided by the sample count to get
    /// the tick interval.
    pub target_budget: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples_per_target: 8,
            target_budget: Duration::from_millis(1200),
        }
    }
}

impl CalibrationConfig {
    pub fn tick_interval(&self) -> Duration {
        self.target_budget / self.samples_per_target.max(1)
    }
}

pub struct CalibrationSampler {
    config: CalibrationConfig,
}

impl CalibrationSampler {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Run the full calibration procedure once, install the fitted mapping
    /// into the pipeline, and return it. Insufficient samples degrade to the
    /// identity mapping; per-tick source failures are swallowed.
    pub async fn run<S, D>(
        &self,
        source: &S,
        display: &D,
        pipeline: &GazePipeline<D>,
    ) -> AffineMapping
    where
        S: GazeSource,
        D: DisplaySurface,
    {
        // Calibration needs live predictions but never writes to the task
        // recording buffer; the tracking flag stays off.
        source.resume();

        let tick = self.config.tick_interval();
        let mut samples = Vec::with_capacity(CalibrationTarget::SEQUENCE.len());

        for target in CalibrationTarget::SEQUENCE {
            display.set_active_target(target);
            // Layout may shift between targets, so resolve per target.
            let (true_x, true_y) = display.target_rect(target).center();

            let mut pred_xs = Vec::with_capacity(self.config.samples_per_target as usize);
            let mut pred_ys = Vec::with_capacity(self.config.samples_per_target as usize);

            for _ in 0..self.config.samples_per_target {
                // Inform, then read, in that order within one tick.
                if let Err(err) = source.inform_true_position(true_x, true_y) {
                    warn!("inform_true_position failed for {target:?}: {err}");
                }
                if let Some(pred) = source.latest_raw() {
                    pred_xs.push(pred.x);
                    pred_ys.push(pred.y);
                }
                tokio::time::sleep(tick).await;
            }

            if pred_xs.is_empty() {
                warn!("no predictions captured for {target:?} target, skipping");
                continue;
            }

            let n = pred_xs.len() as f64;
            let sample = CalibrationSample {
                pred_x: pred_xs.iter().sum::<f64>() / n,
                pred_y: pred_ys.iter().sum::<f64>() / n,
                true_x,
                true_y,
            };
            debug!("calibration sample for {target:?}: {sample:?}");
            samples.push(sample);
        }

        display.clear_targets();
        source.pause();

        let mapping = match fit_mapping(&samples) {
            Ok(mapping) => {
                info!("fitted calibration mapping: {mapping:?}");
                mapping
            }
            Err(err) => {
                // Degraded calibration, not a fatal error; the session continues.
                warn!("calibration fit degraded ({err}), using identity mapping");
                AffineMapping::identity()
            }
        };

        pipeline.set_mapping(mapping).await;
        mapping
    }
}
