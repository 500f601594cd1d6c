//! Simulated collaborators for the demo binary and end-to-end experiments:
//! a noisy gaze source, a logging display surface, and an in-process report
//! backend with normative reference values. None of this is core logic;
//! real deployments provide their own port implementations.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::calibration::{CalibrationTarget, Rect};
use crate::error::{Error, Result};
use crate::models::{
    BaselineComparison, GazePoint, SessionReport, TaskKind, TaskReport, TaskStatistics,
    TaskSubmission,
};
use crate::ports::{DisplaySurface, GazeSource, RawEmission, ReportBackend};

const EMIT_INTERVAL: Duration = Duration::from_millis(30);
const NOISE_PX: f64 = 12.0;

#[derive(Debug)]
struct SourceInner {
    fixation: (f64, f64),
    latest: Option<GazePoint>,
    sender: Option<UnboundedSender<RawEmission>>,
    running: bool,
    initialized: bool,
}

/// A gaze source that emits predictions offset from the current fixation
/// point by a fixed bias plus noise, so calibration has something real to
/// correct.
pub struct SimulatedSource {
    inner: Arc<Mutex<SourceInner>>,
    bias: (f64, f64),
    emitter: Mutex<Option<CancellationToken>>,
}

impl SimulatedSource {
    pub fn new(bias_x: f64, bias_y: f64, initial_fixation: (f64, f64)) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SourceInner {
                fixation: initial_fixation,
                latest: None,
                sender: None,
                running: false,
                initialized: false,
            })),
            bias: (bias_x, bias_y),
            emitter: Mutex::new(None),
        }
    }

    fn predict(&self, fixation: (f64, f64)) -> GazePoint {
        let mut rng = rand::thread_rng();
        GazePoint::new(
            fixation.0 + self.bias.0 + rng.gen_range(-NOISE_PX..NOISE_PX),
            fixation.1 + self.bias.1 + rng.gen_range(-NOISE_PX..NOISE_PX),
        )
    }
}

impl GazeSource for SimulatedSource {
    fn init(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.initialized {
            return Ok(());
        }
        inner.initialized = true;
        info!("simulated gaze source initialized (bias {:?})", self.bias);
        Ok(())
    }

    fn subscribe(&self) -> UnboundedReceiver<RawEmission> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().sender = Some(tx);

        // Replace any previous emitter task.
        let cancel = CancellationToken::new();
        if let Some(previous) = self.emitter.lock().unwrap().replace(cancel.clone()) {
            previous.cancel();
        }

        let inner = Arc::clone(&self.inner);
        let bias = self.bias;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EMIT_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let sent = {
                            let mut guard = inner.lock().unwrap();
                            if !guard.running {
                                continue;
                            }
                            let mut rng = rand::thread_rng();
                            let point = GazePoint::new(
                                guard.fixation.0 + bias.0 + rng.gen_range(-NOISE_PX..NOISE_PX),
                                guard.fixation.1 + bias.1 + rng.gen_range(-NOISE_PX..NOISE_PX),
                            );
                            guard.latest = Some(point);
                            guard
                                .sender
                                .as_ref()
                                .map(|tx| tx.send(Some(point)).is_ok())
                        };
                        if sent == Some(false) {
                            break; // subscriber went away
                        }
                    }
                }
            }
        });

        rx
    }

    fn resume(&self) {
        self.inner.lock().unwrap().running = true;
    }

    fn pause(&self) {
        self.inner.lock().unwrap().running = false;
    }

    fn teardown(&self) {
        if let Some(token) = self.emitter.lock().unwrap().take() {
            token.cancel();
        }
        let mut inner = self.inner.lock().unwrap();
        inner.running = false;
        inner.initialized = false;
        inner.sender = None;
        inner.latest = None;
        info!("simulated gaze source torn down");
    }

    fn inform_true_position(&self, x: f64, y: f64) -> Result<()> {
        let point = self.predict((x, y));
        let mut inner = self.inner.lock().unwrap();
        if !inner.initialized {
            return Err(Error::Source("source not initialized".to_string()));
        }
        inner.fixation = (x, y);
        inner.latest = Some(point);
        Ok(())
    }

    fn latest_raw(&self) -> Option<GazePoint> {
        self.inner.lock().unwrap().latest
    }
}

/// Display surface that narrates everything to the log.
pub struct ConsoleDisplay {
    width: f64,
    height: f64,
}

impl ConsoleDisplay {
    const DOT_SIZE: f64 = 30.0;
    const MARGIN: f64 = 80.0;

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl DisplaySurface for ConsoleDisplay {
    fn render_gaze_dot(&self, x: f64, y: f64) {
        debug!("gaze dot at ({x:.1}, {y:.1})");
    }

    fn hide_gaze_dot(&self) {
        debug!("gaze dot hidden");
    }

    fn set_active_target(&self, target: CalibrationTarget) {
        info!("calibration target active: {target:?}");
    }

    fn clear_targets(&self) {
        info!("calibration targets cleared");
    }

    fn target_rect(&self, target: CalibrationTarget) -> Rect {
        let size = Self::DOT_SIZE;
        let cx = self.width / 2.0 - size / 2.0;
        let cy = self.height / 2.0 - size / 2.0;
        match target {
            CalibrationTarget::Center => Rect::new(cx, cy, size, size),
            CalibrationTarget::Up => Rect::new(cx, Self::MARGIN, size, size),
            CalibrationTarget::Right => {
                Rect::new(self.width - Self::MARGIN - size, cy, size, size)
            }
            CalibrationTarget::Down => {
                Rect::new(cx, self.height - Self::MARGIN - size, size, size)
            }
            CalibrationTarget::Left => Rect::new(Self::MARGIN, cy, size, size),
        }
    }

    fn show_task_content(&self, task: TaskKind) {
        info!("showing content panel for task {task}");
    }

    fn countdown_tick(&self, remaining_secs: u64) {
        info!("starting in {remaining_secs}...");
    }

    fn task_progress(&self, elapsed_secs: u64, total_secs: u64) {
        info!("task progress {elapsed_secs}/{total_secs}s");
    }
}

/// In-process report backend: computes per-task statistics, compares them
/// against normative reference values, and aggregates the session report.
#[derive(Default)]
pub struct LocalBackend {
    sessions: Mutex<HashMap<String, BTreeMap<TaskKind, TaskReport>>>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportBackend for LocalBackend {
    fn submit_task(&self, submission: TaskSubmission) -> Result<TaskReport> {
        if submission.data.is_empty() {
            return Err(Error::Backend(format!(
                "no gaze data recorded for task {}",
                submission.task
            )));
        }

        let statistics = compute_statistics(&submission.data);
        let baseline = normative_statistics(submission.task);
        let report = TaskReport {
            task: submission.task,
            statistics,
            comparison: BaselineComparison {
                user: statistics,
                baseline,
                diff_percent: diff_percent(statistics, baseline),
            },
            visualization: format!(
                "trajectory://{}/{}",
                submission.session_id, submission.task
            ),
            data_points: submission.data.len(),
        };

        self.sessions
            .lock()
            .unwrap()
            .entry(submission.session_id)
            .or_default()
            .insert(submission.task, report.clone());

        Ok(report)
    }

    fn fetch_report(&self, session_id: &str) -> Result<SessionReport> {
        let sessions = self.sessions.lock().unwrap();
        let tasks = sessions
            .get(session_id)
            .ok_or_else(|| Error::Backend(format!("unknown session {session_id}")))?;
        Ok(SessionReport::from_tasks(tasks.clone()))
    }
}

fn compute_statistics(points: &[GazePoint]) -> TaskStatistics {
    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let x_avg = sum_x / n;
    let y_avg = sum_y / n;
    let (var_x, var_y) = points.iter().fold((0.0, 0.0), |(vx, vy), p| {
        (vx + (p.x - x_avg).powi(2), vy + (p.y - y_avg).powi(2))
    });
    TaskStatistics {
        x_avg,
        y_avg,
        x_std: (var_x / n).sqrt(),
        y_std: (var_y / n).sqrt(),
    }
}

fn diff_percent(user: TaskStatistics, baseline: TaskStatistics) -> TaskStatistics {
    fn pct(user: f64, baseline: f64) -> f64 {
        if baseline == 0.0 {
            0.0
        } else {
            (user - baseline) / baseline * 100.0
        }
    }
    TaskStatistics {
        x_avg: pct(user.x_avg, baseline.x_avg),
        y_avg: pct(user.y_avg, baseline.y_avg),
        x_std: pct(user.x_std, baseline.x_std),
        y_std: pct(user.y_std, baseline.y_std),
    }
}

/// Normative reference measures per task type.
fn normative_statistics(task: TaskKind) -> TaskStatistics {
    match task {
        TaskKind::Baseline => TaskStatistics {
            x_avg: 713.5751317312771,
            y_avg: 402.7833802120454,
            x_std: 250.3032201790183,
            y_std: 180.3955841826786,
        },
        TaskKind::Image => TaskStatistics {
            x_avg: 675.9809203021368,
            y_avg: 507.5129294969926,
            x_std: 96.34322937033356,
            y_std: 54.98972616789554,
        },
        TaskKind::Text => TaskStatistics {
            x_avg: 798.1710423511332,
            y_avg: 603.50437211459584,
            x_std: 202.98884055053023,
            y_std: 138.0331209650518,
        },
        TaskKind::Video => TaskStatistics {
            x_avg: 883.7260491898053,
            y_avg: 606.0342106999008,
            x_std: 197.26021187706115,
            y_std: 107.8777422682236,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Gender;

    #[test]
    fn test_statistics_mean_and_std() {
        let points = vec![
            GazePoint::new(0.0, 10.0),
            GazePoint::new(10.0, 10.0),
            GazePoint::new(20.0, 10.0),
        ];
        let stats = compute_statistics(&points);
        assert!((stats.x_avg - 10.0).abs() < 1e-12);
        assert!((stats.y_avg - 10.0).abs() < 1e-12);
        // population std of {0, 10, 20}
        assert!((stats.x_std - (200.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.y_std, 0.0);
    }

    #[test]
    fn test_empty_submission_rejected() {
        let backend = LocalBackend::new();
        let submission = TaskSubmission {
            session_id: "s1".to_string(),
            task: TaskKind::Image,
            data: vec![],
            age: 30,
            gender: Gender::Female,
            timestamp: Utc::now(),
        };
        assert!(backend.submit_task(submission).is_err());
    }

    #[test]
    fn test_fetch_unknown_session_fails() {
        let backend = LocalBackend::new();
        assert!(backend.fetch_report("nope").is_err());
    }
}
