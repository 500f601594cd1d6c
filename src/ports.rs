//! Capability interfaces for the external collaborators: the raw gaze
//! prediction engine, the display/rendering surface, and the backend report
//! service. The core logic only ever talks to these traits, so it is
//! testable without a camera, a real surface, or a network.

use crate::calibration::{CalibrationTarget, Rect};
use crate::error::Result;
use crate::models::{GazePoint, SessionReport, TaskKind, TaskReport, TaskSubmission};
use tokio::sync::mpsc::UnboundedReceiver;

/// One asynchronous emission from the prediction engine: a raw screen-space
/// estimate, or absence when the engine currently has no prediction.
pub type RawEmission = Option<GazePoint>;

/// The raw gaze-prediction engine. Once started it emits estimates at its
/// own cadence on the subscribed channel, concurrently with any cooperative
/// sleep in progress.
pub trait GazeSource: Send + Sync + 'static {
    /// Start the engine. Failure is fatal-to-start and is not retried
    /// automatically.
    fn init(&self) -> Result<()>;

    /// Hand out the emission channel the pipeline worker consumes. Replaces
    /// any previous subscription.
    fn subscribe(&self) -> UnboundedReceiver<RawEmission>;

    fn resume(&self);

    fn pause(&self);

    /// Permanently tear down the engine, cancelling pending emissions.
    fn teardown(&self);

    /// Tell the engine where the participant is truly fixating so it can
    /// internally adapt. May fail while the engine is warming up; callers
    /// treat that as a missing sample.
    fn inform_true_position(&self, x: f64, y: f64) -> Result<()>;

    /// Latest raw (unmapped) prediction, if any has been produced yet.
    fn latest_raw(&self) -> Option<GazePoint>;
}

/// The rendering surface. A pure sink: the core never reads UI state back
/// except to resolve calibration target rectangles, which may shift with
/// layout and are therefore re-resolved per target.
pub trait DisplaySurface: Send + Sync + 'static {
    fn render_gaze_dot(&self, x: f64, y: f64);

    fn hide_gaze_dot(&self);

    /// Mark one calibration target visually active, deactivating the others.
    fn set_active_target(&self, target: CalibrationTarget);

    fn clear_targets(&self);

    /// Current bounding rectangle of a calibration target.
    fn target_rect(&self, target: CalibrationTarget) -> Rect;

    fn show_task_content(&self, task: TaskKind);

    /// Presentational countdown feedback before a task starts.
    fn countdown_tick(&self, remaining_secs: u64);

    /// Per-second progress feedback while a tracking window is open. UI
    /// only; has no effect on data semantics.
    fn task_progress(&self, elapsed_secs: u64, total_secs: u64);
}

/// The backend aggregation/report service. Calls may block on the network;
/// the controller wraps them in `spawn_blocking`.
pub trait ReportBackend: Send + Sync + 'static {
    fn submit_task(&self, submission: TaskSubmission) -> Result<TaskReport>;

    fn fetch_report(&self, session_id: &str) -> Result<SessionReport>;
}
