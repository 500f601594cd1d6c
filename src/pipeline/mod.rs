//! Online gaze signal pipeline: consumes raw emissions, applies the active
//! calibration mapping, gates recording by the tracking flag, and drives the
//! smoothed gaze dot on the display surface.

pub mod smoother;

pub use smoother::{DotSmoother, DotUpdate};

use crate::calibration::AffineMapping;
use crate::models::GazePoint;
use crate::ports::{DisplaySurface, RawEmission};
use log::info;
use std::mem;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// State mutated only by the emission worker (single writer) and by window
/// open/close under the same lock.
#[derive(Debug)]
struct PipelineState {
    mapping: AffineMapping,
    tracking: bool,
    latest_raw: Option<GazePoint>,
    buffer: Vec<GazePoint>,
    smoother: DotSmoother,
}

impl PipelineState {
    fn new() -> Self {
        Self {
            mapping: AffineMapping::identity(),
            tracking: false,
            latest_raw: None,
            buffer: Vec::new(),
            smoother: DotSmoother::default(),
        }
    }
}

pub struct GazePipeline<D> {
    state: Arc<Mutex<PipelineState>>,
    display: Arc<D>,
    worker: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl<D: DisplaySurface> GazePipeline<D> {
    pub fn new(display: Arc<D>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PipelineState::new())),
            display,
            worker: None,
            cancel: None,
        }
    }

    /// Spawn the emission worker on a fresh subscription, replacing any
    /// previous worker.
    pub fn attach(&mut self, emissions: UnboundedReceiver<RawEmission>) {
        self.abort_worker();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pipeline_loop(
            emissions,
            self.state.clone(),
            self.display.clone(),
            cancel.clone(),
        ));

        self.worker = Some(handle);
        self.cancel = Some(cancel);
    }

    /// Cancel the worker and wait for it, discarding any pending emissions.
    pub async fn shutdown(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.await;
        }
        *self.state.lock().await = PipelineState::new();
    }

    pub async fn set_mapping(&self, mapping: AffineMapping) {
        self.state.lock().await.mapping = mapping.sanitized();
    }

    pub async fn mapping(&self) -> AffineMapping {
        self.state.lock().await.mapping
    }

    /// Latest raw (unmapped) prediction processed by the worker.
    pub async fn latest_raw(&self) -> Option<GazePoint> {
        self.state.lock().await.latest_raw
    }

    /// Open a tracking window: clear the previous buffer and start recording
    /// mapped coordinates. The mapping in effect now stays in effect for the
    /// whole window.
    pub async fn begin_window(&self) {
        let mut state = self.state.lock().await;
        state.buffer.clear();
        state.tracking = true;
    }

    /// Close the tracking window and transfer ownership of the recorded
    /// buffer to the caller.
    pub async fn end_window(&self) -> Vec<GazePoint> {
        let data = {
            let mut state = self.state.lock().await;
            state.tracking = false;
            state.smoother.reset();
            mem::take(&mut state.buffer)
        };
        self.display.hide_gaze_dot();
        data
    }

    fn abort_worker(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            handle.abort();
        }
    }
}

impl<D> Drop for GazePipeline<D> {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.worker.take() {
            handle.abort();
        }
    }
}

async fn pipeline_loop<D: DisplaySurface>(
    mut emissions: UnboundedReceiver<RawEmission>,
    state: Arc<Mutex<PipelineState>>,
    display: Arc<D>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("gaze pipeline worker shutting down");
                break;
            }
            emission = emissions.recv() => {
                match emission {
                    Some(emission) => handle_emission(&state, display.as_ref(), emission).await,
                    None => {
                        info!("gaze emission channel closed");
                        break;
                    }
                }
            }
        }
    }
}

/// Single exclusive critical section per emission.
async fn handle_emission<D: DisplaySurface>(
    state: &Arc<Mutex<PipelineState>>,
    display: &D,
    emission: RawEmission,
) {
    let update = {
        let mut state = state.lock().await;

        if let Some(raw) = emission {
            state.latest_raw = Some(raw);
        }

        let mapped = state.mapping.apply_raw(emission);

        if state.tracking {
            if let Some(point) = mapped {
                state.buffer.push(point);
            }
        }

        // The dot stays live regardless of the tracking flag.
        state
            .smoother
            .observe(mapped.map(|p| (p.x, p.y)), Instant::now())
    };

    match update {
        DotUpdate::Hide => display.hide_gaze_dot(),
        DotUpdate::Skip => {}
        DotUpdate::Render { x, y } => display.render_gaze_dot(x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationTarget, Rect};
    use crate::models::TaskKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct NullDisplay {
        renders: AtomicUsize,
        hides: AtomicUsize,
    }

    impl NullDisplay {
        fn new() -> Self {
            Self {
                renders: AtomicUsize::new(0),
                hides: AtomicUsize::new(0),
            }
        }
    }

    impl DisplaySurface for NullDisplay {
        fn render_gaze_dot(&self, _x: f64, _y: f64) {
            self.renders.fetch_add(1, Ordering::SeqCst);
        }
        fn hide_gaze_dot(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
        fn set_active_target(&self, _target: CalibrationTarget) {}
        fn clear_targets(&self) {}
        fn target_rect(&self, _target: CalibrationTarget) -> Rect {
            Rect::new(0.0, 0.0, 10.0, 10.0)
        }
        fn show_task_content(&self, _task: TaskKind) {}
        fn countdown_tick(&self, _remaining_secs: u64) {}
        fn task_progress(&self, _elapsed_secs: u64, _total_secs: u64) {}
    }

    async fn wait_for_raw<D: DisplaySurface>(pipeline: &GazePipeline<D>, expected: GazePoint) {
        for _ in 0..200 {
            if pipeline.latest_raw().await == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("pipeline never observed {expected:?}");
    }

    #[tokio::test]
    async fn test_emissions_outside_window_are_not_recorded() {
        let display = Arc::new(NullDisplay::new());
        let mut pipeline = GazePipeline::new(display);
        let (tx, rx) = mpsc::unbounded_channel();
        pipeline.attach(rx);

        for i in 0..20 {
            tx.send(Some(GazePoint::new(i as f64, i as f64))).unwrap();
        }
        wait_for_raw(&pipeline, GazePoint::new(19.0, 19.0)).await;

        pipeline.begin_window().await;
        let data = pipeline.end_window().await;
        assert!(data.is_empty(), "tracking was off while emissions arrived");
    }

    #[tokio::test]
    async fn test_window_records_mapped_points() {
        let display = Arc::new(NullDisplay::new());
        let mut pipeline = GazePipeline::new(display);
        let (tx, rx) = mpsc::unbounded_channel();
        pipeline.attach(rx);

        pipeline
            .set_mapping(AffineMapping {
                ax: 1.0,
                bx: 50.0,
                ay: 1.0,
                by: -20.0,
            })
            .await;

        pipeline.begin_window().await;
        tx.send(Some(GazePoint::new(100.0, 100.0))).unwrap();
        tx.send(None).unwrap();
        tx.send(Some(GazePoint::new(200.0, 200.0))).unwrap();
        wait_for_raw(&pipeline, GazePoint::new(200.0, 200.0)).await;

        let data = pipeline.end_window().await;
        assert_eq!(
            data,
            vec![GazePoint::new(150.0, 80.0), GazePoint::new(250.0, 180.0)]
        );

        // Buffer ownership transferred; the next window starts empty.
        pipeline.begin_window().await;
        assert!(pipeline.end_window().await.is_empty());
    }

    #[tokio::test]
    async fn test_absence_hides_dot_and_keeps_raw_cache() {
        let display = Arc::new(NullDisplay::new());
        let mut pipeline = GazePipeline::new(display.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        pipeline.attach(rx);

        tx.send(Some(GazePoint::new(42.0, 7.0))).unwrap();
        wait_for_raw(&pipeline, GazePoint::new(42.0, 7.0)).await;
        tx.send(None).unwrap();

        for _ in 0..200 {
            if display.hides.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(display.hides.load(Ordering::SeqCst) > 0);
        assert_eq!(pipeline.latest_raw().await, Some(GazePoint::new(42.0, 7.0)));
    }

    #[tokio::test]
    async fn test_shutdown_resets_state() {
        let display = Arc::new(NullDisplay::new());
        let mut pipeline = GazePipeline::new(display);
        let (tx, rx) = mpsc::unbounded_channel();
        pipeline.attach(rx);

        tx.send(Some(GazePoint::new(1.0, 2.0))).unwrap();
        wait_for_raw(&pipeline, GazePoint::new(1.0, 2.0)).await;

        pipeline.shutdown().await;
        assert_eq!(pipeline.latest_raw().await, None);
        assert_eq!(pipeline.mapping().await, AffineMapping::identity());
    }
}
