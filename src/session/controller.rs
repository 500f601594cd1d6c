//! Session state machine: sequences tasks, triggers calibration for the
//! baseline task, opens and closes tracking windows, and forwards completed
//! per-task buffers to the report backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use crate::calibration::CalibrationSampler;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::models::{Participant, SessionReport, TaskKind, TaskReport, TaskSpec, TaskSubmission};
use crate::pipeline::GazePipeline;
use crate::ports::{DisplaySurface, GazeSource, ReportBackend};
use crate::session::state::SessionPhase;

pub struct SessionController<S, D, B> {
    config: SessionConfig,
    source: Arc<S>,
    display: Arc<D>,
    backend: Arc<B>,
    pipeline: GazePipeline<D>,
    sampler: CalibrationSampler,
    session_id: String,
    participant: Option<Participant>,
    phase: SessionPhase,
    /// Submission acknowledgements accumulated this session; the fallback
    /// report is assembled from these when the backend fetch fails.
    local_results: BTreeMap<TaskKind, TaskReport>,
}

impl<S, D, B> SessionController<S, D, B>
where
    S: GazeSource,
    D: DisplaySurface,
    B: ReportBackend,
{
    pub fn new(config: SessionConfig, source: Arc<S>, display: Arc<D>, backend: Arc<B>) -> Self {
        let pipeline = GazePipeline::new(display.clone());
        let sampler = CalibrationSampler::new(config.calibration.clone());
        let session_id = Uuid::new_v4().to_string();
        info!("session controller ready, session id {session_id}");

        Self {
            config,
            source,
            display,
            backend,
            pipeline,
            sampler,
            session_id,
            participant: None,
            phase: SessionPhase::Welcome,
            local_results: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn participant(&self) -> Option<Participant> {
        self.participant
    }

    pub fn pipeline(&self) -> &GazePipeline<D> {
        &self.pipeline
    }

    /// Welcome → Prepare(0). Validates participant attributes and starts the
    /// prediction source; on any failure the phase stays at Welcome.
    pub fn start_session(&mut self, age: &str, gender: &str) -> Result<()> {
        if self.phase != SessionPhase::Welcome {
            return Err(Error::InvalidState(format!(
                "cannot start a session from {:?}",
                self.phase
            )));
        }

        let participant = Participant::parse(age, gender)?;
        self.source.init()?;

        self.pipeline.attach(self.source.subscribe());
        self.participant = Some(participant);
        self.phase = SessionPhase::Prepare(0);
        info!(
            "session {} started (age {}, gender {})",
            self.session_id,
            participant.age,
            participant.gender.as_str()
        );
        Ok(())
    }

    /// Drive the session through every remaining task, then Processing and
    /// Report. Returns the aggregated report, degraded to locally
    /// accumulated acknowledgements if the backend fetch fails.
    pub async fn run(&mut self) -> Result<SessionReport> {
        let first = match self.phase {
            SessionPhase::Prepare(i) => i,
            _ => {
                return Err(Error::InvalidState(format!(
                    "cannot run tasks from {:?}",
                    self.phase
                )))
            }
        };

        for index in first..self.config.tasks.len() {
            self.phase = SessionPhase::Prepare(index);
            let task = self.config.tasks[index].clone();
            info!("preparing task {} ({})", task.kind, task.name);
            self.countdown().await;

            self.phase = SessionPhase::Running(index);
            self.display.show_task_content(task.kind);

            // The baseline task is the only one preceded by calibration; the
            // fitted mapping is installed before the window opens and is not
            // swapped mid-window.
            if task.kind == TaskKind::Baseline {
                self.sampler
                    .run(self.source.as_ref(), self.display.as_ref(), &self.pipeline)
                    .await;
            }

            let data = self.run_window(&task).await;
            info!("task {} finished with {} data points", task.kind, data.len());
            self.submit(&task, data).await;
        }

        self.phase = SessionPhase::Processing;
        let report = self.fetch_report().await;
        self.phase = SessionPhase::Report;
        Ok(report)
    }

    /// Report → Welcome. Tears down the prediction source, discards pending
    /// emissions, and issues a fresh session identity.
    pub async fn restart(&mut self) {
        self.pipeline.shutdown().await;
        self.source.teardown();

        self.session_id = Uuid::new_v4().to_string();
        self.participant = None;
        self.local_results.clear();
        self.phase = SessionPhase::Welcome;
        info!("session restarted, new session id {}", self.session_id);
    }

    /// Purely presentational; not skippable by data arrival.
    async fn countdown(&self) {
        for remaining in (1..=self.config.countdown_secs).rev() {
            self.display.countdown_tick(remaining);
            time::sleep(self.config.tick).await;
        }
    }

    /// Open the task's timed tracking window and hand back the recorded
    /// buffer when it closes.
    async fn run_window(&self, task: &TaskSpec) -> Vec<crate::models::GazePoint> {
        self.source.resume();
        self.pipeline.begin_window().await;

        let total = task.duration_secs;
        let mut ticker = time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately

        for elapsed in 1..=total {
            ticker.tick().await;
            self.display.task_progress(elapsed, total);
        }

        let data = self.pipeline.end_window().await;
        self.source.pause();
        data
    }

    /// Best-effort telemetry: a submission failure is surfaced but never
    /// blocks progression to the next task.
    async fn submit(&mut self, task: &TaskSpec, data: Vec<crate::models::GazePoint>) {
        let Some(participant) = self.participant else {
            error!("no participant attached to session {}", self.session_id);
            return;
        };

        let submission = TaskSubmission {
            session_id: self.session_id.clone(),
            task: task.kind,
            data,
            age: participant.age,
            gender: participant.gender,
            timestamp: Utc::now(),
        };

        if log::log_enabled!(log::Level::Debug) {
            match serde_json::to_string(&submission) {
                Ok(json) => log::debug!("submitting: {json}"),
                Err(err) => log::debug!("submission not serializable: {err}"),
            }
        }

        let backend = Arc::clone(&self.backend);
        let kind = task.kind;
        match tokio::task::spawn_blocking(move || backend.submit_task(submission)).await {
            Ok(Ok(report)) => {
                info!("task {kind} submission acknowledged ({} points)", report.data_points);
                self.local_results.insert(kind, report);
            }
            Ok(Err(err)) => error!("task {kind} submission failed: {err}"),
            Err(err) => error!("task {kind} submission worker failed to join: {err}"),
        }
    }

    async fn fetch_report(&self) -> SessionReport {
        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();

        match tokio::task::spawn_blocking(move || backend.fetch_report(&session_id)).await {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                warn!(
                    "report fetch failed ({err}), assembling partial report from {} local results",
                    self.local_results.len()
                );
                SessionReport::from_tasks(self.local_results.clone())
            }
            Err(err) => {
                warn!("report fetch worker failed to join ({err}), using local results");
                SessionReport::from_tasks(self.local_results.clone())
            }
        }
    }
}
