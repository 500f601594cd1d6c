use super::session::Gender;
use super::task::{GazePoint, TaskKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-task payload sent to the report backend when a tracking window closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub session_id: String,
    pub task: TaskKind,
    pub data: Vec<GazePoint>,
    pub age: u32,
    pub gender: Gender,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskStatistics {
    pub x_avg: f64,
    pub y_avg: f64,
    pub x_std: f64,
    pub y_std: f64,
}

/// Comparison of one task's statistics against normative reference values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub user: TaskStatistics,
    pub baseline: TaskStatistics,
    pub diff_percent: TaskStatistics,
}

/// Canonical per-task result shape. The backend returns it as the submission
/// acknowledgement, and the full session report embeds the same type, so the
/// local-fallback path and the fetched-report path are structurally identical
/// by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task: TaskKind,
    pub statistics: TaskStatistics,
    pub comparison: BaselineComparison,
    /// Opaque reference to a rendered trajectory visualization.
    pub visualization: String,
    pub data_points: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub summary: String,
    pub tasks: BTreeMap<TaskKind, TaskReport>,
    pub total_tasks: usize,
    pub recommendation: String,
}

impl SessionReport {
    /// Assemble a report from per-task results, whether accumulated locally
    /// from submission acknowledgements or aggregated by the backend.
    pub fn from_tasks(tasks: BTreeMap<TaskKind, TaskReport>) -> Self {
        let total_tasks = tasks.len();
        Self {
            summary: "Gaze tracking session report".to_string(),
            recommendation: recommendation_for(total_tasks),
            tasks,
            total_tasks,
        }
    }
}

fn recommendation_for(completed: usize) -> String {
    if completed >= 4 {
        "All tasks completed; the collected data set is complete.".to_string()
    } else if completed >= 2 {
        format!("Completed {completed}/4 tasks; finish the remaining tasks for a more accurate analysis.")
    } else {
        "Few tasks completed; more tasks are needed for a meaningful report.".to_string()
    }
}
