use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Baseline,
    Image,
    Video,
    Text,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Baseline => "baseline",
            TaskKind::Image => "image",
            TaskKind::Video => "video",
            TaskKind::Text => "text",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single gaze coordinate: a raw emission from the prediction source, or a
/// mapped point in a task's recording buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GazePoint {
    pub x: f64,
    pub y: f64,
}

impl GazePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Immutable task descriptor. The ordered task list is configuration and is
/// never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub name: String,
    pub description: String,
    pub duration_secs: u64,
}

impl TaskSpec {
    pub fn new(kind: TaskKind, name: &str, description: &str, duration_secs: u64) -> Self {
        Self {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            duration_secs,
        }
    }
}
