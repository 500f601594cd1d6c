use serde::Serialize;

/// Session phases. `Prepare` and `Running` carry the index of the current
/// task in the configured task list.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Welcome,
    Prepare(usize),
    Running(usize),
    Processing,
    Report,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Welcome
    }
}

impl SessionPhase {
    /// Index of the task this phase refers to, when it refers to one.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            SessionPhase::Prepare(i) | SessionPhase::Running(i) => Some(*i),
            _ => None,
        }
    }
}
