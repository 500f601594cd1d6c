pub mod report;
pub mod session;
pub mod task;

pub use report::{BaselineComparison, SessionReport, TaskReport, TaskStatistics, TaskSubmission};
pub use session::{Gender, Participant};
pub use task::{GazePoint, TaskKind, TaskSpec};
