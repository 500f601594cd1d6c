pub mod calibration;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod ports;
pub mod session;
pub mod sim;

pub use calibration::{AffineMapping, CalibrationSampler, CalibrationTarget, Rect};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use models::{GazePoint, Gender, Participant, SessionReport, TaskKind, TaskSpec};
pub use pipeline::GazePipeline;
pub use ports::{DisplaySurface, GazeSource, RawEmission, ReportBackend};
pub use session::{SessionController, SessionPhase};
