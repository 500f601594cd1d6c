use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The prediction engine failed to start. Fatal to session start.
    #[error("gaze source failed to initialize: {0}")]
    SourceInit(String),

    /// A runtime failure inside the prediction engine.
    #[error("gaze source error: {0}")]
    Source(String),

    /// Not enough calibration samples to fit an axis.
    #[error("insufficient calibration data: {0} samples, need at least 2")]
    InsufficientData(usize),

    #[error("invalid participant: {0}")]
    InvalidParticipant(String),

    /// Report backend rejected or failed a request.
    #[error("backend error: {0}")]
    Backend(String),

    /// An operation was requested in a phase that does not allow it.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}
