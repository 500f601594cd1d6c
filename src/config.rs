use crate::calibration::CalibrationConfig;
use crate::models::{TaskKind, TaskSpec};
use std::time::Duration;

/// Session configuration: the ordered task list plus timing knobs. The tick
/// length is one presentational "second"; tests compress it.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tasks: Vec<TaskSpec>,
    /// Countdown shown on the prepare screen, in ticks.
    pub countdown_secs: u64,
    /// Wall-clock length of one countdown/progress tick.
    pub tick: Duration,
    pub calibration: CalibrationConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tasks: default_tasks(),
            countdown_secs: 3,
            tick: Duration::from_secs(1),
            calibration: CalibrationConfig::default(),
        }
    }
}

pub fn default_tasks() -> Vec<TaskSpec> {
    vec![
        TaskSpec::new(
            TaskKind::Baseline,
            "Baseline calibration",
            "Fixate on each dot as it lights up so the system can calibrate your gaze.",
            6,
        ),
        TaskSpec::new(
            TaskKind::Image,
            "Image viewing",
            "Look carefully at the two pictures, focusing on the rooster.",
            6,
        ),
        TaskSpec::new(
            TaskKind::Video,
            "Video watching",
            "Watch the clip and follow the motion naturally.",
            10,
        ),
        TaskSpec::new(
            TaskKind::Text,
            "Text reading",
            "Read the paragraph on screen out loud.",
            15,
        ),
    ]
}
