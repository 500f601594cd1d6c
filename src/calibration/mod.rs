pub mod fitter;
pub mod sampler;

pub use fitter::{fit_axis, fit_mapping, AffineMapping, AxisFit, CalibrationSample};
pub use sampler::{CalibrationConfig, CalibrationSampler, CalibrationTarget, Rect};
