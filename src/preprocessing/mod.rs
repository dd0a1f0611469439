//! Image preprocessing: plate region isolation and enhancement ahead of OCR
//!
//! Two strategies are available through [`Preset`]: the contour-based
//! isolate-then-enhance pipeline and a grayscale pass-through.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PreprocessingResult, Preset, StepTiming};
pub use steps::region::{PlateRegion, Rect};
