//! Individual preprocessing steps

pub mod bilateral;
pub mod denoise;
pub mod grayscale;
pub mod region;
pub mod threshold;
pub mod upscale;
