use image::GrayImage;
use imageproc::filter::bilateral_filter;

/// Neighbourhood diameter in pixels
pub const DIAMETER: u32 = 11;
/// Intensity distance at which neighbours stop contributing
pub const SIGMA_COLOR: f32 = 17.0;
/// Spatial falloff of neighbour weights
pub const SIGMA_SPACE: f32 = 17.0;

/// Edge-preserving smoothing ahead of edge detection: flat regions are
/// smoothed while strong steps (plate borders) stay sharp
pub fn apply(image: &GrayImage) -> GrayImage {
    bilateral_filter(image, DIAMETER, SIGMA_COLOR, SIGMA_SPACE)
}
