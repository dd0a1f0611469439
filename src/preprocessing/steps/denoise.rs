use image::GrayImage;
use imageproc::filter::median_filter;

/// 3x3 median filter; removes isolated speckles left by binarization
pub fn apply(image: &GrayImage) -> GrayImage {
    median_filter(image, 1, 1)
}
