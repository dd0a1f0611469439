use image::{DynamicImage, GrayImage};

/// Convert the canonical raster to a single luminance channel
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}
