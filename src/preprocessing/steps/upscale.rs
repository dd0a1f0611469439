use image::{imageops::FilterType, GrayImage};

/// Scale factor applied to the isolated region before binarization
pub const SCALE: u32 = 2;

/// Enlarge the region with smooth (bicubic) interpolation so thin glyph
/// strokes survive thresholding
pub fn apply(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    image::imageops::resize(
        image,
        width * SCALE,
        height * SCALE,
        FilterType::CatmullRom,
    )
}
