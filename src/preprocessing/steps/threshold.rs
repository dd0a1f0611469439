use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

/// Global Otsu binarization: pixels brighter than the level become white,
/// the rest black
pub fn apply(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    threshold(image, level, ThresholdType::Binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(&img);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_dark_text_on_light_plate() {
        let mut img = GrayImage::from_pixel(60, 20, Luma([220]));
        for x in 10..50 {
            for y in 8..12 {
                img.put_pixel(x, y, Luma([30]));
            }
        }

        let result = apply(&img);

        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 2).0[0], 255);
    }
}
