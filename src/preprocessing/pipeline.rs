use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::region::PlateRegion;

/// Preprocessing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Grayscale, bilateral smoothing, contour-based plate isolation, then
    /// 2x upscale, Otsu threshold and median denoise of the region
    #[default]
    Contour,
    /// Plain grayscale of the whole frame, no isolation or enhancement
    Grayscale,
}

impl Preset {
    /// Parse from a CLI/env value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "contour" => Some(Self::Contour),
            "grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contour => "contour",
            Self::Grayscale => "grayscale",
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    /// Raster handed to the OCR passes
    pub image: GrayImage,
    /// Region the image was derived from
    pub region: PlateRegion,
    pub preset: Preset,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline that applies steps based on preset
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    preset: Preset,
}

impl Pipeline {
    pub fn new(preset: Preset) -> Self {
        Self { preset }
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Process an image according to the configured preset
    pub fn process(&self, image: &DynamicImage) -> Result<PreprocessingResult, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::PreprocessingError(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let mut timings = Vec::new();

        let gray = run_step("grayscale", &mut timings, || steps::grayscale::apply(image));

        let (region, enhanced) = match self.preset {
            Preset::Grayscale => {
                let region = PlateRegion::full(gray);
                let enhanced = region.image.clone();
                (region, enhanced)
            }
            Preset::Contour => {
                let smoothed =
                    run_step("bilateral", &mut timings, || steps::bilateral::apply(&gray));
                let region = run_step("region", &mut timings, || steps::region::isolate(&smoothed));
                let upscaled =
                    run_step("upscale", &mut timings, || steps::upscale::apply(&region.image));
                let binary =
                    run_step("threshold", &mut timings, || steps::threshold::apply(&upscaled));
                let enhanced = run_step("denoise", &mut timings, || steps::denoise::apply(&binary));
                (region, enhanced)
            }
        };

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            preset = self.preset.as_str(),
            total_time_ms,
            fallback = region.fallback,
            steps = ?timings,
            "Preprocessing complete"
        );

        Ok(PreprocessingResult {
            image: enhanced,
            region,
            preset: self.preset,
            total_time_ms,
            steps: timings,
        })
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
where
    F: FnOnce() -> T,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(80, 40, |x, _| {
            if x < 40 {
                Rgb([200, 200, 200])
            } else {
                Rgb([40, 40, 40])
            }
        }))
    }

    #[test]
    fn test_preset_round_trips_names() {
        for preset in [Preset::Contour, Preset::Grayscale] {
            assert_eq!(Preset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(Preset::from_str("CONTOUR"), Some(Preset::Contour));
        assert_eq!(Preset::from_str("aggressive"), None);
    }

    #[test]
    fn test_grayscale_preset_passes_frame_through() {
        let img = frame();
        let result = Pipeline::new(Preset::Grayscale).process(&img).unwrap();

        assert_eq!(result.image, img.to_luma8());
        assert!(result.region.fallback);
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["grayscale"]);
    }

    #[test]
    fn test_contour_preset_runs_all_steps() {
        let result = Pipeline::new(Preset::Contour).process(&frame()).unwrap();

        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["grayscale", "bilateral", "region", "upscale", "threshold", "denoise"]
        );
        assert_eq!(
            result.image.dimensions(),
            (result.region.rect.width * 2, result.region.rect.height * 2)
        );
        assert!(result.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_contour_preset_is_deterministic() {
        let img = frame();
        let pipeline = Pipeline::new(Preset::Contour);
        let a = pipeline.process(&img).unwrap();
        let b = pipeline.process(&img).unwrap();
        assert_eq!(a.image, b.image);
        assert_eq!(a.region.rect, b.region.rect);
    }

    #[test]
    fn test_rejects_empty_image() {
        let img = DynamicImage::new_rgb8(0, 10);
        let result = Pipeline::new(Preset::Contour).process(&img);
        assert!(matches!(result, Err(OcrError::PreprocessingError(_))));
    }
}
