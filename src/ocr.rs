//! Multi-pass OCR execution
//!
//! Runs the engine once per configuration profile over the enhanced plate
//! raster and once, unconfigured, over the original frame. A failing pass
//! only empties its own output.

use crate::engine::{default_profiles, EngineHandle, OcrProfile};
use crate::error::OcrError;
use image::DynamicImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Outcome of one engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPass {
    pub profile: String,
    /// Recognized text; empty when the pass failed
    pub text: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// All passes of one detection
#[derive(Debug, Clone)]
pub struct OcrBatch {
    /// Profile passes over the enhanced raster, in profile order
    pub passes: Vec<OcrPass>,
    /// Unconfigured pass over the original frame
    pub original: OcrPass,
}

impl OcrBatch {
    /// Profile pass outputs joined with single spaces, in profile order
    pub fn combined_text(&self) -> String {
        self.passes
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn failures(&self) -> usize {
        self.passes
            .iter()
            .chain(std::iter::once(&self.original))
            .filter(|p| !p.ok)
            .count()
    }
}

pub struct MultiPassExecutor {
    handle: EngineHandle,
    profiles: Vec<OcrProfile>,
}

impl MultiPassExecutor {
    pub fn new(handle: EngineHandle) -> Self {
        Self::with_profiles(handle, default_profiles())
    }

    pub fn with_profiles(handle: EngineHandle, profiles: Vec<OcrProfile>) -> Self {
        Self { handle, profiles }
    }

    pub fn profiles(&self) -> &[OcrProfile] {
        &self.profiles
    }

    pub fn engine_name(&self) -> &'static str {
        self.handle.name()
    }

    pub fn run(&self, enhanced: &DynamicImage, original: &DynamicImage) -> OcrBatch {
        let passes = self
            .profiles
            .iter()
            .map(|profile| self.run_pass(enhanced, profile))
            .collect();
        let original = self.run_pass(original, &OcrProfile::unconfigured());

        OcrBatch { passes, original }
    }

    fn run_pass(&self, image: &DynamicImage, profile: &OcrProfile) -> OcrPass {
        let start = Instant::now();
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.handle.recognize(image, profile)))
                .unwrap_or_else(|payload| {
                    Err(OcrError::ProcessingError(format!(
                        "engine panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });

        match outcome {
            Ok(text) => {
                tracing::debug!(
                    profile = %profile.name,
                    chars = text.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "OCR pass complete"
                );
                OcrPass {
                    profile: profile.name.clone(),
                    text,
                    ok: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(profile = %profile.name, error = %e, "OCR pass failed");
                OcrPass {
                    profile: profile.name.clone(),
                    text: String::new(),
                    ok: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::StubEngine;
    use std::sync::Arc;

    fn images() -> (DynamicImage, DynamicImage) {
        (DynamicImage::new_luma8(8, 4), DynamicImage::new_rgb8(16, 8))
    }

    #[test]
    fn test_runs_every_profile_then_original() {
        let stub = Arc::new(StubEngine::new());
        let executor = MultiPassExecutor::new(EngineHandle::new(stub.clone()));
        let (enhanced, original) = images();

        executor.run(&enhanced, &original);

        assert_eq!(
            stub.calls(),
            vec!["single-word", "single-line", "raw-line", "sparse-text", "original"]
        );
    }

    #[test]
    fn test_combined_text_in_profile_order() {
        let stub = StubEngine::new()
            .respond("single-word", "ABC123")
            .respond("single-line", "ABC 123")
            .respond("sparse-text", "XYZ")
            .respond("original", "FRAME TEXT");
        let executor = MultiPassExecutor::new(EngineHandle::new(Arc::new(stub)));
        let (enhanced, original) = images();

        let batch = executor.run(&enhanced, &original);

        assert_eq!(batch.combined_text(), "ABC123 ABC 123  XYZ");
        assert_eq!(batch.original.text, "FRAME TEXT");
        assert_eq!(batch.failures(), 0);
    }

    #[test]
    fn test_failed_pass_does_not_abort_batch() {
        let stub = StubEngine::new()
            .respond("single-word", "AB1234")
            .fail("single-line")
            .respond("raw-line", "CD5678")
            .fail("original");
        let executor = MultiPassExecutor::new(EngineHandle::new(Arc::new(stub)));
        let (enhanced, original) = images();

        let batch = executor.run(&enhanced, &original);

        assert_eq!(batch.passes.len(), 4);
        assert!(!batch.passes[1].ok);
        assert_eq!(batch.passes[1].text, "");
        assert!(batch.passes[1].error.is_some());
        assert!(batch.passes[2].ok);
        assert!(!batch.original.ok);
        assert_eq!(batch.failures(), 2);
        assert_eq!(batch.combined_text(), "AB1234  CD5678 ");
    }

    #[test]
    fn test_panicking_pass_is_recorded_as_failure() {
        let stub = StubEngine::new()
            .panic_on("single-line")
            .respond("sparse-text", "AB1234")
            .respond("original", "FRAME");
        let executor = MultiPassExecutor::new(EngineHandle::new(Arc::new(stub)));
        let (enhanced, original) = images();

        let batch = executor.run(&enhanced, &original);

        assert!(!batch.passes[1].ok);
        assert_eq!(batch.passes[1].text, "");
        assert!(batch.passes[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("engine panicked: stub panic for single-line")));
        assert_eq!(batch.passes[3].text, "AB1234");
        assert_eq!(batch.original.text, "FRAME");
        assert_eq!(batch.failures(), 1);
    }

    #[test]
    fn test_custom_profiles() {
        let stub = Arc::new(StubEngine::new());
        let profiles = vec![OcrProfile::new("only", Some(6), None)];
        let executor = MultiPassExecutor::with_profiles(EngineHandle::new(stub.clone()), profiles);
        let (enhanced, original) = images();

        let batch = executor.run(&enhanced, &original);

        assert_eq!(batch.passes.len(), 1);
        assert_eq!(stub.calls(), vec!["only", "original"]);
    }
}
