use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Characters a plate can contain; used as the whitelist for the
/// alphanumeric profiles.
pub const PLATE_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One OCR configuration profile: page segmentation mode plus an optional
/// character whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrProfile {
    pub name: String,
    pub page_seg_mode: Option<u8>,
    pub char_whitelist: Option<String>,
}

impl OcrProfile {
    pub fn new(name: &str, page_seg_mode: Option<u8>, char_whitelist: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            page_seg_mode,
            char_whitelist: char_whitelist.map(str::to_string),
        }
    }

    /// Engine defaults, used for the pass over the original frame
    pub fn unconfigured() -> Self {
        Self::new("original", None, None)
    }

    /// Tesseract command-line form of this profile, e.g.
    /// `--psm 7 -c tessedit_char_whitelist=ABC...`
    pub fn config_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(psm) = self.page_seg_mode {
            parts.push(format!("--psm {}", psm));
        }
        if let Some(whitelist) = &self.char_whitelist {
            parts.push(format!("-c tessedit_char_whitelist={}", whitelist));
        }
        parts.join(" ")
    }
}

/// The fixed pass list run against the enhanced plate region.
pub fn default_profiles() -> Vec<OcrProfile> {
    vec![
        OcrProfile::new("single-word", Some(8), Some(PLATE_CHARSET)),
        OcrProfile::new("single-line", Some(7), Some(PLATE_CHARSET)),
        OcrProfile::new("raw-line", Some(13), None),
        OcrProfile::new("sparse-text", Some(11), None),
    ]
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Whether independent `recognize` calls may run concurrently
    fn reentrant(&self) -> bool {
        true
    }

    /// Recognize the text in `image` under `profile`
    fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<String, OcrError>;
}

/// Shared handle to the recognition engine.
///
/// Non-reentrant engines are serialized through a single lock that is
/// held for exactly one `recognize` call.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn OcrEngine>,
    exclusive: Option<Arc<Mutex<()>>>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        let exclusive = (!engine.reentrant()).then(|| Arc::new(Mutex::new(())));
        Self { engine, exclusive }
    }

    pub fn name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<String, OcrError> {
        match &self.exclusive {
            Some(lock) => {
                // A panic in an earlier call leaves no state behind the lock.
                let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                self.engine.recognize(image, profile)
            }
            None => self.engine.recognize(image, profile),
        }
    }
}
