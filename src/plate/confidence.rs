use super::extract::RawCandidate;

/// Scores attached to surfaced candidates.
///
/// The recognition engine exposes no usable per-candidate confidence, so
/// scores are heuristic, not probabilities.
pub trait ConfidencePolicy: Send + Sync {
    /// Score for manually entered text
    fn manual(&self) -> u8;

    /// Score for a candidate extracted from OCR output
    fn ocr(&self, candidate: &RawCandidate) -> u8;
}

/// Constant scores: 100 for manual entry, 85 for any OCR candidate
#[derive(Debug, Clone, Copy)]
pub struct FixedConfidence {
    pub manual: u8,
    pub ocr: u8,
}

impl Default for FixedConfidence {
    fn default() -> Self {
        Self {
            manual: 100,
            ocr: 85,
        }
    }
}

impl ConfidencePolicy for FixedConfidence {
    fn manual(&self) -> u8 {
        self.manual
    }

    fn ocr(&self, _candidate: &RawCandidate) -> u8 {
        self.ocr
    }
}
