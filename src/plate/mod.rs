//! Plate text handling: candidate extraction from OCR output, the
//! canonical comparison key, and confidence scoring.

pub mod confidence;
pub mod extract;
pub mod normalize;

pub use confidence::{ConfidencePolicy, FixedConfidence};
pub use extract::{extract_candidates, PatternClass, RawCandidate};
pub use normalize::{normalize_plate, plates_match};

/// A plate string surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text as extracted or entered
    pub text: String,
    /// Canonical key used for lookup and deduplication
    pub normalized: String,
    /// Pattern that surfaced the text; `None` for manual entry
    pub pattern: Option<PatternClass>,
    pub confidence: u8,
}
