//! Plate candidate extraction from raw OCR text

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

/// Inclusive bounds on a candidate's length once separators are removed
pub const MIN_PLATE_LEN: usize = 4;
pub const MAX_PLATE_LEN: usize = 10;

/// Glyphs the engine commonly confuses, applied in order to the whole text
const GLYPH_CORRECTIONS: [(char, char); 4] = [('|', 'I'), ('0', 'O'), ('$', 'S'), ('&', '8')];

/// Plate shape that surfaced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternClass {
    /// `AB-1234`, `ABC 123`
    LetterDigit,
    /// `12-ABC-34`
    DigitLetterDigit,
    /// `A123B`, `ABC1234`
    LetterDigitLetter,
    /// `1234ABC`
    DigitLetter,
    /// Any 4-10 character alphanumeric run
    Generic,
}

static PATTERNS: Lazy<Vec<(PatternClass, Regex)>> = Lazy::new(|| {
    [
        (PatternClass::LetterDigit, r"[A-Z]{2,3}[-\s]?\d{3,4}"),
        (
            PatternClass::DigitLetterDigit,
            r"\d{2,3}[-\s]?[A-Z]{2,3}[-\s]?\d{2,4}",
        ),
        (PatternClass::LetterDigitLetter, r"[A-Z]{1,3}\d{1,4}[A-Z]{0,3}"),
        (PatternClass::DigitLetter, r"\d{1,4}[A-Z]{1,3}\d{0,4}"),
        (PatternClass::Generic, r"[A-Z0-9]{4,10}"),
    ]
    .into_iter()
    .map(|(class, pattern)| (class, Regex::new(pattern).expect("valid plate pattern")))
    .collect()
});

/// A match of one plate pattern, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub text: String,
    pub pattern: PatternClass,
}

/// Uppercase, trim and apply the glyph-confusion map
pub fn correct_glyphs(text: &str) -> String {
    GLYPH_CORRECTIONS
        .iter()
        .fold(text.trim().to_uppercase(), |acc, (from, to)| {
            acc.replace(*from, &to.to_string())
        })
}

/// Length of `text` ignoring `-` and whitespace separators
pub fn stripped_len(text: &str) -> usize {
    text.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .count()
}

/// Extract plate-shaped strings from OCR output.
///
/// Matches are collected pattern by pattern, in position order within each
/// pattern, filtered to 4-10 characters without separators and deduplicated
/// on the exact matched text, keeping the first occurrence.
pub fn extract_candidates(raw: &str) -> Vec<RawCandidate> {
    let text = correct_glyphs(raw);

    let matches = PATTERNS.iter().flat_map(|(class, re)| {
        re.find_iter(&text).map(move |m| RawCandidate {
            text: m.as_str().to_string(),
            pattern: *class,
        })
    });

    dedup_first_seen(
        matches.filter(|c| (MIN_PLATE_LEN..=MAX_PLATE_LEN).contains(&stripped_len(&c.text))),
        |c| c.text.clone(),
    )
}

/// Keep the first item for every key, preserving input order
pub fn dedup_first_seen<T, K, I, F>(items: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(raw: &str) -> Vec<String> {
        extract_candidates(raw).into_iter().map(|c| c.text).collect()
    }

    #[test]
    fn test_all_patterns_compile_in_priority_order() {
        let classes: Vec<PatternClass> = PATTERNS.iter().map(|(class, _)| *class).collect();
        assert_eq!(
            classes,
            vec![
                PatternClass::LetterDigit,
                PatternClass::DigitLetterDigit,
                PatternClass::LetterDigitLetter,
                PatternClass::DigitLetter,
                PatternClass::Generic,
            ]
        );
    }

    #[test]
    fn test_glyph_corrections_in_order() {
        assert_eq!(correct_glyphs("  ab$1234 | x&0 "), "ABS1234 I X8O");
    }

    #[test]
    fn test_simple_plate() {
        let candidates = extract_candidates("ABC1234");
        assert_eq!(
            candidates,
            vec![RawCandidate {
                text: "ABC1234".to_string(),
                pattern: PatternClass::LetterDigit
            }]
        );
    }

    #[test]
    fn test_matches_ordered_by_pattern_then_position() {
        assert_eq!(
            texts("AB1234 CD-5678"),
            vec!["AB1234", "CD-5678", "234 CD-5678", "5678"]
        );
    }

    #[test]
    fn test_ampersand_is_read_as_eight() {
        // Corrected text is "AB81234 I AB81234"
        let candidates = extract_candidates("AB&1234 | AB&1234");
        let generic: Vec<&RawCandidate> = candidates
            .iter()
            .filter(|c| c.text == "AB81234")
            .collect();

        assert_eq!(texts("AB&1234 | AB&1234"), vec!["AB8123", "AB81234"]);
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].pattern, PatternClass::Generic);
    }

    #[test]
    fn test_dollar_is_read_as_s() {
        assert_eq!(texts("AB$1234 | AB$1234"), vec!["ABS1234"]);
    }

    #[test]
    fn test_zero_becomes_letter_o() {
        assert_eq!(
            texts("KA01AB1234"),
            vec!["AB1234", "KAO1AB", "1AB1234", "KAO1AB1234"]
        );
    }

    #[test]
    fn test_length_boundaries() {
        // 3 characters never surface
        assert!(texts("AB1").is_empty());
        // 4 and 10 are inclusive
        assert_eq!(texts("AB12"), vec!["AB12"]);
        assert_eq!(texts("ABC1234XYZ"), vec!["ABC1234", "ABC1234XYZ", "1234XYZ"]);
        // An 11 character run is cut at 10 by the generic pattern
        assert_eq!(texts("ABCDEFGHIJK"), vec!["ABCDEFGHIJ"]);
    }

    #[test]
    fn test_no_output_exceeds_length_bounds() {
        let raw = "ABCDEFGHIJKLMNOP 12345678901234 A1 X-99 QQ 1234567 ABC-123-456";
        for candidate in extract_candidates(raw) {
            let len = stripped_len(&candidate.text);
            assert!(
                (MIN_PLATE_LEN..=MAX_PLATE_LEN).contains(&len),
                "{:?} has stripped length {}",
                candidate.text,
                len
            );
        }
    }

    #[test]
    fn test_separators_kept_in_candidate_text() {
        assert_eq!(texts("abc-1234"), vec!["ABC-1234", "1234"]);
        assert_eq!(texts("ABC 123"), vec!["ABC 123"]);
    }

    #[test]
    fn test_surrounding_words() {
        assert_eq!(texts("PLATE: 7ABC123"), vec!["ABC123", "7ABC123", "PLATE"]);
        assert_eq!(texts("hello world"), vec!["HELLO", "WORLD"]);
    }

    #[test]
    fn test_empty_and_noise_input() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t ").is_empty());
        assert!(texts("A1 .. ,,").is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let raw = "ABC 1234\nXY-9876 12-ABC-34 |O$&";
        let first = extract_candidates(raw);
        for _ in 0..5 {
            assert_eq!(extract_candidates(raw), first);
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let items = vec!["AB1234", "AB1234", "CD-5678"];
        assert_eq!(dedup_first_seen(items, |s| s.to_string()), vec!["AB1234", "CD-5678"]);
    }

    #[test]
    fn test_dedup_is_exact_before_normalization() {
        let items = vec!["CD-5678", "CD5678", "CD-5678"];
        assert_eq!(dedup_first_seen(items, |s| s.to_string()), vec!["CD-5678", "CD5678"]);
    }
}
