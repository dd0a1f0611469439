/// Canonical comparison key for a plate: ASCII letters and digits only,
/// uppercased. Lossy: `ABC-1234`, `abc 1234` and `ABC1234` share a key.
pub fn normalize_plate(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether two plate strings refer to the same plate
pub fn plates_match(a: &str, b: &str) -> bool {
    normalize_plate(a) == normalize_plate(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_and_case_variants_share_a_key() {
        assert_eq!(normalize_plate("ABC-1234"), "ABC1234");
        assert_eq!(normalize_plate("abc1234"), "ABC1234");
        assert_eq!(normalize_plate("ABC 1234"), "ABC1234");
        assert!(plates_match("ab-12 cd", "AB12CD"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "",
            "ABC-1234",
            "  x.y_z 9 ",
            "Ünïcödé-42",
            "---",
            "日本 123",
            "\tKA 01\nAB 1234",
        ];
        for input in inputs {
            let once = normalize_plate(input);
            assert_eq!(normalize_plate(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_strips_non_ascii_alphanumerics() {
        assert_eq!(normalize_plate("Ünïcödé-42"), "NCD42");
        assert_eq!(normalize_plate("日本 123"), "123");
    }

    #[test]
    fn test_separator_only_input_is_empty() {
        assert_eq!(normalize_plate(" - . "), "");
    }
}
