//! Name handling utility
//!
//! Drug and effect names arrive from hand-assembled JSON and CSV exports, so
//! the same name can show up as "Ibuprofen", "ibuprofen " or "IBUPROFEN".
//! Lookups go through [`normalize_name`]; display keeps the source spelling.

/// Lookup key for a drug or effect name: trimmed and lowercased.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Title-case a name the way the upstream CSV exports do
///
/// Each run of letters starts with an uppercase letter and continues in
/// lowercase; every other character resets the run. "dry mouth" becomes
/// "Dry Mouth", "anti-inflammatory" becomes "Anti-Inflammatory".
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;

    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Ibuprofen "), "ibuprofen");
        assert_eq!(normalize_name("DRY MOUTH"), "dry mouth");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_title_case_words() {
        assert_eq!(title_case("dry mouth"), "Dry Mouth");
        assert_eq!(title_case("HEADACHE"), "Headache");
        assert_eq!(title_case("anti-inflammatory"), "Anti-Inflammatory");
    }

    #[test]
    fn test_title_case_digits_reset_words() {
        // Digits are not letters, so the letter after them starts a new run
        assert_eq!(title_case("vitamin b12x"), "Vitamin B12X");
    }
}
