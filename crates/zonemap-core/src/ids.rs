//! Zone identifier normalization.
//!
//! Spreadsheet exports and polygon layers rarely agree on how a zone id is written: `"7"`,
//! `"007"`, `"7.0"`, `" 7\u{feff}"` all name the same zone. [`candidate_variants`] expands a raw
//! identifier into every form worth probing, and [`canonical_key`] picks the one form that is
//! stored as a registry key.
//!
//! Registry keys keep leading zeros as written; zero-padding tolerance lives entirely in the
//! candidate sets.

use indexmap::IndexSet;
use std::collections::VecDeque;

/// Returns `true` for characters that never carry meaning in an identifier or header cell:
/// C0/C1 controls, zero-width spaces/joiners, soft hyphens, word joiners and the byte-order mark.
pub fn is_invisible(ch: char) -> bool {
    matches!(ch,
        '\u{0000}'..='\u{0008}'
        | '\u{000B}'..='\u{000C}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}'
        | '\u{00AD}'
        | '\u{200B}'..='\u{200F}'
        | '\u{2060}'..='\u{2064}'
        | '\u{FEFF}'
    )
}

/// Removes invisible characters anywhere in `raw`, then trims surrounding whitespace.
pub fn clean_identifier(raw: &str) -> String {
    let without: String = raw.chars().filter(|&ch| !is_invisible(ch)).collect();
    without.trim().to_string()
}

/// The form an identifier is stored under in a registry, or `None` when nothing is left after
/// cleaning.
///
/// Leading zeros are preserved; a trailing `.0` (spreadsheet numeric export) is not.
pub fn canonical_key(raw: &str) -> Option<String> {
    let cleaned = clean_identifier(raw);
    let key = strip_trailing_decimal_zero(&cleaned);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Expands a raw identifier into the ordered set of forms tried when matching.
///
/// The set is the closure of the one-step rule below, starting from the cleaned input:
/// - the value itself
/// - the value with trailing `.0` groups stripped
/// - the digits of that stripped value, concatenated
/// - those digits read as an integer (leading zeros dropped), plus the integer padded to 2 and 3
///   digits
/// - the value and its stripped form with leading zeros removed
///
/// Because the set is closed under the rule, expanding any member yields a subset of it.
/// Empty and whitespace-only input yields an empty set.
pub fn candidate_variants(raw: Option<&str>) -> IndexSet<String> {
    let mut out = IndexSet::new();
    let Some(raw) = raw else {
        return out;
    };
    let start = clean_identifier(raw);
    if start.is_empty() {
        return out;
    }

    let mut queue = VecDeque::new();
    out.insert(start.clone());
    queue.push_back(start);
    while let Some(value) = queue.pop_front() {
        for variant in one_step_variants(&value) {
            if out.insert(variant.clone()) {
                queue.push_back(variant);
            }
        }
    }
    out
}

/// Loose comparison form: lowercase, no whitespace, trailing `.0` stripped and leading zeros
/// removed from every digit run (`"Zona 007"` -> `"zona7"`).
pub fn loose_key(raw: &str) -> String {
    let compact: String = clean_identifier(raw)
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    let stripped = strip_trailing_decimal_zero(&compact);

    let mut out = String::with_capacity(stripped.len());
    let mut chars = stripped.chars().peekable();
    let mut in_digits = false;
    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() {
            let next_is_digit = chars.peek().is_some_and(|c| c.is_ascii_digit());
            if ch == '0' && !in_digits && next_is_digit {
                continue;
            }
            in_digits = true;
        } else {
            in_digits = false;
        }
        out.push(ch);
    }
    out
}

fn one_step_variants(value: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(8);
    let stripped = strip_trailing_decimal_zero(value);
    out.push(stripped.to_string());

    let digits: String = stripped.chars().filter(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        let integer = integer_form(&digits);
        out.push(format!("{integer:0>2}"));
        out.push(format!("{integer:0>3}"));
        out.push(integer);
        out.push(digits);
    }

    out.push(strip_leading_zeros(value).to_string());
    out.push(strip_leading_zeros(stripped).to_string());
    out.into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn strip_trailing_decimal_zero(value: &str) -> &str {
    let mut out = value;
    while let Some(rest) = out.strip_suffix(".0") {
        out = rest;
    }
    out
}

fn integer_form(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

// A zero is only dropped when another digit follows it, so "0", "0.5" and "0A" survive intact.
fn strip_leading_zeros(value: &str) -> &str {
    let mut out = value;
    loop {
        let mut chars = out.chars();
        match (chars.next(), chars.next()) {
            (Some('0'), Some(next)) if next.is_ascii_digit() => out = &out[1..],
            _ => return out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants(raw: &str) -> Vec<String> {
        candidate_variants(Some(raw)).into_iter().collect()
    }

    #[test]
    fn plain_number_expands_to_padded_forms() {
        assert_eq!(variants("7"), vec!["7", "07", "007"]);
    }

    #[test]
    fn padded_number_keeps_original_first() {
        let v = variants("007");
        assert_eq!(v.first().map(String::as_str), Some("007"));
        for expected in ["7", "07", "007"] {
            assert!(v.iter().any(|s| s == expected), "missing {expected} in {v:?}");
        }
    }

    #[test]
    fn trailing_decimal_zero_is_stripped_before_digit_extraction() {
        let v = variants("12.0");
        assert!(v.iter().any(|s| s == "12"));
        assert!(v.iter().any(|s| s == "012"));
        assert!(!v.iter().any(|s| s == "120"), "{v:?}");
    }

    #[test]
    fn invisible_characters_and_whitespace_are_removed() {
        assert_eq!(variants("\u{feff} 5\u{200b} ")[0], "5");
        assert_eq!(clean_identifier("\u{feff}Zona\u{200d} 3 "), "Zona 3");
    }

    #[test]
    fn empty_and_missing_input_yield_nothing() {
        assert!(candidate_variants(None).is_empty());
        assert!(candidate_variants(Some("")).is_empty());
        assert!(candidate_variants(Some("  \u{feff} ")).is_empty());
    }

    #[test]
    fn alphanumeric_ids_yield_digit_forms() {
        let v = variants("A-07");
        for expected in ["A-07", "07", "7", "007"] {
            assert!(v.iter().any(|s| s == expected), "missing {expected} in {v:?}");
        }
    }

    #[test]
    fn lone_zero_is_not_erased() {
        let v = variants("0");
        assert_eq!(v, vec!["0", "00", "000"]);
    }

    #[test]
    fn huge_digit_runs_do_not_overflow() {
        let raw = "000123456789012345678901234567890";
        let v = variants(raw);
        assert!(v.iter().any(|s| s == "123456789012345678901234567890"));
    }

    #[test]
    fn generator_is_idempotent_on_its_outputs() {
        let samples = [
            "7",
            "007",
            "1.0",
            "007.0",
            "1.0.0",
            "A-07",
            "0A.0",
            "00A0B0C7",
            "Zona 12",
            " 0042 ",
            "3.5",
            "0",
            ".0",
            "\u{feff}09",
        ];
        for raw in samples {
            let original = candidate_variants(Some(raw));
            for v in &original {
                let again = candidate_variants(Some(v));
                assert!(
                    again.is_subset(&original),
                    "variants of {v:?} (from {raw:?}) escaped the set: {again:?} vs {original:?}"
                );
            }
        }
    }

    #[test]
    fn canonical_key_preserves_leading_zeros() {
        assert_eq!(canonical_key(" 007 ").as_deref(), Some("007"));
        assert_eq!(canonical_key("7.0").as_deref(), Some("7"));
        assert_eq!(canonical_key("   "), None);
        assert_eq!(canonical_key(".0"), None);
    }

    #[test]
    fn loose_key_folds_case_space_and_zero_runs() {
        assert_eq!(loose_key("Zona 007"), "zona7");
        assert_eq!(loose_key("ZONA-7.0"), "zona-7");
        assert_eq!(loose_key("10"), "10");
        assert_eq!(loose_key("000"), "0");
        assert_eq!(loose_key("A0B"), "a0b");
    }
}
