//! Reply normalization for the intake dialogue.
//!
//! Everything here is pure: case folding, thousands-separator stripping, and
//! substring/choice matching. Range predicates (positive, non-negative) stay
//! in the machine so each state keeps its own corrective message.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::draft::{Dependents, Education, YesNo};

/// Digits with an optional decimal point, nothing else.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d*\.?\d+$").unwrap());

/// Digits only.
static WHOLE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Substring yes/no match, case-insensitive.
///
/// "yes" is tested before "no", so a phrase containing both resolves to yes.
/// This precedence is a documented quirk of the intake contract — keep it.
pub fn yes_no(raw: &str) -> Option<YesNo> {
    let answer = raw.to_lowercase();
    if answer.contains("yes") {
        Some(YesNo::Yes)
    } else if answer.contains("no") {
        Some(YesNo::No)
    } else {
        None
    }
}

/// Substring education match, case-insensitive; "graduate" is tested first.
pub fn education(raw: &str) -> Option<Education> {
    let answer = raw.to_lowercase();
    if answer.contains("graduate") {
        Some(Education::Graduate)
    } else if answer.contains("not") {
        Some(Education::NotGraduate)
    } else {
        None
    }
}

/// Exact dependents bucket match.
pub fn dependents(raw: &str) -> Option<Dependents> {
    match raw {
        "0" => Some(Dependents::Zero),
        "1" => Some(Dependents::One),
        "2" => Some(Dependents::Two),
        "3+" => Some(Dependents::ThreePlus),
        _ => None,
    }
}

/// Case-insensitive membership in a closed option set.
pub fn is_choice(raw: &str, options: &[&str]) -> bool {
    options.iter().any(|o| o.eq_ignore_ascii_case(raw))
}

/// Parse a monetary amount, stripping thousands separators first.
///
/// `"1,50,000"` normalizes to `150000`. Returns `None` if the cleaned text is
/// not digits with an optional decimal point, so signs, letters, and empty
/// input never reach the range predicate.
pub fn amount(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    if !AMOUNT_RE.is_match(&cleaned) {
        return None;
    }
    // The format allows a bare leading dot (".5"); give the parser the zero.
    let normalized = if cleaned.starts_with('.') {
        format!("0{cleaned}")
    } else {
        cleaned
    };
    Decimal::from_str(&normalized).ok()
}

/// Parse a whole number (no separators, no decimal point).
pub fn whole_number(raw: &str) -> Option<u32> {
    if !WHOLE_NUMBER_RE.is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

/// At least two whitespace-separated tokens.
pub fn is_full_name(raw: &str) -> bool {
    raw.split_whitespace().count() >= 2
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn yes_no_substring_match() {
        assert_eq!(yes_no("Yes"), Some(YesNo::Yes));
        assert_eq!(yes_no("no thanks"), Some(YesNo::No));
        assert_eq!(yes_no("YES please"), Some(YesNo::Yes));
        assert_eq!(yes_no("maybe"), None);
    }

    #[test]
    fn yes_wins_when_both_present() {
        assert_eq!(yes_no("no, actually yes"), Some(YesNo::Yes));
        assert_eq!(yes_no("yes... no"), Some(YesNo::Yes));
    }

    #[test]
    fn education_substring_match() {
        assert_eq!(education("Graduate"), Some(Education::Graduate));
        assert_eq!(education("I'm not"), Some(Education::NotGraduate));
        assert_eq!(education("high school"), None);
    }

    #[test]
    fn education_prefers_graduate_when_both_present() {
        // "graduate" is tested first, exactly like the substring yes/no rule.
        assert_eq!(education("not graduate"), Some(Education::Graduate));
    }

    #[test]
    fn dependents_exact_match_only() {
        assert_eq!(dependents("0"), Some(Dependents::Zero));
        assert_eq!(dependents("3+"), Some(Dependents::ThreePlus));
        assert_eq!(dependents("3"), None);
        assert_eq!(dependents("two"), None);
    }

    #[test]
    fn choice_is_case_insensitive() {
        let areas = ["Urban", "Semiurban", "Rural"];
        assert!(is_choice("urban", &areas));
        assert!(is_choice("SEMIURBAN", &areas));
        assert!(!is_choice("suburban", &areas));
    }

    #[test]
    fn amount_strips_thousands_separators() {
        assert_eq!(amount("1,50,000"), Some(dec!(150000)));
        assert_eq!(amount("55000"), Some(dec!(55000)));
        assert_eq!(amount("1234.56"), Some(dec!(1234.56)));
        assert_eq!(amount(".5"), Some(dec!(0.5)));
    }

    #[test]
    fn amount_rejects_non_numeric() {
        assert_eq!(amount("lots"), None);
        assert_eq!(amount("12k"), None);
        assert_eq!(amount("-500"), None);
        assert_eq!(amount("1.2.3"), None);
        assert_eq!(amount(""), None);
    }

    #[test]
    fn whole_number_rejects_decimals_and_text() {
        assert_eq!(whole_number("360"), Some(360));
        assert_eq!(whole_number("360.5"), None);
        assert_eq!(whole_number("1,200"), None);
        assert_eq!(whole_number("one year"), None);
    }

    #[test]
    fn full_name_needs_two_tokens() {
        assert!(is_full_name("Jane Doe"));
        assert!(is_full_name("Jane  van  Doe"));
        assert!(!is_full_name("Jane"));
        assert!(!is_full_name(""));
    }
}
