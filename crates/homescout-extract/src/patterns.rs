//! Tolerant text patterns shared by the page regex pass, search snippet
//! parsing and agent contact lookup.

use std::sync::LazyLock;

use regex::Regex;

use crate::partial::{PartialRecord, RawValue};

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d{4,}(?:\.\d{1,2})?)").expect("valid regex")
});

static BEDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:-\s*)?(?:bed(?:room)?s?|bds?|br)\b").expect("valid regex")
});

static BATHS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?:\.\d{1,2})?(?:[\s-]\d/\d)?)\s*(?:-\s*)?(?:bath(?:room)?s?|ba)\b")
        .expect("valid regex")
});

static SQFT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d{3,6})\s*(?:sq\.?\s*ft\.?|sqft|square\s+f(?:ee|oo)t)")
        .expect("valid regex")
});

static YEAR_BUILT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:built\s+in|year\s+built:?)\s*(\d{4})\b").expect("valid regex")
});

static LISTED_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:listed\s+by|listing\s+agent):?\s*([A-Z][a-zA-Z'.\-]*(?:\s+[A-Z][a-zA-Z'.\-]*){1,3})")
        .expect("valid regex")
});

static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:brokered\s+by|listing\s+courtesy\s+of|courtesy\s+of):?\s*([A-Z][\w&'./-]*(?:\s+[A-Z&][\w&'./-]*){0,5})",
    )
    .expect("valid regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\b(\d{3})\)?[\s.-]?(\d{3})[\s.-](\d{4})\b").expect("valid regex")
});

static LICENSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:DRE|lic(?:ense)?\.?)\s*(?:#|no\.?|number)?\s*:?\s*#?\s*([A-Z0-9][A-Z0-9-]{4,})")
        .expect("valid regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

static EMAIL_EXACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});

/// Trailing words that belong to a brokerage, not a person.
const NAME_STOP_WORDS: [&str; 14] = [
    "realty", "real", "estate", "group", "properties", "homes", "inc", "llc", "brokerage",
    "team", "of", "with", "at", "dre",
];

/// Recover numeric fields from free text with the regex pass.
///
/// Values are returned as raw text so the normalizer applies the same rules
/// it applies to every other source.
#[must_use]
pub fn numeric_fields_from_text(text: &str) -> PartialRecord {
    let first = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| RawValue::text(m.as_str()))
    };
    PartialRecord {
        price: first(&PRICE_RE),
        bedrooms: first(&BEDS_RE),
        bathrooms: first(&BATHS_RE),
        square_feet: first(&SQFT_RE),
        year_built: first(&YEAR_BUILT_RE),
        ..PartialRecord::default()
    }
}

/// Agent name following a "listed by" phrase, trimmed to the person's name.
#[must_use]
pub fn listed_by_name(text: &str) -> Option<String> {
    let raw = LISTED_BY_RE.captures(text)?.get(1)?.as_str();
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    // a sentence ends the name; single-letter initials like "Q." do not
    if let Some(end) = words.iter().position(|w| w.len() > 2 && w.ends_with('.')) {
        words.truncate(end + 1);
    }
    let mut words: Vec<&str> = words.into_iter().map(|w| w.trim_end_matches('.')).collect();
    if let Some(stop) = words
        .iter()
        .position(|w| is_name_stop_word(w))
    {
        words.truncate(stop);
    }
    // "Jane Doe DRE" style trailing acronyms
    while words
        .last()
        .is_some_and(|w| w.len() > 1 && w.chars().all(|c| c.is_ascii_uppercase()))
    {
        words.pop();
    }
    (words.len() >= 2).then(|| words.join(" "))
}

fn is_name_stop_word(word: &str) -> bool {
    let lowered = word.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase();
    NAME_STOP_WORDS.contains(&lowered.as_str())
}

#[must_use]
pub fn company(text: &str) -> Option<String> {
    COMPANY_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
}

/// First US-style phone number, formatted `(NNN) NNN-NNNN`.
#[must_use]
pub fn phone(text: &str) -> Option<String> {
    let caps = PHONE_RE.captures(text)?;
    Some(format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]))
}

#[must_use]
pub fn license_number(text: &str) -> Option<String> {
    LICENSE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Every email-shaped token in `text`, in order of appearance.
pub fn emails(text: &str) -> impl Iterator<Item = &str> {
    EMAIL_RE.find_iter(text).map(|m| m.as_str())
}

/// `true` when the whole string is a plausibly shaped email address.
#[must_use]
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_EXACT_RE.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_pass_reads_snippet() {
        let record =
            numeric_fields_from_text("3 bed, 2.5 bath, 1,950 sq ft home listed at $899,000");
        assert_eq!(record.bedrooms, Some(RawValue::text("3")));
        assert_eq!(record.bathrooms, Some(RawValue::text("2.5")));
        assert_eq!(record.square_feet, Some(RawValue::text("1,950")));
        assert_eq!(record.price, Some(RawValue::text("899,000")));
        assert!(record.year_built.is_none());
    }

    #[test]
    fn numeric_pass_reads_abbreviations_and_year() {
        let record = numeric_fields_from_text("4 bds | 3 ba | 2,400 sqft. Built in 1987.");
        assert_eq!(record.bedrooms, Some(RawValue::text("4")));
        assert_eq!(record.bathrooms, Some(RawValue::text("3")));
        assert_eq!(record.square_feet, Some(RawValue::text("2,400")));
        assert_eq!(record.year_built, Some(RawValue::text("1987")));
    }

    #[test]
    fn fractional_bath_text_is_captured_whole() {
        let record = numeric_fields_from_text("2 1/2 baths");
        assert_eq!(record.bathrooms, Some(RawValue::text("2 1/2")));
    }

    #[test]
    fn small_dollar_amounts_are_not_prices() {
        let record = numeric_fields_from_text("HOA $45 per month");
        assert!(record.price.is_none());
    }

    #[test]
    fn listed_by_trims_to_person_name() {
        assert_eq!(
            listed_by_name("Listed by: Jane Q Doe, Acme Realty").as_deref(),
            Some("Jane Q Doe")
        );
        assert_eq!(
            listed_by_name("Listed by Jane Doe Realty One Group").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            listed_by_name("listed by John Smith DRE #01234567").as_deref(),
            Some("John Smith")
        );
        assert_eq!(
            listed_by_name("Listed by Jane Doe. Contact the office").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(listed_by_name("Listed by owner"), None);
    }

    #[test]
    fn phone_is_formatted() {
        assert_eq!(
            phone("Call 415.555.1234 today").as_deref(),
            Some("(415) 555-1234")
        );
        assert_eq!(phone("(212) 555-0000").as_deref(), Some("(212) 555-0000"));
    }

    #[test]
    fn license_and_company() {
        assert_eq!(
            license_number("Jane Doe, DRE #01234567").as_deref(),
            Some("01234567")
        );
        assert_eq!(
            company("Listing courtesy of Golden Gate Realty.").as_deref(),
            Some("Golden Gate Realty")
        );
    }

    #[test]
    fn email_helpers() {
        let found: Vec<&str> = emails("reach jane.doe@acme-realty.com or info@acme.com").collect();
        assert_eq!(found, vec!["jane.doe@acme-realty.com", "info@acme.com"]);
        assert!(is_valid_email("jane.doe@acme.com"));
        assert!(!is_valid_email("jane.doe@acme"));
        assert!(!is_valid_email("jane doe@acme.com"));
    }
}
