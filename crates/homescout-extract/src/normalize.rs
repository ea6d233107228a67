//! Canonicalization of numeric listing fields.
//!
//! Every source (selectors, regexes, JSON-LD, the language model, search
//! snippets) reports numbers however it likes. [`normalize`] turns them into
//! plain numbers or nothing, and is idempotent.

use std::sync::LazyLock;

use regex::Regex;

use crate::partial::{PartialRecord, RawValue};

static MIXED_FRACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*[\s-]\s*(\d+)\s*/\s*(\d+)").expect("valid regex")
});

static BATH_HALF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)(?:\s*(?:full|baths?|ba|and|[,&+]))+\s*(\d+)\s*half")
        .expect("valid regex")
});

static BARE_FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\b").expect("valid regex"));

/// First amount in the text, with an optional magnitude word. In a range
/// like `$500,000 - $550,000` only the lower bound matches.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)*|\.\d+)(?:\s*(million|thousand|k|m)\b)?")
        .expect("valid regex")
});

/// Normalize bedrooms, bathrooms, square footage, year built and price.
///
/// Other fields pass through untouched.
#[must_use]
pub fn normalize(record: PartialRecord) -> PartialRecord {
    PartialRecord {
        bedrooms: record.bedrooms.and_then(|v| normalize_with(v, parse_integer)),
        bathrooms: record
            .bathrooms
            .and_then(|v| normalize_with(v, parse_bathrooms)),
        square_feet: record
            .square_feet
            .and_then(|v| normalize_with(v, parse_decimal)),
        price: record.price.and_then(|v| normalize_with(v, parse_price)),
        year_built: record
            .year_built
            .and_then(|v| normalize_with(v, parse_integer)),
        ..record
    }
}

fn normalize_with(value: RawValue, parse: fn(&str) -> Option<f64>) -> Option<RawValue> {
    match value {
        RawValue::Number(n) if n.is_finite() => Some(RawValue::Number(n)),
        RawValue::Number(_) => None,
        RawValue::Text(text) => parse(&text).map(RawValue::Number),
    }
}

/// Fractional bath counts: `2 1/2`, `2-1/2`, `2bath1half`, `2 full, 1 half`,
/// a bare `1/2`, else a plain decimal.
#[must_use]
pub fn parse_bathrooms(text: &str) -> Option<f64> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(caps) = MIXED_FRACTION_RE.captures(text) {
        let whole: f64 = caps[1].parse().ok()?;
        let numerator: f64 = caps[2].parse().ok()?;
        let denominator: f64 = caps[3].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(whole + numerator / denominator);
    }

    if let Some(caps) = BATH_HALF_RE.captures(text) {
        let whole: f64 = caps[1].parse().ok()?;
        let halves: f64 = caps[2].parse().ok()?;
        return Some(whole + halves * 0.5);
    }

    if let Some(caps) = BARE_FRACTION_RE.captures(text) {
        let numerator: f64 = caps[1].parse().ok()?;
        let denominator: f64 = caps[2].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    parse_decimal(text)
}

/// The first amount in `text`, ignoring currency symbols, thousands
/// separators and unit words. Ranges yield their lower bound.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<f64> {
    first_amount(text).map(|(amount, _)| amount)
}

/// Like [`parse_decimal`], also applying a `k`, `M`, `thousand` or
/// `million` magnitude: `$1.2M` is 1,200,000.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let (amount, magnitude) = first_amount(text)?;
    let scaled = match magnitude.as_deref() {
        Some("k" | "thousand") => amount * 1_000.0,
        Some("m" | "million") => amount * 1_000_000.0,
        _ => amount,
    };
    scaled.is_finite().then_some(scaled)
}

/// Integer fields: the first amount, truncated.
///
/// Plain decimal text such as `"3.0"` is read as a number first so the
/// fractional digits are not glued onto the integer part.
#[must_use]
pub fn parse_integer(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return n.is_finite().then(|| n.trunc());
    }
    parse_decimal(trimmed).map(f64::trunc)
}

fn first_amount(text: &str) -> Option<(f64, Option<String>)> {
    let caps = AMOUNT_RE.captures(text)?;
    let digits = caps[1].replace(',', "");
    let amount = digits.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let magnitude = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    Some((amount, magnitude))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
