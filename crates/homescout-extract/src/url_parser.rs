//! Heuristic address recovery from listing URLs and free-text addresses.
//!
//! Everything here is pure string work: no network, no allocation beyond the
//! returned parts. It is the last strategy in the chain and must always be
//! able to run.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Address parts recovered from a URL path or a free-text address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UrlAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    /// All present parts joined with single spaces.
    pub address: String,
}

impl UrlAddress {
    fn from_parts(
        street: Option<String>,
        city: Option<String>,
        state: Option<String>,
        zip: Option<String>,
    ) -> Option<Self> {
        let address = [&street, &city, &state, &zip]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if address.is_empty() {
            return None;
        }
        Some(Self {
            street,
            city,
            state,
            zip,
            address,
        })
    }
}

const US_STATES: [&str; 56] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY", "PR", "VI", "GU", "AS", "MP",
];

const STREET_SUFFIXES: [&str; 44] = [
    "st", "street", "ave", "avenue", "rd", "road", "blvd", "boulevard", "dr", "drive", "ln",
    "lane", "ct", "court", "way", "pl", "place", "ter", "terrace", "cir", "circle", "pkwy",
    "parkway", "hwy", "highway", "trl", "trail", "sq", "square", "aly", "alley", "loop", "row",
    "xing", "path", "pike", "run", "walk", "cv", "cove", "pt", "point", "plz", "plaza",
];

const UNIT_MARKERS: [&str; 6] = ["apt", "unit", "ste", "suite", "fl", "bldg"];

static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("valid regex"));

static STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<head>.*?)[\s,]*\b(?P<state>[a-z]{2})\s+(?P<zip>\d{5})(?:-\d{4})?$")
        .expect("valid regex")
});

#[must_use]
pub fn is_us_state(token: &str) -> bool {
    US_STATES.iter().any(|s| s.eq_ignore_ascii_case(token))
}

fn is_zip(token: &str) -> bool {
    ZIP_RE.is_match(token)
}

/// Parse a listing URL's path into address parts.
///
/// Recognizes Zillow `homedetails`, Realtor.com `realestateandhomes-detail`
/// and Redfin `/<ST>/<City>/<Street>-<ZIP>/home/<id>` shapes, then falls
/// back to any hyphenated segment that ends in `<ST>-<ZIP>`.
#[must_use]
pub fn parse_listing_url(url: &Url) -> Option<UrlAddress> {
    let segments: Vec<String> = url
        .path_segments()
        .map(|segs| {
            segs.filter(|s| !s.is_empty())
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    if segments.is_empty() {
        return None;
    }

    let lowered: Vec<String> = segments.iter().map(|s| s.to_ascii_lowercase()).collect();

    if let Some(idx) = lowered.iter().position(|s| s == "homedetails") {
        if let Some(found) = segments.get(idx + 1).and_then(|s| parse_hyphen_slug(s)) {
            return Some(found);
        }
    }

    if let Some(idx) = lowered
        .iter()
        .position(|s| s == "realestateandhomes-detail")
    {
        if let Some(found) = segments.get(idx + 1).and_then(|s| parse_realtor_slug(s)) {
            return Some(found);
        }
    }

    if let Some(idx) = lowered.iter().position(|s| s == "home") {
        if let Some(found) = parse_redfin_segments(&segments[..idx]) {
            return Some(found);
        }
    }

    segments.iter().rev().find_map(|s| parse_hyphen_slug(s))
}

/// Convenience wrapper for callers holding a raw string.
#[must_use]
pub fn parse_listing_url_str(raw: &str) -> Option<UrlAddress> {
    Url::parse(raw).ok().as_ref().and_then(parse_listing_url)
}

/// `123-Main-St-San-Francisco-CA-94117`
fn parse_hyphen_slug(slug: &str) -> Option<UrlAddress> {
    let tokens: Vec<&str> = slug.split('-').filter(|t| !t.is_empty()).collect();
    split_street_city_tokens(&tokens)
}

/// `123-Main-St_San-Francisco_CA_94117_M12345-67890`
fn parse_realtor_slug(slug: &str) -> Option<UrlAddress> {
    let parts: Vec<&str> = slug.split('_').collect();
    if parts.len() < 4 {
        return None;
    }
    let state = parts[2];
    let zip = parts[3];
    if !is_us_state(state) || !is_zip(zip) {
        return None;
    }
    UrlAddress::from_parts(
        non_empty(parts[0].replace('-', " ")),
        non_empty(parts[1].replace('-', " ")),
        Some(state.to_ascii_uppercase()),
        Some(zip.to_string()),
    )
}

/// Segments preceding `home`: `[.., ST, City, Street-ZIP]`.
fn parse_redfin_segments(segments: &[String]) -> Option<UrlAddress> {
    if segments.len() < 3 {
        return None;
    }
    let tail = &segments[segments.len() - 3..];
    let state = tail[0].as_str();
    if !is_us_state(state) {
        return None;
    }
    let city = non_empty(tail[1].replace('-', " "));
    let (street, zip) = match tail[2].rsplit_once('-') {
        Some((street, zip)) if is_zip(zip) => (street.replace('-', " "), Some(zip.to_string())),
        _ => (tail[2].replace('-', " "), None),
    };
    UrlAddress::from_parts(
        non_empty(street),
        city,
        Some(state.to_ascii_uppercase()),
        zip,
    )
}

/// Split `[street.., city.., ST, ZIP]` tokens.
///
/// The city is whatever sits between the first street suffix (or unit
/// designator following it) and the state code, so suffix-like city words
/// such as `Point` stay with the city. Without a suffix the whole head is kept
/// as street.
fn split_street_city_tokens(tokens: &[&str]) -> Option<UrlAddress> {
    if tokens.len() < 3 {
        return None;
    }
    let zip = tokens[tokens.len() - 1];
    let state = tokens[tokens.len() - 2];
    if !is_zip(zip) || !is_us_state(state) {
        return None;
    }
    let head = &tokens[..tokens.len() - 2];

    let street_end = street_boundary(head);
    let (street, city) = match street_end {
        Some(end) if end < head.len() => (&head[..end], Some(&head[end..])),
        _ => (head, None),
    };

    UrlAddress::from_parts(
        non_empty(street.join(" ")),
        city.and_then(|c| non_empty(c.join(" "))),
        Some(state.to_ascii_uppercase()),
        Some(zip.to_string()),
    )
}

fn street_boundary(head: &[&str]) -> Option<usize> {
    // A suffix needs a name before it, and the house number is not a name.
    let house_number = head
        .first()
        .is_some_and(|t| t.chars().any(|c| c.is_ascii_digit()));
    let first_name = usize::from(house_number);
    let suffix_idx = head
        .iter()
        .enumerate()
        .skip(first_name + 1)
        .find(|(_, t)| STREET_SUFFIXES.iter().any(|s| s.eq_ignore_ascii_case(t)))
        .map(|(i, _)| i)?;
    let mut end = suffix_idx + 1;
    while let Some(token) = head.get(end) {
        if UNIT_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(token)) {
            // marker plus its number
            end = (end + 2).min(head.len());
        } else if token.starts_with('#') {
            end += 1;
        } else {
            break;
        }
    }
    Some(end)
}

/// Decompose a free-text address.
///
/// Splits on commas and reads a trailing `STATE ZIP`; the comma part before
/// it is the city. When the city shares a part with the street, the street
/// suffix heuristic used for URL slugs decides where the city starts.
#[must_use]
pub fn split_address(address: &str) -> UrlAddress {
    let trimmed = address.trim();
    let parts: Vec<&str> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let fallback = || UrlAddress {
        address: trimmed.to_string(),
        ..UrlAddress::default()
    };

    let Some(last) = parts.last() else {
        return fallback();
    };
    let Some(caps) = STATE_ZIP_RE.captures(last) else {
        return fallback();
    };
    let state = caps["state"].to_ascii_uppercase();
    if !is_us_state(&state) {
        return fallback();
    }
    let zip = caps["zip"].to_string();
    let head_in_last = caps["head"].trim();

    let mut preceding: Vec<&str> = parts[..parts.len() - 1].to_vec();
    if !head_in_last.is_empty() {
        preceding.push(head_in_last);
    }

    let (street, city) = match preceding.len() {
        0 => (None, None),
        1 => {
            let tokens: Vec<&str> = preceding[0].split_whitespace().collect();
            match street_boundary(&tokens) {
                Some(end) if end < tokens.len() => (
                    non_empty(tokens[..end].join(" ")),
                    non_empty(tokens[end..].join(" ")),
                ),
                _ => (non_empty(preceding[0].to_string()), None),
            }
        }
        n => (
            non_empty(preceding[..n - 1].join(", ")),
            non_empty(preceding[n - 1].to_string()),
        ),
    };

    UrlAddress {
        street,
        city,
        state: Some(state),
        zip: Some(zip),
        address: trimmed.to_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
