//! schema.org JSON-LD pass.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::partial::{PartialRecord, RawValue};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const LISTING_TYPES: [&str; 9] = [
    "SingleFamilyResidence",
    "House",
    "Apartment",
    "Residence",
    "RealEstateListing",
    "Product",
    "Offer",
    "Accommodation",
    "Place",
];

/// Square metres to square feet.
const SQM_TO_SQFT: f64 = 10.763_910_4;

/// Listing fields from every `<script type="application/ld+json">` block,
/// merged in document order.
pub(crate) fn extract_jsonld(html: &str) -> PartialRecord {
    let mut merged = PartialRecord::default();

    for cap in SCRIPT_RE.captures_iter(html) {
        let Some(json_text) = cap.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let value: Value = match serde_json::from_str(json_text.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        let mut candidates: Vec<&Value> = match &value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        let graph: Vec<&Value> = candidates
            .iter()
            .filter_map(|item| item.get("@graph").and_then(Value::as_array))
            .flatten()
            .collect();
        candidates.extend(graph);

        for item in candidates {
            if is_listing_type(item) {
                merged.fill_missing_from(item_to_partial(item));
            }
        }
    }

    merged
}

fn is_listing_type(item: &Value) -> bool {
    let Some(type_node) = item.get("@type") else {
        return false;
    };
    let matches = |s: &str| LISTING_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t));
    match type_node {
        Value::String(s) => matches(s),
        Value::Array(arr) => arr.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// One item plus the entities listings commonly nest their data under.
fn item_to_partial(item: &Value) -> PartialRecord {
    let mut record = direct_fields(item);
    for nested in ["mainEntity", "about", "itemOffered"] {
        if let Some(inner) = item.get(nested).filter(|v| v.is_object()) {
            record.fill_missing_from(direct_fields(inner));
        }
    }
    record
}

fn direct_fields(item: &Value) -> PartialRecord {
    let mut record = PartialRecord::default();

    match item.get("address") {
        Some(Value::String(s)) => record.address = Some(s.clone()),
        Some(address @ Value::Object(_)) => {
            let street = text_of(address.get("streetAddress"));
            record.city = text_of(address.get("addressLocality"));
            record.state = text_of(address.get("addressRegion"));
            record.zip = text_of(address.get("postalCode"));
            let parts: Vec<&str> = [&street, &record.city]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect();
            if street.is_some() {
                let mut full = parts.join(", ");
                let tail: Vec<&str> = [&record.state, &record.zip]
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                if !tail.is_empty() {
                    full.push_str(", ");
                    full.push_str(&tail.join(" "));
                }
                record.address = Some(full);
            }
        }
        _ => {}
    }

    // numberOfRooms counts every room, not bedrooms.
    record.bedrooms = raw_of(item.get("numberOfBedrooms"));
    record.bathrooms = raw_of(item.get("numberOfBathroomsTotal"))
        .or_else(|| raw_of(item.get("numberOfFullBathrooms")));
    record.square_feet = floor_size(item.get("floorSize"));
    record.year_built = raw_of(item.get("yearBuilt"));
    record.price = raw_of(item.get("price")).or_else(|| offer_price(item.get("offers")));
    record.description = text_of(item.get("description"));
    record.property_type = text_of(item.get("accommodationCategory"));
    record.image_urls = images(item.get("image"));
    record
}

fn text_of(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers stay numbers; strings are left for the normalizer.
fn raw_of(v: Option<&Value>) -> Option<RawValue> {
    match v? {
        Value::Number(n) => n.as_f64().map(RawValue::Number),
        Value::String(s) if !s.trim().is_empty() => Some(RawValue::text(s.trim())),
        // QuantitativeValue
        obj @ Value::Object(_) => raw_of(obj.get("value")),
        _ => None,
    }
}

fn offer_price(offers: Option<&Value>) -> Option<RawValue> {
    match offers? {
        Value::Array(items) => items.iter().find_map(|o| raw_of(o.get("price"))),
        obj @ Value::Object(_) => raw_of(obj.get("price")),
        _ => None,
    }
}

/// `floorSize` as a `QuantitativeValue`, converting square metres
/// (`unitCode` `MTK`) to square feet.
fn floor_size(v: Option<&Value>) -> Option<RawValue> {
    let node = v?;
    let raw = raw_of(Some(node))?;
    let unit = node
        .get("unitCode")
        .or_else(|| node.get("unitText"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_uppercase();
    if unit == "MTK" || unit.contains("M2") || unit.contains("SQM") {
        let metres = match &raw {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(t) => crate::normalize::parse_decimal(t),
        }?;
        return Some(RawValue::Number((metres * SQM_TO_SQFT).round()));
    }
    Some(raw)
}

fn images(v: Option<&Value>) -> Vec<String> {
    let url_of = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => text_of(v.get("url").or_else(|| v.get("contentUrl"))),
        _ => None,
    };
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(url_of).collect(),
        Some(other) => url_of(other).into_iter().collect(),
        None => Vec::new(),
    }
}
