//! The normalized property record produced by the extraction pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Address used when no strategy could resolve one.
pub const PLACEHOLDER_ADDRESS: &str = "Address pending manual entry";

/// How complete a returned record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Address plus price, bedrooms, bathrooms and square footage were found.
    Complete,
    /// A real address was found but some core fields are still null.
    Partial,
    /// No strategy produced an address; the placeholder is in use.
    NeedsManualCompletion,
}

/// Where a listing agent's email address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    /// Present on the listing page itself.
    Scraped,
    /// Found verbatim in a search-result snippet.
    Search,
    /// Composed by a language model from common corporate patterns.
    /// Unconfirmed.
    Guessed,
}

/// A single normalized property listing.
///
/// Every optional field serializes as `null` rather than being omitted.
/// Instances are built fresh per request and never mutated after return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    /// Never empty: falls back to [`PLACEHOLDER_ADDRESS`].
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    /// May be fractional, e.g. `2.5`.
    pub bathrooms: Option<f64>,
    pub square_feet: Option<f64>,
    pub price: Option<f64>,
    pub year_built: Option<u32>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub image_urls: Vec<String>,
    pub listing_agent_name: Option<String>,
    pub listing_agent_phone: Option<String>,
    pub listing_agent_email: Option<String>,
    pub listing_agent_email_source: Option<EmailSource>,
    pub listing_agent_company: Option<String>,
    pub listing_agent_license_no: Option<String>,
    /// The input URL (or the canonical listing found for an address input).
    pub property_url: String,
    pub status: ExtractionStatus,
    pub extracted_at: DateTime<Utc>,
}

impl PropertyRecord {
    /// `true` when no strategy resolved an address.
    #[must_use]
    pub fn needs_manual_completion(&self) -> bool {
        self.status == ExtractionStatus::NeedsManualCompletion
    }

    /// Names of the core fields that are still null.
    #[must_use]
    pub fn missing_core_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.needs_manual_completion() {
            missing.push("address");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if self.bedrooms.is_none() {
            missing.push("bedrooms");
        }
        if self.bathrooms.is_none() {
            missing.push("bathrooms");
        }
        if self.square_feet.is_none() {
            missing.push("squareFeet");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyRecord {
        PropertyRecord {
            address: "123 Main St San Francisco CA 94117".to_string(),
            city: Some("San Francisco".to_string()),
            state: Some("CA".to_string()),
            zip: Some("94117".to_string()),
            property_type: None,
            bedrooms: None,
            bathrooms: Some(2.5),
            square_feet: None,
            price: None,
            year_built: None,
            description: None,
            features: vec![],
            image_urls: vec![],
            listing_agent_name: None,
            listing_agent_phone: None,
            listing_agent_email: None,
            listing_agent_email_source: None,
            listing_agent_company: None,
            listing_agent_license_no: None,
            property_url: "https://example.com/homedetails/x".to_string(),
            status: ExtractionStatus::Partial,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn serializes_camel_case_with_explicit_nulls() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["squareFeet"], serde_json::Value::Null);
        assert_eq!(json["listingAgentEmail"], serde_json::Value::Null);
        assert_eq!(json["propertyUrl"], "https://example.com/homedetails/x");
        assert_eq!(json["bathrooms"], 2.5);
        assert_eq!(json["status"], "partial");
        assert!(json.get("property_url").is_none());
    }

    #[test]
    fn email_source_serializes_snake_case() {
        let json = serde_json::to_value(EmailSource::Guessed).expect("serialize");
        assert_eq!(json, "guessed");
    }

    #[test]
    fn missing_core_fields_lists_null_numerics() {
        let missing = sample().missing_core_fields();
        assert_eq!(missing, vec!["price", "bedrooms", "squareFeet"]);
    }

    #[test]
    fn placeholder_record_reports_address_missing() {
        let mut record = sample();
        record.address = PLACEHOLDER_ADDRESS.to_string();
        record.status = ExtractionStatus::NeedsManualCompletion;
        assert!(record.needs_manual_completion());
        assert_eq!(record.missing_core_fields()[0], "address");
    }
}
