//! Per-strategy partial records and their merge into the final record.

use std::collections::HashSet;

use chrono::Utc;
use homescout_core::{EmailSource, ExtractionStatus, PropertyRecord, PLACEHOLDER_ADDRESS};
use serde::{Deserialize, Serialize};

/// A numeric field as a source reported it, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    fn is_present(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::Text(t) => !t.trim().is_empty(),
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

/// What one strategy found. Every field is optional; nothing is trusted
/// until [`crate::normalize::normalize`] and [`PartialRecord::finalize`] run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialRecord {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<RawValue>,
    pub bathrooms: Option<RawValue>,
    pub square_feet: Option<RawValue>,
    pub price: Option<RawValue>,
    pub year_built: Option<RawValue>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub image_urls: Vec<String>,
    pub listing_agent_name: Option<String>,
    pub listing_agent_phone: Option<String>,
    pub listing_agent_email: Option<String>,
    #[serde(skip)]
    pub listing_agent_email_source: Option<EmailSource>,
    pub listing_agent_company: Option<String>,
    pub listing_agent_license_no: Option<String>,
}

/// Bounds applied while finalizing.
#[derive(Debug, Clone, Copy)]
pub struct RecordLimits {
    pub max_features: usize,
    pub max_images: usize,
}

fn present_str(v: Option<&String>) -> bool {
    v.is_some_and(|s| !s.trim().is_empty())
}

fn present_raw(v: Option<&RawValue>) -> bool {
    v.is_some_and(RawValue::is_present)
}

macro_rules! fill_fields {
    ($self:ident, $other:ident, $filled:ident, $check:ident; $($field:ident => $name:literal),+ $(,)?) => {
        $(
            if !$check($self.$field.as_ref()) && $check($other.$field.as_ref()) {
                $self.$field = $other.$field.take();
                $filled.push($name);
            }
        )+
    };
}

impl PartialRecord {
    /// Fill every field that is still empty from `other`.
    ///
    /// Already-present values are never overwritten, so calling this in
    /// strategy priority order gives first-non-empty-wins precedence. Lists
    /// are taken whole. Returns the camelCase names of the fields filled.
    pub fn fill_missing_from(&mut self, mut other: PartialRecord) -> Vec<&'static str> {
        let mut filled = Vec::new();
        fill_fields!(self, other, filled, present_str;
            address => "address",
            city => "city",
            state => "state",
            zip => "zip",
            property_type => "propertyType",
            description => "description",
            listing_agent_name => "listingAgentName",
            listing_agent_phone => "listingAgentPhone",
            listing_agent_company => "listingAgentCompany",
            listing_agent_license_no => "listingAgentLicenseNo",
        );
        if !present_str(self.listing_agent_email.as_ref())
            && present_str(other.listing_agent_email.as_ref())
        {
            self.listing_agent_email = other.listing_agent_email.take();
            self.listing_agent_email_source = other
                .listing_agent_email_source
                .or(Some(EmailSource::Scraped));
            filled.push("listingAgentEmail");
        }
        fill_fields!(self, other, filled, present_raw;
            bedrooms => "bedrooms",
            bathrooms => "bathrooms",
            square_feet => "squareFeet",
            price => "price",
            year_built => "yearBuilt",
        );
        if self.features.is_empty() && !other.features.is_empty() {
            self.features = std::mem::take(&mut other.features);
            filled.push("features");
        }
        if self.image_urls.is_empty() && !other.image_urls.is_empty() {
            self.image_urls = std::mem::take(&mut other.image_urls);
            filled.push("imageUrls");
        }
        filled
    }

    /// `true` when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let mut probe = PartialRecord::default();
        probe.fill_missing_from(self.clone()).is_empty()
    }

    /// Address, price, bedrooms, bathrooms and square footage all present.
    #[must_use]
    pub fn has_core_fields(&self) -> bool {
        present_str(self.address.as_ref())
            && present_raw(self.price.as_ref())
            && present_raw(self.bedrooms.as_ref())
            && present_raw(self.bathrooms.as_ref())
            && present_raw(self.square_feet.as_ref())
    }

    #[must_use]
    pub fn has_address(&self) -> bool {
        present_str(self.address.as_ref())
    }

    /// Turn a normalized partial record into the immutable output record.
    ///
    /// Strings are trimmed (blank becomes null), lists are deduplicated and
    /// bounded, non-finite or negative numerics are dropped, and the
    /// placeholder address is used when nothing resolved one.
    #[must_use]
    pub fn finalize(self, limits: RecordLimits, property_url: String) -> PropertyRecord {
        let address = clean(self.address);
        let bedrooms = whole(self.bedrooms.as_ref());
        let bathrooms = non_negative(self.bathrooms.as_ref());
        let square_feet = non_negative(self.square_feet.as_ref());
        let price = non_negative(self.price.as_ref());
        let year_built = whole(self.year_built.as_ref());

        let status = if address.is_none() {
            ExtractionStatus::NeedsManualCompletion
        } else if bedrooms.is_some()
            && bathrooms.is_some()
            && square_feet.is_some()
            && price.is_some()
        {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::Partial
        };

        let listing_agent_email = clean(self.listing_agent_email);
        let listing_agent_email_source = listing_agent_email
            .as_ref()
            .map(|_| self.listing_agent_email_source.unwrap_or(EmailSource::Scraped));

        PropertyRecord {
            address: address.unwrap_or_else(|| PLACEHOLDER_ADDRESS.to_string()),
            city: clean(self.city),
            state: clean(self.state),
            zip: clean(self.zip),
            property_type: clean(self.property_type),
            bedrooms,
            bathrooms,
            square_feet,
            price,
            year_built,
            description: clean(self.description),
            features: dedupe_features(self.features, limits.max_features),
            image_urls: dedupe_images(self.image_urls, limits.max_images),
            listing_agent_name: clean(self.listing_agent_name),
            listing_agent_phone: clean(self.listing_agent_phone),
            listing_agent_email,
            listing_agent_email_source,
            listing_agent_company: clean(self.listing_agent_company),
            listing_agent_license_no: clean(self.listing_agent_license_no),
            property_url,
            status,
            extracted_at: Utc::now(),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
}

fn non_negative(value: Option<&RawValue>) -> Option<f64> {
    value
        .and_then(RawValue::as_number)
        .filter(|n| *n >= 0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: Option<&RawValue>) -> Option<u32> {
    non_negative(value)
        .map(f64::trunc)
        .filter(|n| *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

fn dedupe_features(features: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    features
        .into_iter()
        .filter_map(|f| clean(Some(f)))
        .filter(|f| seen.insert(f.to_lowercase()))
        .take(max)
        .collect()
}

fn dedupe_images(images: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| {
            url::Url::parse(u)
                .is_ok_and(|p| matches!(p.scheme(), "http" | "https") && p.host_str().is_some())
        })
        .filter(|u| seen.insert(u.clone()))
        .take(max)
        .collect()
}
