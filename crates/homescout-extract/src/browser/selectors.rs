//! Ordered CSS selector candidates per listing field.

use std::path::Path;

use scraper::Selector;
use serde::Deserialize;

use crate::error::StrategyError;

/// Selector candidates per field, tried in order.
///
/// Each candidate is either `"css"` (element text) or `"css@attr"` (an
/// attribute value). Fields absent from a YAML override keep their
/// built-in candidates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub address: Vec<String>,
    pub street: Vec<String>,
    pub city: Vec<String>,
    pub state: Vec<String>,
    pub zip: Vec<String>,
    pub property_type: Vec<String>,
    pub price: Vec<String>,
    pub bedrooms: Vec<String>,
    pub bathrooms: Vec<String>,
    pub square_feet: Vec<String>,
    pub year_built: Vec<String>,
    pub description: Vec<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub agent_name: Vec<String>,
    pub agent_phone: Vec<String>,
    pub agent_email: Vec<String>,
    pub agent_company: Vec<String>,
    pub agent_license: Vec<String>,
}

fn owned(candidates: &[&str]) -> Vec<String> {
    candidates.iter().map(ToString::to_string).collect()
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            address: owned(&[
                "[data-testid='home-details-summary-headline']",
                "[data-testid='address-line']",
                "h1[class*='address']",
                ".full-address",
            ]),
            street: owned(&["[itemprop='streetAddress']", ".street-address"]),
            city: owned(&["[itemprop='addressLocality']", ".locality"]),
            state: owned(&["[itemprop='addressRegion']", ".region"]),
            zip: owned(&["[itemprop='postalCode']", ".postal-code"]),
            property_type: owned(&["[data-testid='property-type']", ".property-type"]),
            price: owned(&[
                "[data-testid='price']",
                "[data-rf-test-id='abp-price'] .statsValue",
                "[itemprop='price']@content",
                "meta[property='product:price:amount']@content",
                ".list-price",
            ]),
            bedrooms: owned(&[
                "[data-testid='property-meta-beds'] span",
                "[data-rf-test-id='abp-beds'] .statsValue",
                ".beds",
            ]),
            bathrooms: owned(&[
                "[data-testid='property-meta-baths'] span",
                "[data-rf-test-id='abp-baths'] .statsValue",
                "[itemprop='numberOfBathroomsTotal']",
                ".baths",
            ]),
            square_feet: owned(&[
                "[data-testid='property-meta-sqft'] span",
                "[data-rf-test-id='abp-sqFt'] .statsValue",
                "[itemprop='floorSize']",
                ".sqft",
            ]),
            year_built: owned(&["[data-testid='year-built']", ".year-built"]),
            description: owned(&[
                "[data-testid='description']",
                "#marketing-remarks-scroll",
                "[itemprop='description']",
                "meta[property='og:description']@content",
                "meta[name='description']@content",
            ]),
            features: owned(&[
                "[data-testid='amenities'] li",
                ".amenities li",
                ".features li",
                "ul.feature-list li",
            ]),
            images: owned(&[
                "[data-testid='media-stream'] img@src",
                ".gallery img@src",
                "img.photo@src",
                "meta[property='og:image']@content",
            ]),
            agent_name: owned(&[
                "[data-testid='listing-agent-name']",
                "[data-testid='attribution-LISTING_AGENT'] span",
                "[itemprop='agent'] [itemprop='name']",
                ".agent-name",
            ]),
            agent_phone: owned(&[
                "[data-testid='listing-agent-phone']",
                ".agent-phone",
                "a[href^='tel:']@href",
            ]),
            agent_email: owned(&[".agent-email", "a[href^='mailto:']@href"]),
            agent_company: owned(&[
                "[data-testid='attribution-BROKER'] span",
                ".broker-name",
                ".agent-company",
            ]),
            agent_license: owned(&["[data-testid='agent-license']", ".agent-license"]),
        }
    }
}

impl SelectorSet {
    /// Parse a YAML override. Fields not mentioned keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Selectors`] for malformed YAML or any
    /// candidate that is not a valid CSS selector.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StrategyError> {
        let set: Self = serde_yaml::from_str(yaml)
            .map_err(|e| StrategyError::Selectors(format!("invalid selector YAML: {e}")))?;
        set.compile()?;
        Ok(set)
    }

    /// # Errors
    ///
    /// Returns [`StrategyError::Selectors`] if the file cannot be read or
    /// does not parse.
    pub fn from_yaml_file(path: &Path) -> Result<Self, StrategyError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            StrategyError::Selectors(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Parse every candidate.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Selectors`] naming the first bad candidate.
    pub fn compile(&self) -> Result<CompiledSelectors, StrategyError> {
        let c = |candidates: &[String]| -> Result<Vec<Candidate>, StrategyError> {
            candidates.iter().map(|raw| Candidate::parse(raw)).collect()
        };
        Ok(CompiledSelectors {
            address: c(&self.address)?,
            street: c(&self.street)?,
            city: c(&self.city)?,
            state: c(&self.state)?,
            zip: c(&self.zip)?,
            property_type: c(&self.property_type)?,
            price: c(&self.price)?,
            bedrooms: c(&self.bedrooms)?,
            bathrooms: c(&self.bathrooms)?,
            square_feet: c(&self.square_feet)?,
            year_built: c(&self.year_built)?,
            description: c(&self.description)?,
            features: c(&self.features)?,
            images: c(&self.images)?,
            agent_name: c(&self.agent_name)?,
            agent_phone: c(&self.agent_phone)?,
            agent_email: c(&self.agent_email)?,
            agent_company: c(&self.agent_company)?,
            agent_license: c(&self.agent_license)?,
        })
    }
}

/// One parsed candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub selector: Selector,
    pub attr: Option<String>,
    pub raw: String,
}

impl Candidate {
    fn parse(raw: &str) -> Result<Self, StrategyError> {
        let (css, attr) = split_attr(raw);
        let selector = Selector::parse(css)
            .map_err(|e| StrategyError::Selectors(format!("invalid selector '{raw}': {e}")))?;
        Ok(Self {
            selector,
            attr: attr.map(str::to_string),
            raw: raw.to_string(),
        })
    }
}

/// `"css@attr"` into its parts. An `@` inside an attribute filter
/// (`a[href*='@']`) is part of the CSS.
fn split_attr(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once('@') {
        Some((css, attr))
            if !attr.is_empty()
                && !css.trim().is_empty()
                && attr
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')) =>
        {
            (css.trim(), Some(attr))
        }
        _ => (raw.trim(), None),
    }
}

/// Ready-to-use candidates, built once per scraper.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub address: Vec<Candidate>,
    pub street: Vec<Candidate>,
    pub city: Vec<Candidate>,
    pub state: Vec<Candidate>,
    pub zip: Vec<Candidate>,
    pub property_type: Vec<Candidate>,
    pub price: Vec<Candidate>,
    pub bedrooms: Vec<Candidate>,
    pub bathrooms: Vec<Candidate>,
    pub square_feet: Vec<Candidate>,
    pub year_built: Vec<Candidate>,
    pub description: Vec<Candidate>,
    pub features: Vec<Candidate>,
    pub images: Vec<Candidate>,
    pub agent_name: Vec<Candidate>,
    pub agent_phone: Vec<Candidate>,
    pub agent_email: Vec<Candidate>,
    pub agent_company: Vec<Candidate>,
    pub agent_license: Vec<Candidate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let compiled = SelectorSet::default().compile().expect("defaults are valid");
        assert!(!compiled.price.is_empty());
        let meta = compiled
            .description
            .iter()
            .find(|c| c.raw.starts_with("meta[property='og:description']"))
            .expect("og description candidate");
        assert_eq!(meta.attr.as_deref(), Some("content"));
    }

    #[test]
    fn split_attr_handles_at_inside_filters() {
        assert_eq!(split_attr("img.photo@src"), ("img.photo", Some("src")));
        assert_eq!(split_attr("a[href*='@']"), ("a[href*='@']", None));
        assert_eq!(split_attr(".price"), (".price", None));
    }

    #[test]
    fn yaml_override_replaces_only_listed_fields() {
        let set = SelectorSet::from_yaml_str("price:\n  - \".custom-price\"\n").unwrap();
        assert_eq!(set.price, vec![".custom-price"]);
        assert_eq!(set.bedrooms, SelectorSet::default().bedrooms);
    }

    #[test]
    fn yaml_with_invalid_css_is_rejected() {
        let err = SelectorSet::from_yaml_str("price:\n  - \"[[[\"\n").unwrap_err();
        assert!(matches!(err, StrategyError::Selectors(_)));
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(SelectorSet::from_yaml_str("price: [unterminated").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SelectorSet::from_yaml_file(Path::new("/nonexistent/selectors.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
