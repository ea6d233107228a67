//! Field extraction from rendered listing HTML.
//!
//! Passes run in order and only fill fields that are still empty:
//! selector candidates, then JSON-LD, then tolerant regexes over the
//! visible text.

use scraper::{ElementRef, Html};
use url::Url;

use super::jsonld::extract_jsonld;
use super::selectors::{Candidate, CompiledSelectors};
use crate::partial::{PartialRecord, RawValue};
use crate::patterns;
use crate::url_parser::split_address;

/// Characters after a "listed by" phrase searched for the agent's contact
/// details.
const AGENT_WINDOW: usize = 300;

const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

/// Extracted fields plus the page's visible text.
pub(crate) fn extract_page(
    html: &str,
    selectors: &CompiledSelectors,
    page_url: &Url,
) -> (PartialRecord, String) {
    let document = Html::parse_document(html);

    let mut record = selector_pass(&document, selectors, page_url);

    let filled = record.fill_missing_from(extract_jsonld(html));
    if !filled.is_empty() {
        tracing::debug!(fields = ?filled, "filled from JSON-LD");
    }

    let text = visible_text(&document);
    let filled = record.fill_missing_from(text_pass(&text));
    if !filled.is_empty() {
        tracing::debug!(fields = ?filled, "filled from page text");
    }

    decompose_address(&mut record);
    record.image_urls = record
        .image_urls
        .iter()
        .filter_map(|src| page_url.join(src.trim()).ok())
        .map(String::from)
        .collect();
    (record, text)
}

fn selector_pass(document: &Html, s: &CompiledSelectors, page_url: &Url) -> PartialRecord {
    let first = |candidates: &[Candidate]| first_match(document, candidates);
    let number = |candidates: &[Candidate]| first(candidates).map(RawValue::Text);

    let street = first(&s.street);
    let city = first(&s.city);
    let state = first(&s.state);
    let zip = first(&s.zip);
    let address = first(&s.address).or_else(|| {
        compose_address(
            street.as_deref(),
            city.as_deref(),
            state.as_deref(),
            zip.as_deref(),
        )
    });

    let listing_agent_email = first(&s.agent_email).and_then(|raw| clean_email(&raw));
    if let Some(email) = &listing_agent_email {
        tracing::debug!(url = %page_url, email, "agent email found on page");
    }

    PartialRecord {
        address,
        city,
        state,
        zip,
        property_type: first(&s.property_type),
        price: number(&s.price),
        bedrooms: number(&s.bedrooms),
        bathrooms: number(&s.bathrooms),
        square_feet: number(&s.square_feet),
        year_built: number(&s.year_built),
        description: first(&s.description),
        features: all_matches(document, &s.features),
        image_urls: all_matches(document, &s.images),
        listing_agent_name: first(&s.agent_name),
        listing_agent_phone: first(&s.agent_phone).and_then(|raw| clean_phone(&raw)),
        listing_agent_email,
        listing_agent_email_source: None,
        listing_agent_company: first(&s.agent_company),
        listing_agent_license_no: first(&s.agent_license)
            .map(|raw| patterns::license_number(&raw).unwrap_or(raw)),
    }
}

fn candidate_value(element: ElementRef<'_>, candidate: &Candidate) -> Option<String> {
    let raw = match &candidate.attr {
        Some(attr) => element.value().attr(attr)?.to_string(),
        None => element.text().collect::<Vec<_>>().join(" "),
    };
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// First non-empty value of the first candidate that yields one.
fn first_match(document: &Html, candidates: &[Candidate]) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        let value = document
            .select(&candidate.selector)
            .find_map(|el| candidate_value(el, candidate))?;
        tracing::debug!(selector = %candidate.raw, "selector matched");
        Some(value)
    })
}

/// Every value of the first candidate that yields any.
fn all_matches(document: &Html, candidates: &[Candidate]) -> Vec<String> {
    for candidate in candidates {
        let values: Vec<String> = document
            .select(&candidate.selector)
            .filter_map(|el| candidate_value(el, candidate))
            .collect();
        if !values.is_empty() {
            tracing::debug!(selector = %candidate.raw, count = values.len(), "list selector matched");
            return values;
        }
    }
    Vec::new()
}

fn compose_address(
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
    zip: Option<&str>,
) -> Option<String> {
    let mut address = street?.to_string();
    if let Some(city) = city {
        address.push_str(", ");
        address.push_str(city);
    }
    let tail: Vec<&str> = [state, zip].into_iter().flatten().collect();
    if !tail.is_empty() {
        address.push_str(", ");
        address.push_str(&tail.join(" "));
    }
    Some(address)
}

/// Page text a reader would see, skipping scripts, styles and templates.
fn visible_text(document: &Html) -> String {
    let root = document.root_element();
    let mut pieces = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }
    pieces.join(" ")
}

/// Regex recovery of numerics and agent details from page text.
fn text_pass(text: &str) -> PartialRecord {
    let mut record = patterns::numeric_fields_from_text(text);

    record.listing_agent_name = patterns::listed_by_name(text);
    if let Some(window) = agent_window(text) {
        record.listing_agent_phone = patterns::phone(window);
        record.listing_agent_license_no = patterns::license_number(window);
        record.listing_agent_email = patterns::emails(window)
            .find(|e| patterns::is_valid_email(e))
            .map(str::to_string);
    }
    record.listing_agent_company = patterns::company(text);
    record
}

/// Text following the first "listed by" / "listing agent" phrase.
fn agent_window(text: &str) -> Option<&str> {
    let lowered = text.to_ascii_lowercase();
    let start = lowered
        .find("listed by")
        .or_else(|| lowered.find("listing agent"))?;
    let mut end = (start + AGENT_WINDOW).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Some(&text[start..end])
}

/// Fill city/state/zip from a single-string address.
fn decompose_address(record: &mut PartialRecord) {
    let Some(address) = record.address.as_deref() else {
        return;
    };
    if record.city.is_some() && record.state.is_some() && record.zip.is_some() {
        return;
    }
    let parts = split_address(address);
    record.city = record.city.take().or(parts.city);
    record.state = record.state.take().or(parts.state);
    record.zip = record.zip.take().or(parts.zip);
}

/// `tel:` links and loosely formatted numbers as `(NNN) NNN-NNNN`.
fn clean_phone(raw: &str) -> Option<String> {
    if let Some(formatted) = patterns::phone(raw) {
        return Some(formatted);
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        10 => digits.as_str(),
        _ => return None,
    };
    Some(format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]))
}

fn clean_email(raw: &str) -> Option<String> {
    let stripped = raw.trim();
    let stripped = stripped
        .strip_prefix("mailto:")
        .unwrap_or(stripped)
        .split('?')
        .next()
        .unwrap_or_default()
        .trim();
    patterns::is_valid_email(stripped).then(|| stripped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::selectors::SelectorSet;

    fn extract(html: &str) -> PartialRecord {
        let selectors = SelectorSet::default().compile().unwrap();
        let url = Url::parse("https://listings.test/homes/123-main-st").unwrap();
        extract_page(html, &selectors, &url).0
    }

    #[test]
    fn first_matching_selector_wins() {
        let html = r#"
            <div data-testid="price">$899,000</div>
            <span itemprop="price" content="1"></span>
        "#;
        assert_eq!(extract(html).price, Some(RawValue::text("$899,000")));
    }

    #[test]
    fn empty_candidates_fall_through() {
        let html = r#"
            <div data-testid="price">   </div>
            <meta property="product:price:amount" content="750000">
        "#;
        assert_eq!(extract(html).price, Some(RawValue::text("750000")));
    }

    #[test]
    fn regex_pass_recovers_numbers_from_text() {
        let html = "<body><p>Charming 3 bed, 2 bath, 1,800 sq ft bungalow. Built in 1952.</p>\
                    <p>Offered at $750,000</p><script>var price = '$1';</script></body>";
        let record = extract(html);
        assert_eq!(record.bedrooms, Some(RawValue::text("3")));
        assert_eq!(record.bathrooms, Some(RawValue::text("2")));
        assert_eq!(record.square_feet, Some(RawValue::text("1,800")));
        assert_eq!(record.year_built, Some(RawValue::text("1952")));
        assert_eq!(record.price, Some(RawValue::text("750,000")));
    }

    #[test]
    fn selectors_take_precedence_over_json_ld() {
        let html = r#"
            <div data-testid="property-meta-beds"><span>4 bd</span></div>
            <script type="application/ld+json">{"@type":"House","numberOfBedrooms":2,"yearBuilt":1999}</script>
        "#;
        let record = extract(html);
        assert_eq!(record.bedrooms, Some(RawValue::text("4 bd")));
        assert_eq!(record.year_built, Some(RawValue::Number(1999.0)));
    }

    #[test]
    fn room_count_microdata_is_not_read_as_bedrooms() {
        let html = r#"
            <span itemprop="numberOfRooms">8</span>
            <script type="application/ld+json">{"@type":"House","numberOfRooms":8}</script>
        "#;
        let record = extract(html);
        assert_eq!(record.bedrooms, None);
    }

    #[test]
    fn single_address_string_is_decomposed() {
        let html = r#"<h1 data-testid="address-line">55 Ocean Ave, Santa Cruz, CA 95060</h1>"#;
        let record = extract(html);
        assert_eq!(record.city.as_deref(), Some("Santa Cruz"));
        assert_eq!(record.state.as_deref(), Some("CA"));
        assert_eq!(record.zip.as_deref(), Some("95060"));
    }

    #[test]
    fn microdata_parts_compose_an_address() {
        let html = r#"
            <span itemprop="streetAddress">9 Elm Ave</span>
            <span itemprop="addressLocality">Austin</span>
            <span itemprop="addressRegion">TX</span>
            <span itemprop="postalCode">78701</span>
        "#;
        assert_eq!(extract(html).address.as_deref(), Some("9 Elm Ave, Austin, TX 78701"));
    }

    #[test]
    fn features_and_relative_images() {
        let html = r#"
            <ul class="amenities"><li>Garage</li><li>Fireplace</li></ul>
            <div class="gallery"><img src="/photos/1.jpg"><img src="https://cdn.test/2.jpg"></div>
        "#;
        let record = extract(html);
        assert_eq!(record.features, vec!["Garage", "Fireplace"]);
        assert_eq!(
            record.image_urls,
            vec!["https://listings.test/photos/1.jpg", "https://cdn.test/2.jpg"]
        );
    }

    #[test]
    fn listed_by_text_yields_agent_contact() {
        let html = "<p>Listed by Jane Doe DRE #01234567, (415) 555-0100, jane.doe@bayrealty.com. \
                    Listing courtesy of Bay Realty Group.</p>";
        let record = extract(html);
        assert_eq!(record.listing_agent_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.listing_agent_phone.as_deref(), Some("(415) 555-0100"));
        assert_eq!(record.listing_agent_license_no.as_deref(), Some("01234567"));
        assert_eq!(record.listing_agent_email.as_deref(), Some("jane.doe@bayrealty.com"));
        assert_eq!(record.listing_agent_company.as_deref(), Some("Bay Realty Group"));
    }

    #[test]
    fn tel_and_mailto_links_are_cleaned() {
        let html = r#"
            <a href="tel:+14155550100">Call</a>
            <a href="mailto:agent@brokerage.test?subject=123%20Main">Email</a>
        "#;
        let record = extract(html);
        assert_eq!(record.listing_agent_phone.as_deref(), Some("(415) 555-0100"));
        assert_eq!(record.listing_agent_email.as_deref(), Some("agent@brokerage.test"));
    }

    #[test]
    fn empty_page_yields_empty_record() {
        assert!(extract("<html><body></body></html>").is_empty());
    }
}
