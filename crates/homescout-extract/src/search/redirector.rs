use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;

use super::{SearchHit, SearchProvider};
use crate::error::StrategyError;
use crate::input::ListingInput;
use crate::url_parser::parse_listing_url;

static DETAIL_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(/homedetails/[^/]+/\d+_zpid|/realestateandhomes-detail/[^/]+|/home/\d+|/property/[^/]+|/listing/[^/]+)",
    )
    .expect("valid regex")
});

/// Outcome of a redirect lookup. Both parts are optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectResult {
    pub canonical_url: Option<String>,
    pub snippet: Option<String>,
}

impl RedirectResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical_url.is_none() && self.snippet.is_none()
    }
}

/// Maps arbitrary listings onto a preferred aggregator's detail page.
pub struct SearchRedirector {
    provider: Arc<dyn SearchProvider>,
    preferred_domain: String,
    result_count: u32,
}

impl SearchRedirector {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        preferred_domain: impl Into<String>,
        result_count: u32,
    ) -> Self {
        Self {
            provider,
            preferred_domain: preferred_domain.into(),
            result_count,
        }
    }

    #[must_use]
    pub fn preferred_domain(&self) -> &str {
        &self.preferred_domain
    }

    /// Resolve a canonical listing URL and/or snippet for `input`.
    ///
    /// Finding nothing is `Ok(RedirectResult::default())`, not an error.
    ///
    /// # Errors
    ///
    /// Propagates [`StrategyError`] from the search provider.
    pub async fn redirect(&self, input: &ListingInput) -> Result<RedirectResult, StrategyError> {
        if let Some(url) = input.as_url().filter(|u| self.is_canonical(u)) {
            tracing::debug!(url = %url, "input is already a canonical listing");
            return Ok(RedirectResult {
                canonical_url: Some(url.to_string()),
                snippet: None,
            });
        }

        let Some(address) = query_subject(input) else {
            tracing::debug!(input = input.display(), "no address derivable for search");
            return Ok(RedirectResult::default());
        };

        let query = self.listing_query(&address);
        let hits = self.provider.search(&query, self.result_count).await?;
        let result = self.pick(&hits);
        tracing::debug!(
            query,
            hits = hits.len(),
            canonical = result.canonical_url.as_deref().unwrap_or(""),
            "search redirect finished"
        );
        Ok(result)
    }

    /// Search for a listing's agent with a "listed by" phrase filter.
    ///
    /// # Errors
    ///
    /// Propagates [`StrategyError`] from the search provider.
    pub async fn agent_hits(&self, address: &str) -> Result<Vec<SearchHit>, StrategyError> {
        let query = format!("\"{address}\" \"listed by\"");
        self.provider.search(&query, self.result_count).await
    }

    fn listing_query(&self, address: &str) -> String {
        format!("\"{address}\" site:{}", self.preferred_domain)
    }

    fn on_preferred_domain(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| {
            let host = host.to_ascii_lowercase();
            host == self.preferred_domain || host.ends_with(&format!(".{}", self.preferred_domain))
        })
    }

    fn is_canonical(&self, url: &Url) -> bool {
        self.on_preferred_domain(url) && DETAIL_PATH_RE.is_match(url.path())
    }

    /// First detail-page hit on the preferred domain wins; failing that, the
    /// first on-domain snippet is still worth returning as text.
    fn pick(&self, hits: &[SearchHit]) -> RedirectResult {
        let on_domain = |hit: &&SearchHit| {
            Url::parse(&hit.link)
                .ok()
                .is_some_and(|u| self.on_preferred_domain(&u))
        };

        if let Some(hit) = hits
            .iter()
            .filter(on_domain)
            .find(|hit| Url::parse(&hit.link).is_ok_and(|u| self.is_canonical(&u)))
        {
            return RedirectResult {
                canonical_url: Some(hit.link.clone()),
                snippet: non_blank(&hit.snippet),
            };
        }

        RedirectResult {
            canonical_url: None,
            snippet: hits
                .iter()
                .filter(on_domain)
                .find_map(|hit| non_blank(&hit.snippet)),
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// The human-readable subject to search for.
fn query_subject(input: &ListingInput) -> Option<String> {
    match input {
        ListingInput::Address(address) => Some(address.clone()),
        ListingInput::Url(url) => parse_listing_url(url).map(|parts| parts.address),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct CannedSearch {
        hits: Vec<SearchHit>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for CannedSearch {
        async fn search(&self, query: &str, _count: u32) -> Result<Vec<SearchHit>, StrategyError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.hits.clone())
        }
    }

    fn hit(link: &str, snippet: &str) -> SearchHit {
        SearchHit {
            title: String::new(),
            link: link.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn redirector(hits: Vec<SearchHit>) -> (SearchRedirector, Arc<CannedSearch>) {
        let provider = Arc::new(CannedSearch {
            hits,
            queries: Mutex::new(Vec::new()),
        });
        (
            SearchRedirector::new(provider.clone(), "zillow.com", 10),
            provider,
        )
    }

    #[tokio::test]
    async fn picks_first_detail_page_on_preferred_domain() {
        let (redirector, provider) = redirector(vec![
            hit("https://www.redfin.com/CA/SF/1-Main-St-94117/home/1", "redfin"),
            hit("https://www.zillow.com/b/some-building/", "building page"),
            hit(
                "https://www.zillow.com/homedetails/1-Main-St-San-Francisco-CA-94117/42_zpid/",
                "3 bd, 2 ba",
            ),
        ]);
        let input =
            ListingInput::parse("https://www.redfin.com/CA/San-Francisco/1-Main-St-94117/home/1")
                .unwrap();

        let result = redirector.redirect(&input).await.unwrap();
        assert_eq!(
            result.canonical_url.as_deref(),
            Some("https://www.zillow.com/homedetails/1-Main-St-San-Francisco-CA-94117/42_zpid/")
        );
        assert_eq!(result.snippet.as_deref(), Some("3 bd, 2 ba"));

        let queries = provider.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            "\"1 Main St San Francisco CA 94117\" site:zillow.com"
        );
    }

    #[tokio::test]
    async fn falls_back_to_on_domain_snippet_without_detail_match() {
        let (redirector, _) = redirector(vec![hit(
            "https://www.zillow.com/san-francisco-ca/",
            "Homes for sale near 1 Main St",
        )]);
        let input = ListingInput::parse("1 Main St, San Francisco, CA 94117").unwrap();
        let result = redirector.redirect(&input).await.unwrap();
        assert!(result.canonical_url.is_none());
        assert_eq!(
            result.snippet.as_deref(),
            Some("Homes for sale near 1 Main St")
        );
    }

    #[tokio::test]
    async fn no_match_returns_empty_result() {
        let (redirector, _) = redirector(vec![hit("https://other.com/homedetails/x/1_zpid/", "x")]);
        let input = ListingInput::parse("1 Main St, San Francisco, CA 94117").unwrap();
        let result = redirector.redirect(&input).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn canonical_input_is_returned_without_searching() {
        let (redirector, provider) = redirector(vec![hit(
            "https://www.zillow.com/homedetails/2-Other-St-San-Francisco-CA-94117/7_zpid/",
            "other listing",
        )]);
        let input = ListingInput::parse(
            "https://www.zillow.com/homedetails/1-Main-St-San-Francisco-CA-94117/42_zpid/",
        )
        .unwrap();
        let result = redirector.redirect(&input).await.unwrap();
        assert_eq!(
            result.canonical_url.as_deref(),
            Some("https://www.zillow.com/homedetails/1-Main-St-San-Francisco-CA-94117/42_zpid/")
        );
        assert!(provider.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_without_address_skips_search() {
        let (redirector, provider) = redirector(vec![hit(
            "https://www.zillow.com/homedetails/x/1_zpid/",
            "x",
        )]);
        let input = ListingInput::parse("https://example.com/listing-abc").unwrap();
        let result = redirector.redirect(&input).await.unwrap();
        assert!(result.is_empty());
        assert!(provider.queries.lock().unwrap().is_empty());
    }
}
