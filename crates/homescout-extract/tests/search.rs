//! Integration tests for `SerpApiClient` and `SearchRedirector` using wiremock HTTP mocks.

use std::sync::Arc;

use homescout_extract::{ListingInput, SearchProvider, SearchRedirector, SerpApiClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> SerpApiClient {
    SerpApiClient::with_base_url("test-key", 5, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn search_returns_organic_hits() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "search_metadata": {"status": "Success"},
        "organic_results": [
            {
                "position": 1,
                "title": "123 Main St, San Francisco, CA 94117 | Zillow",
                "link": "https://www.zillow.com/homedetails/123-Main-St-San-Francisco-CA-94117/15075234_zpid/",
                "snippet": "3 beds, 2.5 baths, 1,950 sq ft house located at 123 Main St."
            },
            {"position": 2, "title": "no link"}
        ]
    });

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("engine", "google"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("num", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let hits = client
        .search("\"123 Main St\" site:zillow.com", 5)
        .await
        .expect("should parse hits");

    assert_eq!(hits.len(), 1, "hits without a link are dropped");
    assert!(hits[0].link.contains("15075234_zpid"));
    assert!(hits[0].snippet.starts_with("3 beds"));
}

#[tokio::test]
async fn search_error_field_means_no_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "Google hasn't returned any results for this query."
        })))
        .mount(&server)
        .await;

    let hits = test_client(&server.uri())
        .search("\"nowhere\"", 10)
        .await
        .expect("no results is not an error");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn search_non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .search("anything", 10)
        .await
        .expect_err("401 should fail");
    assert!(err.to_string().contains("401"), "got: {err}");
}

#[tokio::test]
async fn search_malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .search("anything", 10)
        .await
        .expect_err("html body should fail");
    assert!(err.to_string().contains("deserialization"), "got: {err}");
}

#[tokio::test]
async fn redirector_maps_address_to_canonical_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("q", "\"123 Main St, San Francisco, CA 94117\" site:zillow.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "organic_results": [
                {
                    "title": "Neighborhood guide",
                    "link": "https://www.zillow.com/san-francisco-ca/",
                    "snippet": "Homes for sale in San Francisco"
                },
                {
                    "title": "123 Main St | Zillow",
                    "link": "https://www.zillow.com/homedetails/123-Main-St-San-Francisco-CA-94117/15075234_zpid/",
                    "snippet": "3 bd, 2.5 ba, 1,950 sqft. Listed for $899,000."
                }
            ]
        })))
        .mount(&server)
        .await;

    let redirector = SearchRedirector::new(Arc::new(test_client(&server.uri())), "zillow.com", 10);
    let input = ListingInput::parse("123 Main St, San Francisco, CA 94117").expect("valid address");
    let result = redirector.redirect(&input).await.expect("search succeeds");

    assert_eq!(
        result.canonical_url.as_deref(),
        Some("https://www.zillow.com/homedetails/123-Main-St-San-Francisco-CA-94117/15075234_zpid/")
    );
    assert_eq!(
        result.snippet.as_deref(),
        Some("3 bd, 2.5 ba, 1,950 sqft. Listed for $899,000.")
    );
}

#[tokio::test]
async fn redirector_propagates_provider_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let redirector = SearchRedirector::new(Arc::new(test_client(&server.uri())), "zillow.com", 10);
    let input = ListingInput::parse("9 Elm Ave, Austin, TX 78701").expect("valid address");
    assert!(redirector.redirect(&input).await.is_err());
}
