//! Integration tests for `OpenAiClient` and `LlmExtractor` using wiremock HTTP mocks.

use std::sync::Arc;

use homescout_extract::{normalize, LlmExtractor, OpenAiClient, PartialRecord};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_extractor(base_url: &str) -> LlmExtractor {
    let client = OpenAiClient::with_base_url("test-key", "gpt-4o-mini", 5, base_url)
        .expect("client construction should not fail");
    LlmExtractor::new(Arc::new(client))
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content, "refusal": null},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn snippet_extraction_normalizes_to_numbers() {
    let server = MockServer::start().await;

    let answer = serde_json::json!({
        "address": "123 Main St, San Francisco, CA 94117",
        "city": "San Francisco",
        "state": "CA",
        "zip": "94117",
        "propertyType": "Single Family",
        "bedrooms": "3",
        "bathrooms": "2 1/2",
        "squareFeet": "1,950",
        "price": "$899,000",
        "yearBuilt": null,
        "description": null,
        "features": [],
        "listingAgentName": null,
        "listingAgentPhone": null,
        "listingAgentCompany": null,
        "listingAgentLicenseNo": null
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "property_listing", "strict": true}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&answer.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let raw = test_extractor(&server.uri())
        .extract_from_text(
            "123 Main St, San Francisco, CA 94117. 3 bd, 2 1/2 ba, 1,950 sqft. $899,000.",
            None,
        )
        .await
        .expect("extraction should succeed");

    let record = normalize(raw);
    assert_eq!(record.address.as_deref(), Some("123 Main St, San Francisco, CA 94117"));
    assert_eq!(record.bedrooms.and_then(|v| v.as_number()), Some(3.0));
    assert_eq!(record.bathrooms.and_then(|v| v.as_number()), Some(2.5));
    assert_eq!(record.square_feet.and_then(|v| v.as_number()), Some(1950.0));
    assert_eq!(record.price.and_then(|v| v.as_number()), Some(899_000.0));
    assert!(record.year_built.is_none());
}

#[tokio::test]
async fn confirmed_facts_are_sent_with_the_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .mount(&server)
        .await;

    let hints = PartialRecord {
        city: Some("Austin".to_string()),
        ..PartialRecord::default()
    };
    test_extractor(&server.uri())
        .extract_from_text("Charming bungalow", Some(&hints))
        .await
        .expect("extraction should succeed");

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = requests[0].body_json().expect("json request body");
    let user_prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
    assert!(user_prompt.contains("Confirmed facts"));
    assert!(user_prompt.contains("Austin"));
    assert!(user_prompt.contains("Charming bungalow"));
}

#[tokio::test]
async fn refusal_yields_empty_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "I can't help with that."}}]
        })))
        .mount(&server)
        .await;

    let record = test_extractor(&server.uri())
        .extract_from_text("Some listing text", None)
        .await
        .expect("a refusal is not an error");
    assert!(record.is_empty());
}

#[tokio::test]
async fn server_error_surfaces_as_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_extractor(&server.uri())
        .extract_from_text("Some listing text", None)
        .await
        .expect_err("503 should fail");
    assert!(err.to_string().contains("503"), "got: {err}");
}

#[tokio::test]
async fn blank_text_never_calls_the_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let record = test_extractor(&server.uri())
        .extract_from_text("   ", None)
        .await
        .expect("blank text is fine");
    assert!(record.is_empty());
}
