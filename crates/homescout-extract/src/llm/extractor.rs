use std::sync::{Arc, LazyLock};

use serde_json::{json, Value};

use super::LanguageModel;
use crate::error::StrategyError;
use crate::partial::PartialRecord;

/// Source text beyond this many characters is cut before prompting.
pub const MAX_PROMPT_CHARS: usize = 12_000;

const SCHEMA_NAME: &str = "property_listing";

const SYSTEM_PROMPT: &str = "You extract real-estate listing facts from text. \
Only report values stated in the text; use null for anything not stated. \
Copy numbers as written (for example \"2 1/2\" or \"$899,000\"). \
Never contradict the confirmed facts you are given.";

static LISTING_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    let text = json!({"type": ["string", "null"]});
    let number = json!({"type": ["number", "string", "null"]});
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "address", "city", "state", "zip", "propertyType",
            "bedrooms", "bathrooms", "squareFeet", "price", "yearBuilt",
            "description", "features",
            "listingAgentName", "listingAgentPhone", "listingAgentCompany",
            "listingAgentLicenseNo"
        ],
        "properties": {
            "address": text,
            "city": text,
            "state": text,
            "zip": text,
            "propertyType": text,
            "bedrooms": number,
            "bathrooms": number,
            "squareFeet": number,
            "price": number,
            "yearBuilt": number,
            "description": text,
            "features": {"type": "array", "items": {"type": "string"}},
            "listingAgentName": text,
            "listingAgentPhone": text,
            "listingAgentCompany": text,
            "listingAgentLicenseNo": text
        }
    })
});

/// Structured extraction from unstructured text.
///
/// Output is raw: numeric fields go through the normalizer like every
/// other source.
pub struct LlmExtractor {
    model: Arc<dyn LanguageModel>,
}

impl LlmExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Extract listing fields from `text`, telling the model which facts are
    /// already confirmed.
    ///
    /// An empty or unparsable answer is an empty record, not an error.
    ///
    /// # Errors
    ///
    /// Transport and HTTP status failures from the language model.
    pub async fn extract_from_text(
        &self,
        text: &str,
        hints: Option<&PartialRecord>,
    ) -> Result<PartialRecord, StrategyError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(PartialRecord::default());
        }

        let prompt = build_prompt(truncate(text, MAX_PROMPT_CHARS), hints);
        let answer = match self
            .model
            .complete_json(SYSTEM_PROMPT, &prompt, SCHEMA_NAME, &LISTING_SCHEMA)
            .await
        {
            Ok(answer) => answer,
            Err(StrategyError::Llm(reason)) => {
                tracing::debug!(reason, "language model gave no usable answer");
                return Ok(PartialRecord::default());
            }
            Err(e) => return Err(e),
        };

        Ok(parse_answer(&answer))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_prompt(text: &str, hints: Option<&PartialRecord>) -> String {
    let mut prompt = String::new();
    if let Some(confirmed) = hints.and_then(confirmed_facts) {
        prompt.push_str("Confirmed facts (do not contradict):\n");
        prompt.push_str(&confirmed);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Listing text:\n");
    prompt.push_str(text);
    prompt
}

/// Present fields of `hints` as compact JSON, or `None` if there are none.
fn confirmed_facts(hints: &PartialRecord) -> Option<String> {
    let Ok(Value::Object(mut map)) = serde_json::to_value(hints) else {
        return None;
    };
    map.retain(|_, v| match v {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    });
    if map.is_empty() {
        return None;
    }
    serde_json::to_string(&map).ok()
}

/// Lenient decode: nulls are dropped so defaults apply, and anything that is
/// not a JSON object becomes an empty record.
fn parse_answer(answer: &str) -> PartialRecord {
    let value: Value = match serde_json::from_str(answer.trim()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "language model answer was not JSON");
            return PartialRecord::default();
        }
    };
    let Value::Object(mut map) = value else {
        tracing::warn!("language model answer was not a JSON object");
        return PartialRecord::default();
    };
    map.retain(|_, v| !v.is_null());
    match serde_json::from_value(Value::Object(map)) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "language model answer did not match the listing shape");
            PartialRecord::default()
        }
    }
}
