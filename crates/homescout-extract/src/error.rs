use thiserror::Error;

/// Errors surfaced to callers of [`crate::Extractor`].
///
/// Degraded upstream data is never an error; the only failure a caller sees
/// is input that is neither a usable URL nor a plausible street address.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid listing input \"{input}\": {reason}")]
    InvalidInput { input: String, reason: String },
}

/// Failure of a single strategy or upstream collaborator.
///
/// Caught by the orchestrator, logged, and converted into a fall-through to
/// the next strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{what} timed out after {secs}s")]
    Timeout { what: String, secs: u64 },

    #[error("blocked by anti-automation defenses at {url} ({signature})")]
    Blocked { url: String, signature: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser automation error: {0}")]
    Browser(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("selector configuration error: {0}")]
    Selectors(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<thirtyfour::error::WebDriverError> for StrategyError {
    fn from(err: thirtyfour::error::WebDriverError) -> Self {
        Self::Browser(err.to_string())
    }
}
