use url::Url;

use crate::error::ExtractError;

const MIN_ADDRESS_LEN: usize = 5;
const MAX_ADDRESS_LEN: usize = 300;

/// A validated extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingInput {
    Url(Url),
    Address(String),
}

impl ListingInput {
    /// Classify and validate raw caller input.
    ///
    /// Strings with a scheme, a leading `www.`, or a first token shaped like
    /// `host.tld/path` are URLs; everything else must look like a street
    /// address (a letter and a digit, bounded length, no control characters).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidInput`] for malformed URLs and for text
    /// that cannot be an address.
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ExtractError::InvalidInput {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("input is empty"));
        }

        if looks_like_url(trimmed) {
            let candidate = if trimmed.contains("://") {
                trimmed.to_string()
            } else {
                format!("https://{trimmed}")
            };
            let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("only http and https URLs are supported"));
            }
            match url.host_str() {
                Some(host) if host.contains('.') || host == "localhost" => {}
                _ => return Err(invalid("URL has no usable host")),
            }
            return Ok(Self::Url(url));
        }

        let len = trimmed.chars().count();
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
            return Err(invalid("address must be between 5 and 300 characters"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(invalid("address contains control characters"));
        }
        if !trimmed.chars().any(char::is_alphabetic) || !trimmed.chars().any(|c| c.is_ascii_digit())
        {
            return Err(invalid("address must contain a street number and a name"));
        }
        Ok(Self::Address(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Self::Url(url) => Some(url),
            Self::Address(_) => None,
        }
    }

    #[must_use]
    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Address(address) => Some(address),
        }
    }

    /// The input as the caller would recognize it.
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Url(url) => url.as_str(),
            Self::Address(address) => address,
        }
    }
}

fn looks_like_url(s: &str) -> bool {
    if s.contains("://") || s.to_ascii_lowercase().starts_with("www.") {
        return true;
    }
    let first = s.split_whitespace().next().unwrap_or_default();
    match first.split_once('/') {
        Some((host, _)) => host.contains('.') && !host.ends_with('.'),
        None => false,
    }
}
