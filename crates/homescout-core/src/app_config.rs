use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, read once at startup and never mutated.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub search_api_key: Option<String>,
    pub search_base_url: String,
    pub search_result_count: u32,
    pub use_search_redirect: bool,
    pub preferred_domain: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub webdriver_url: Option<String>,
    pub selectors_path: Option<PathBuf>,
    pub search_timeout_secs: u64,
    pub browser_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub agent_timeout_secs: u64,
    pub overall_deadline_secs: u64,
    pub max_browser_sessions: usize,
    pub max_concurrent_extractions: usize,
    pub max_features: usize,
    pub max_images: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("search_base_url", &self.search_base_url)
            .field("search_result_count", &self.search_result_count)
            .field("use_search_redirect", &self.use_search_redirect)
            .field("preferred_domain", &self.preferred_domain)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("webdriver_url", &self.webdriver_url)
            .field("selectors_path", &self.selectors_path)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("agent_timeout_secs", &self.agent_timeout_secs)
            .field("overall_deadline_secs", &self.overall_deadline_secs)
            .field("max_browser_sessions", &self.max_browser_sessions)
            .field(
                "max_concurrent_extractions",
                &self.max_concurrent_extractions,
            )
            .field("max_features", &self.max_features)
            .field("max_images", &self.max_images)
            .finish()
    }
}
