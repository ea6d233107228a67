use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Use it in tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup instead of `set_var`/`remove_var`.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so `.env` templates can leave keys empty.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("HOMESCOUT_ENV", "development"))?;

    let bind_addr = or_default("HOMESCOUT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("HOMESCOUT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("HOMESCOUT_LOG_LEVEL", "info");

    let search_api_key = optional("SERPAPI_API_KEY");
    let search_base_url = or_default("HOMESCOUT_SEARCH_BASE_URL", "https://serpapi.com");
    let search_result_count = parse_u32("HOMESCOUT_SEARCH_RESULT_COUNT", "10")?;
    let use_search_redirect = parse_bool(
        "HOMESCOUT_USE_SEARCH_REDIRECT",
        &or_default("HOMESCOUT_USE_SEARCH_REDIRECT", "true"),
    )?;
    let preferred_domain = or_default("HOMESCOUT_PREFERRED_DOMAIN", "zillow.com")
        .trim()
        .trim_start_matches("www.")
        .to_ascii_lowercase();

    let llm_api_key = optional("OPENAI_API_KEY");
    let llm_base_url = or_default("HOMESCOUT_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_model = or_default("HOMESCOUT_LLM_MODEL", "gpt-4o-mini");

    let webdriver_url = optional("HOMESCOUT_WEBDRIVER_URL");
    let selectors_path = optional("HOMESCOUT_SELECTORS_PATH").map(PathBuf::from);

    let search_timeout_secs = parse_u64("HOMESCOUT_SEARCH_TIMEOUT_SECS", "15")?;
    let browser_timeout_secs = parse_u64("HOMESCOUT_BROWSER_TIMEOUT_SECS", "45")?;
    let llm_timeout_secs = parse_u64("HOMESCOUT_LLM_TIMEOUT_SECS", "30")?;
    let agent_timeout_secs = parse_u64("HOMESCOUT_AGENT_TIMEOUT_SECS", "15")?;
    let overall_deadline_secs = parse_u64("HOMESCOUT_OVERALL_DEADLINE_SECS", "90")?;

    let max_browser_sessions = parse_positive_usize("HOMESCOUT_MAX_BROWSER_SESSIONS", "2")?;
    let max_concurrent_extractions =
        parse_positive_usize("HOMESCOUT_MAX_CONCURRENT_EXTRACTIONS", "4")?;
    let max_features = parse_positive_usize("HOMESCOUT_MAX_FEATURES", "30")?;
    let max_images = parse_positive_usize("HOMESCOUT_MAX_IMAGES", "25")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        search_api_key,
        search_base_url,
        search_result_count,
        use_search_redirect,
        preferred_domain,
        llm_api_key,
        llm_base_url,
        llm_model,
        webdriver_url,
        selectors_path,
        search_timeout_secs,
        browser_timeout_secs,
        llm_timeout_secs,
        agent_timeout_secs,
        overall_deadline_secs,
        max_browser_sessions,
        max_concurrent_extractions,
        max_features,
        max_images,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HOMESCOUT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
