use anyhow::{bail, Context, Result};

const DEFAULT_SEARCH_LIMIT: u8 = 10;
const MAX_SEARCH_LIMIT: u8 = 25;

/// Application configuration loaded from environment variables.
/// Nothing is strictly required: a missing `JOBS_API_URL` is reported per action
/// instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub jobs_api_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Number of matches requested per search.
    pub search_limit: u8,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs_api_url: None,
            port: 8080,
            rust_log: "info".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            request_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            jobs_api_url: std::env::var("JOBS_API_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            search_limit: parse_search_limit(std::env::var("JOBS_SEARCH_LIMIT").ok().as_deref())?,
            request_timeout_secs: std::env::var("JOBS_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("JOBS_API_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

fn parse_search_limit(raw: Option<&str>) -> Result<u8> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_SEARCH_LIMIT);
    };
    let limit = raw
        .trim()
        .parse::<u8>()
        .with_context(|| format!("JOBS_SEARCH_LIMIT must be a number, got '{raw}'"))?;
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        bail!("JOBS_SEARCH_LIMIT must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}");
    }
    Ok(limit)
}
