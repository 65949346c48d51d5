use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// A fixed-window ceiling: at most `max` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    pub max: u32,
    pub window: Duration,
}

impl LimitRule {
    pub const fn new(max: u32, window_secs: u64) -> Self {
        Self { max, window: Duration::from_secs(window_secs) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub api: LimitRule,
    pub auth: LimitRule,
    pub search: LimitRule,
    pub booking: LimitRule,
    pub chat: LimitRule,
    /// Key clients on `x-forwarded-for` instead of the socket address. Only
    /// set behind a proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            api: LimitRule::new(100, 15 * 60),
            auth: LimitRule::new(10, 15 * 60),
            search: LimitRule::new(50, 10 * 60),
            booking: LimitRule::new(5, 60 * 60),
            chat: LimitRule::new(30, 60),
            trust_proxy: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub session_idle_secs: u64,
    pub session_sweep_secs: u64,
    pub transcript_retention_secs: u64,
    pub transcript_max_records: usize,
    pub flight_api_url: Option<String>,
    pub flight_api_key: Option<String>,
    pub payment_failure_rate: f64,
    pub max_search_results: usize,
    pub limits: RateLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            session_idle_secs: 7200,
            session_sweep_secs: 300,
            transcript_retention_secs: 30 * 24 * 3600,
            transcript_max_records: 100_000,
            flight_api_url: None,
            flight_api_key: None,
            payment_failure_rate: 0.1,
            max_search_results: 10,
            limits: RateLimits::default(),
        }
    }
}

impl Config {
    /// Reads the environment (after `.env` has been loaded), falling back to
    /// the defaults above for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            session_idle_secs: parse_var("SESSION_IDLE_SECS", defaults.session_idle_secs)?,
            session_sweep_secs: parse_var("SESSION_SWEEP_SECS", defaults.session_sweep_secs)?,
            transcript_retention_secs: parse_var("TRANSCRIPT_RETENTION_SECS", defaults.transcript_retention_secs)?,
            transcript_max_records: parse_var("TRANSCRIPT_MAX_RECORDS", defaults.transcript_max_records)?,
            flight_api_url: optional_var("FLIGHT_API_URL"),
            flight_api_key: optional_var("FLIGHT_API_KEY"),
            payment_failure_rate: parse_var("PAYMENT_FAILURE_RATE", defaults.payment_failure_rate)?,
            max_search_results: parse_var("MAX_SEARCH_RESULTS", defaults.max_search_results)?,
            limits: RateLimits {
                api: limit_var("API", defaults.limits.api)?,
                auth: limit_var("AUTH", defaults.limits.auth)?,
                search: limit_var("SEARCH", defaults.limits.search)?,
                booking: limit_var("BOOKING", defaults.limits.booking)?,
                chat: limit_var("CHAT", defaults.limits.chat)?,
                trust_proxy: parse_var("TRUST_PROXY", defaults.limits.trust_proxy)?,
            },
        };
        config.session_idle()?;
        config.transcript_retention()?;
        Ok(config)
    }

    pub fn session_idle(&self) -> Result<chrono::Duration> {
        seconds("SESSION_IDLE_SECS", self.session_idle_secs)
    }

    pub fn transcript_retention(&self) -> Result<chrono::Duration> {
        seconds("TRANSCRIPT_RETENTION_SECS", self.transcript_retention_secs)
    }
}

fn seconds(key: &str, secs: u64) -> Result<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .with_context(|| format!("{} out of range: {}", key, secs))
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("invalid {}", key))
}

// RATE_LIMIT_<NAME>_MAX / RATE_LIMIT_<NAME>_WINDOW_SECS
fn limit_var(name: &str, default: LimitRule) -> Result<LimitRule> {
    let max = parse_var(&format!("RATE_LIMIT_{}_MAX", name), default.max)?;
    let window_secs = parse_var(&format!("RATE_LIMIT_{}_WINDOW_SECS", name), default.window.as_secs())?;
    Ok(LimitRule::new(max, window_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = RateLimits::default();
        assert_eq!(limits.chat, LimitRule::new(30, 60));
        assert_eq!(limits.booking.window, Duration::from_secs(3600));
        assert_eq!(limits.api.max, 100);
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let config = Config { session_idle_secs: u64::MAX, ..Config::default() };
        assert!(config.session_idle().is_err());

        let config = Config { transcript_retention_secs: i64::MAX as u64, ..Config::default() };
        assert!(config.transcript_retention().is_err());

        let defaults = Config::default();
        assert_eq!(defaults.session_idle().unwrap(), chrono::Duration::hours(2));
        assert!(!defaults.limits.trust_proxy);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        env::set_var("FLIGHT_TEST_BAD_PORT", "not-a-port");
        let parsed: Result<u16> = parse_var("FLIGHT_TEST_BAD_PORT", 3000);
        assert!(parsed.is_err());
        env::remove_var("FLIGHT_TEST_BAD_PORT");

        let fallback: u16 = parse_var("FLIGHT_TEST_UNSET_PORT", 3000).unwrap();
        assert_eq!(fallback, 3000);
    }
}
