//! Client configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use surety_client::api::SuretyApi;
use surety_client::backend::HttpBackend;
use surety_client::credentials::Credentials;
use surety_client::error::ClientError;
use surety_client::poller::PollerConfig;
use surety_core::error::CoreError;
use surety_core::lifecycle::ProgressConfig;

/// Backend connection and polling settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the `/jobs` routes hang off.
    pub api_url: String,
    pub credentials: Credentials,
    pub request_timeout: Duration,
    pub poller: PollerConfig,
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default     |
    /// |-------------------------------|-------------|
    /// | `SURETY_API_URL`              | required    |
    /// | `SURETY_API_TOKEN`            | none        |
    /// | `SURETY_REQUEST_TIMEOUT_SECS` | `30`        |
    /// | `SURETY_POLL_INTERVAL_SECS`   | `5`         |
    /// | `SURETY_RETRY_DELAY_SECS`     | `5`         |
    /// | `SURETY_PROGRESS_INCREMENT`   | `5`         |
    /// | `SURETY_PROGRESS_CEILING`     | `85`        |
    /// | `SURETY_MAX_POLL_FAILURES`    | unbounded   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let api_url = lookup("SURETY_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CoreError::Config("SURETY_API_URL environment variable is required".to_string())
            })?;

        let credentials = lookup("SURETY_API_TOKEN")
            .map(Credentials::token)
            .unwrap_or_default();

        let request_timeout_secs: u64 = parse_or(&lookup, "SURETY_REQUEST_TIMEOUT_SECS", 30)?;
        let poll_interval_secs: u64 = parse_or(&lookup, "SURETY_POLL_INTERVAL_SECS", 5)?;
        let retry_delay_secs: u64 = parse_or(&lookup, "SURETY_RETRY_DELAY_SECS", 5)?;

        let defaults = ProgressConfig::default();
        let progress = ProgressConfig {
            increment: parse_or(&lookup, "SURETY_PROGRESS_INCREMENT", defaults.increment)?,
            ceiling: parse_or(&lookup, "SURETY_PROGRESS_CEILING", defaults.ceiling)?,
        };

        let max_consecutive_failures = lookup("SURETY_MAX_POLL_FAILURES")
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_value::<u32>("SURETY_MAX_POLL_FAILURES", &v))
            .transpose()?;

        let poller = PollerConfig {
            poll_interval: Duration::from_secs(poll_interval_secs),
            retry_delay: Duration::from_secs(retry_delay_secs),
            max_consecutive_failures,
            progress,
        };
        poller.validate()?;

        Ok(Self {
            api_url,
            credentials,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poller,
        })
    }

    /// Build the HTTP backend these settings describe.
    pub fn backend(&self) -> Result<HttpBackend, ClientError> {
        let api = SuretyApi::with_timeout(&self.api_url, self.request_timeout)?;
        Ok(HttpBackend::new(api, self.credentials.clone()))
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CoreError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key} has an invalid value '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, CoreError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn api_url_is_required() {
        assert_matches!(load(&[]), Err(CoreError::Config(msg)) if msg.contains("SURETY_API_URL"));
        assert!(load(&[("SURETY_API_URL", "  ")]).is_err());
    }

    #[test]
    fn defaults_match_poller_defaults() {
        let config = load(&[("SURETY_API_URL", "http://localhost:8000/api")]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert!(config.credentials.is_anonymous());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.poller, PollerConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("SURETY_API_URL", "http://backend"),
            ("SURETY_API_TOKEN", "abc"),
            ("SURETY_POLL_INTERVAL_SECS", "3"),
            ("SURETY_PROGRESS_CEILING", "90"),
            ("SURETY_MAX_POLL_FAILURES", "12"),
        ])
        .unwrap();
        assert_eq!(config.credentials.header_value().as_deref(), Some("Token abc"));
        assert_eq!(config.poller.poll_interval, Duration::from_secs(3));
        assert_eq!(config.poller.progress.ceiling, 90);
        assert_eq!(config.poller.max_consecutive_failures, Some(12));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = load(&[
            ("SURETY_API_URL", "http://backend"),
            ("SURETY_RETRY_DELAY_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SURETY_RETRY_DELAY_SECS"));
    }

    #[test]
    fn ceiling_of_100_is_rejected() {
        let result = load(&[
            ("SURETY_API_URL", "http://backend"),
            ("SURETY_PROGRESS_CEILING", "100"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = load(&[
            ("SURETY_API_URL", "http://backend"),
            ("SURETY_POLL_INTERVAL_SECS", "0"),
        ]);
        assert!(result.is_err());
    }
}
