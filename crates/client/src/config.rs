//! Chat client configuration.
//!
//! Values come from the environment (see [`ChatConfig::from_env`]) with
//! defaults tuned for a live-race audience: a short reconnect schedule, a
//! 30 second heartbeat, and debounce windows long enough to hide a quick
//! network blip.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::backoff::ReconnectPlan;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:3000/ws/chat";
pub const DEFAULT_TOKEN_PARAM: &str = "token";
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;
pub const DEFAULT_SERVER_ERROR_DEBOUNCE_MS: u64 = 1_000;
pub const DEFAULT_TRANSIENT_ERROR_DEBOUNCE_MS: u64 = 5_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid chat endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("chat endpoint must use ws:// or wss://, got `{0}`")]
    UnsupportedScheme(String),

    #[error("chat endpoint `{0}` cannot carry a channel path")]
    CannotBeABase(String),

    #[error("invalid value for {key}: `{value}`")]
    InvalidValue { key: &'static str, value: String },
}

/// Connection manager settings.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base websocket URL; the channel id is appended as the last path segment
    pub endpoint: Url,
    /// Query parameter name carrying the auth token
    pub token_param: String,
    /// Interval between keepalive pings while connected
    pub heartbeat_interval: Duration,
    /// Reconnect delays, indexed by attempt number
    pub reconnect: ReconnectPlan,
    /// Debounce applied to server-reported `error` frames
    pub server_error_debounce: Duration,
    /// Debounce applied to "connection lost" while reconnecting
    pub transient_error_debounce: Duration,
}

impl ChatConfig {
    /// Create a configuration with default timings for the given endpoint.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            reconnect: ReconnectPlan::default(),
            server_error_debounce: Duration::from_millis(DEFAULT_SERVER_ERROR_DEBOUNCE_MS),
            transient_error_debounce: Duration::from_millis(DEFAULT_TRANSIENT_ERROR_DEBOUNCE_MS),
        })
    }

    /// Load configuration from `RACECHAT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("RACECHAT_WS_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let mut config = Self::new(&endpoint)?;

        if let Some(param) = lookup("RACECHAT_TOKEN_PARAM") {
            if param.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "RACECHAT_TOKEN_PARAM",
                    value: param,
                });
            }
            config.token_param = param;
        }
        if let Some(value) = lookup("RACECHAT_HEARTBEAT_SECS") {
            config.heartbeat_interval =
                Duration::from_secs(parse_positive("RACECHAT_HEARTBEAT_SECS", &value)?);
        }
        if let Some(value) = lookup("RACECHAT_RECONNECT_DELAYS_MS") {
            config.reconnect = parse_schedule(&value)?;
        }
        if let Some(value) = lookup("RACECHAT_SERVER_ERROR_DEBOUNCE_MS") {
            config.server_error_debounce =
                Duration::from_millis(parse_u64("RACECHAT_SERVER_ERROR_DEBOUNCE_MS", &value)?);
        }
        if let Some(value) = lookup("RACECHAT_TRANSIENT_ERROR_DEBOUNCE_MS") {
            config.transient_error_debounce =
                Duration::from_millis(parse_u64("RACECHAT_TRANSIENT_ERROR_DEBOUNCE_MS", &value)?);
        }

        Ok(config)
    }

    /// Build the connection URL for a channel, attaching the token if present.
    pub fn endpoint_for(&self, channel_id: &str, token: Option<&str>) -> Result<Url, ConfigError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigError::CannotBeABase(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(channel_id);
        if let Some(token) = token {
            url.query_pairs_mut().append_pair(&self.token_param, token);
        }
        Ok(url)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::CannotBeABase(raw.to_string()));
    }
    Ok(url)
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_u64(key, value)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_schedule(value: &str) -> Result<ReconnectPlan, ConfigError> {
    let delays = value
        .split(',')
        .map(|part| parse_u64("RACECHAT_RECONNECT_DELAYS_MS", part).map(Duration::from_millis))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReconnectPlan::new(delays))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = ChatConfig::from_lookup(lookup(&[])).expect("defaults are valid");

        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.token_param, "token");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect, ReconnectPlan::default());
        assert_eq!(config.server_error_debounce, Duration::from_secs(1));
        assert_eq!(config.transient_error_debounce, Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides() {
        let config = ChatConfig::from_lookup(lookup(&[
            ("RACECHAT_WS_URL", "wss://chat.example.com/live/"),
            ("RACECHAT_TOKEN_PARAM", "access_token"),
            ("RACECHAT_HEARTBEAT_SECS", "10"),
            ("RACECHAT_RECONNECT_DELAYS_MS", "500, 1500,4000"),
            ("RACECHAT_SERVER_ERROR_DEBOUNCE_MS", "0"),
        ]))
        .expect("valid overrides");

        assert_eq!(config.endpoint.as_str(), "wss://chat.example.com/live/");
        assert_eq!(config.token_param, "access_token");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.reconnect.len(), 3);
        assert_eq!(config.reconnect.delay(1), Some(Duration::from_millis(1500)));
        assert_eq!(config.server_error_debounce, Duration::ZERO);
    }

    #[test]
    fn test_rejects_http_scheme() {
        let err = ChatConfig::new("https://chat.example.com").expect_err("http is not a socket");

        assert!(matches!(err, ConfigError::UnsupportedScheme(ref s) if s == "https"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = ChatConfig::from_lookup(lookup(&[("RACECHAT_HEARTBEAT_SECS", "0")]))
            .expect_err("zero heartbeat");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "RACECHAT_HEARTBEAT_SECS",
                ..
            }
        ));

        let err = ChatConfig::from_lookup(lookup(&[("RACECHAT_RECONNECT_DELAYS_MS", "1000,,2000")]))
            .expect_err("empty entry");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_endpoint_for_channel_and_token() {
        let config = ChatConfig::new("wss://chat.example.com/ws/chat").expect("valid");

        let url = config
            .endpoint_for("race 42", Some("abc&def"))
            .expect("url");

        assert_eq!(
            url.as_str(),
            "wss://chat.example.com/ws/chat/race%2042?token=abc%26def"
        );
    }

    #[test]
    fn test_endpoint_for_anonymous_viewer() {
        let config = ChatConfig::new("ws://localhost:3000/ws/chat/").expect("valid");

        let url = config.endpoint_for("race-42", None).expect("url");

        assert_eq!(url.as_str(), "ws://localhost:3000/ws/chat/race-42");
    }
}
