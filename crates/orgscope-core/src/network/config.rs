use serde::{Deserialize, Serialize};

/// Timeouts and identity used for every outbound request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Seconds allowed for the TCP/TLS handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,

    /// Seconds allowed for a whole request, body included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,

    /// Fixed user agent; a browser user agent is picked at random when unset
    #[serde(default)]
    pub user_agent: Option<String>,
}

const fn default_connect_timeout() -> u32 {
    5
}

const fn default_request_timeout() -> u32 {
    10
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    /// Apply `ORGSCOPE_TIMEOUT` and `ORGSCOPE_USER_AGENT` overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(timeout) = std::env::var("ORGSCOPE_TIMEOUT")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|t| *t > 0)
        {
            config.request_timeout_seconds = timeout;
        }

        if let Ok(ua) = std::env::var("ORGSCOPE_USER_AGENT") {
            if !ua.trim().is_empty() {
                config.user_agent = Some(ua);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.request_timeout_seconds, 10);
        assert!(config.connect_timeout_seconds <= config.request_timeout_seconds);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"request_timeout_seconds": 30}"#).unwrap();
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.connect_timeout_seconds, 5);
    }
}
