use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_CHARSET: &str = "utf8";

/// Client-wide settings that are not part of the request option tree.
///
/// # Examples
///
/// ```
/// use http_fetch::FetchConfig;
/// use std::time::Duration;
///
/// let config = FetchConfig::default()
///     .charset("gbk")
///     .timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Charset used when a response does not declare one.
    ///
    /// Default: `utf8`
    pub charset: String,

    /// Upper bound for a whole fetch, from connect to end of body.
    ///
    /// Default: None (a fetch may wait indefinitely)
    pub timeout_secs: Option<u64>,

    /// Match `charset=` in Content-Type regardless of case.
    ///
    /// Only the exact `Charset=` spelling is recognized by default.
    ///
    /// Default: false
    pub lenient_charset: bool,

    /// User-Agent applied to the option template when the client is built.
    ///
    /// Default: None (keeps `http-fetch`)
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            charset:         DEFAULT_CHARSET.to_string(),
            timeout_secs:    None,
            lenient_charset: false,
            user_agent:      None,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    #[must_use]
    pub fn lenient_charset(mut self, lenient: bool) -> Self {
        self.lenient_charset = lenient;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout_duration(&self) -> Option<Duration> { self.timeout_secs.map(Duration::from_secs) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.timeout_duration(), None);
        assert!(!config.lenient_charset);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: FetchConfig = serde_json::from_str(r#"{ "timeout_secs": 5 }"#).unwrap();
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.timeout_duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn builder() {
        let config = FetchConfig::default()
            .charset("gbk")
            .lenient_charset(true)
            .user_agent("bot/1.0")
            .timeout(Duration::from_secs(3));
        assert_eq!(config.charset, "gbk");
        assert!(config.lenient_charset);
        assert_eq!(config.user_agent.as_deref(), Some("bot/1.0"));
        assert_eq!(config.timeout_secs, Some(3));
    }
}
