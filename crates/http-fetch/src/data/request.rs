use std::collections::BTreeMap;
use std::fmt;

/// URL schemes the client can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Exact, case-sensitive match on a URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Immutable view of one request, taken when a fetch starts.
///
/// The client's own options are only a template; every fetch works on a
/// snapshot, so concurrent fetches never observe each other's settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub scheme:   Scheme,
    pub hostname: String,
    pub port:     u16,
    /// Path including the query string.
    pub path:     String,
    pub method:   String,
    pub headers:  BTreeMap<String, String>,
    /// Serialized request body, written before the request is finalized.
    pub body:     Option<String>,
}

impl RequestSnapshot {
    /// Absolute URL the transport should connect to.
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.hostname, self.port, self.path)
    }
}
