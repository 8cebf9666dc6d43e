use std::collections::BTreeMap;
use std::fmt;

use crate::core::deep_merge;

pub const HOSTNAME: &str = "hostname";
pub const PORT: &str = "port";
pub const PATH: &str = "path";
pub const METHOD: &str = "method";
pub const HEADERS: &str = "headers";

pub const DEFAULT_PATH: &str = "/";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_USER_AGENT: &str = "http-fetch";

/// Header template cloned into every new client.
///
/// `Accept-Encoding: gzip,default` is not a valid negotiation list, but it is
/// what existing deployments send and servers answer it with plain or gzip
/// bodies, both of which the decode pipeline handles.
pub const DEFAULT_HEADERS: [(&str, &str); 8] = [
    ("Accept", "text/html,application/xhtml+xml"),
    ("Accept-Encoding", "gzip,default"),
    ("Accept-Language", "zh-CN,zh;q=0.8,en;q=0.6"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("Cookie", ""),
    ("Pragma", "no-cache"),
    ("User-Agent", DEFAULT_USER_AGENT),
];

/// Nested option tree with deterministic key order.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// A single value in an option tree.
///
/// Whether a structured value takes part in deep merging is decided when the
/// value is built: [`OptionValue::Map`] is merged key by key, while
/// [`OptionValue::Opaque`] is treated like a scalar and replaces whatever it
/// is merged over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    List(Vec<OptionValue>),
    /// Plain mapping, merged recursively.
    Map(OptionMap),
    /// Structured value that is not a plain mapping.
    Opaque(OptionMap),
}

impl OptionValue {
    /// Wrap a mapping so that merging replaces it wholesale.
    pub fn opaque(map: OptionMap) -> Self { OptionValue::Opaque(map) }

    pub fn is_plain(&self) -> bool { matches!(self, OptionValue::Map(_)) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Entries of a structured value, plain or not.
    pub fn entries(&self) -> Option<&OptionMap> {
        match self {
            OptionValue::Map(map) | OptionValue::Opaque(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::Integer(n) => write!(f, "{n}"),
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            OptionValue::Map(map) | OptionValue::Opaque(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self { OptionValue::Text(s.to_string()) }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self { OptionValue::Text(s) }
}

impl From<&String> for OptionValue {
    fn from(s: &String) -> Self { OptionValue::Text(s.clone()) }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self { OptionValue::Integer(n) }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self { OptionValue::Integer(n.into()) }
}

impl From<u16> for OptionValue {
    fn from(n: u16) -> Self { OptionValue::Integer(n.into()) }
}

impl From<u32> for OptionValue {
    fn from(n: u32) -> Self { OptionValue::Integer(n.into()) }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self { OptionValue::Bool(b) }
}

impl From<OptionMap> for OptionValue {
    fn from(map: OptionMap) -> Self { OptionValue::Map(map) }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(items: Vec<T>) -> Self { OptionValue::List(items.into_iter().map(Into::into).collect()) }
}

/// JSON objects become plain mappings. `null` becomes empty text, and numbers
/// that do not fit an `i64` keep their JSON rendering as text.
impl From<serde_json::Value> for OptionValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => OptionValue::Text(String::new()),
            Value::Bool(b) => OptionValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => OptionValue::Integer(i),
                None => OptionValue::Text(n.to_string()),
            },
            Value::String(s) => OptionValue::Text(s),
            Value::Array(items) => OptionValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => OptionValue::Map(
                fields.into_iter().map(|(key, value)| (key, value.into())).collect(),
            ),
        }
    }
}

/// Build an [`OptionMap`] from key/value pairs.
pub fn option_map<I, K, V>(pairs: I) -> OptionMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<OptionValue>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Convert a JSON object into an [`OptionMap`]. Non-object values give an
/// empty map.
pub fn options_from_json(value: serde_json::Value) -> OptionMap {
    match OptionValue::from(value) {
        OptionValue::Map(map) => map,
        _ => OptionMap::new(),
    }
}

pub fn default_headers() -> OptionMap { option_map(DEFAULT_HEADERS) }

/// Request settings held by a client as a mergeable option tree.
///
/// # Examples
///
/// ```
/// use http_fetch::{option_map, OptionValue, RequestOptions};
///
/// let mut options = RequestOptions::default();
/// options.merge(option_map([(
///     "headers",
///     OptionValue::from(option_map([("User-Agent", "X")])),
/// )]));
///
/// assert_eq!(options.header("User-Agent").as_deref(), Some("X"));
/// assert_eq!(options.header("Pragma").as_deref(), Some("no-cache"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    tree: OptionMap,
}

impl Default for RequestOptions {
    fn default() -> Self { Self::new() }
}

impl RequestOptions {
    pub fn new() -> Self {
        let tree = option_map([
            (HOSTNAME, OptionValue::from("")),
            (PATH, OptionValue::from(DEFAULT_PATH)),
            (METHOD, OptionValue::from(DEFAULT_METHOD)),
            (HEADERS, OptionValue::Map(default_headers())),
        ]);
        Self { tree }
    }

    /// Deep-merge `partial` into these options.
    pub fn merge(&mut self, partial: OptionMap) { deep_merge(&mut self.tree, partial); }

    pub fn get(&self, key: &str) -> Option<&OptionValue> { self.tree.get(key) }

    pub fn hostname(&self) -> &str { self.text(HOSTNAME).unwrap_or("") }

    /// Configured port, if it is a valid port number.
    ///
    /// The template leaves the port unset, so the scheme's default port
    /// applies until a caller provides one. Text values are accepted when
    /// they parse as a number.
    pub fn port(&self) -> Option<u16> {
        let value = self.get(PORT)?;
        match value.as_integer() {
            Some(n) => u16::try_from(n).ok(),
            None => value.as_str()?.trim().parse().ok(),
        }
    }

    pub fn path(&self) -> &str { self.text(PATH).unwrap_or(DEFAULT_PATH) }

    pub fn method(&self) -> &str {
        match self.text(METHOD) {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_METHOD,
        }
    }

    /// Header names and values, rendered as text.
    pub fn headers(&self) -> BTreeMap<String, String> {
        self.get(HEADERS)
            .and_then(OptionValue::entries)
            .map(|headers| headers.iter().map(|(k, v)| (k.clone(), v.to_string())).collect())
            .unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.get(HEADERS)
            .and_then(OptionValue::entries)
            .and_then(|headers| headers.get(name))
            .map(ToString::to_string)
    }

    fn text(&self, key: &str) -> Option<&str> { self.get(key).and_then(OptionValue::as_str) }
}
