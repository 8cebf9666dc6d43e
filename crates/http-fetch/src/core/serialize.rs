use std::fmt::Display;

pub const DEFAULT_JOINER: &str = "&";

/// Serialize key/value pairs as `k=v` joined by `&`.
///
/// Values are written verbatim; no URL-encoding is applied, so callers must
/// pre-encode reserved characters themselves.
///
/// # Examples
///
/// ```
/// use http_fetch::serialize;
///
/// assert_eq!(serialize([("a", 1), ("b", 2)]), "a=1&b=2");
/// ```
pub fn serialize<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    serialize_with(pairs, DEFAULT_JOINER)
}

/// Serialize key/value pairs as `k=v` joined by `joiner`.
///
/// # Examples
///
/// ```
/// use http_fetch::serialize_with;
///
/// assert_eq!(serialize_with([("a", 1), ("b", 2)], ";"), "a=1;b=2");
/// ```
pub fn serialize_with<I, K, V>(pairs: I, joiner: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(joiner)
}
