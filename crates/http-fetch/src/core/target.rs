use url::Url;

use crate::data::{RequestOptions, RequestSnapshot, Scheme};
use crate::error::{FetchError, Result};

/// Parts of a fetch URL that override the option template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme:   Scheme,
    pub hostname: String,
    /// Port written in the URL, if any.
    pub port:     Option<u16>,
    /// Path including the query string.
    pub path:     String,
}

/// Parse a fetch URL.
///
/// The scheme is checked before anything else so that an unsupported
/// protocol fails fast. A port that is not a valid number, or is `0`, is
/// dropped and treated as absent.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] if the URL cannot be parsed or has no host
/// - [`FetchError::UnsupportedProtocol`] if the scheme is not `http`/`https`
pub fn resolve_target(raw: &str) -> Result<Target> {
    let raw = raw.trim_matches(|c: char| c <= ' ');
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::InvalidPort) => Url::parse(&without_port(raw))
            .map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?,
        Err(e) => return Err(FetchError::InvalidUrl(format!("{raw}: {e}"))),
    };

    let scheme = Scheme::from_scheme(url.scheme())
        .ok_or_else(|| FetchError::UnsupportedProtocol(format!("{}:", url.scheme())))?;

    let hostname = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(FetchError::InvalidUrl(format!("{raw}: missing host"))),
    };

    // `Url` drops ports equal to the scheme default, so look at the raw text.
    let port = url.port().or_else(|| explicit_port(raw)).filter(|&port| port != 0);

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(Target { scheme, hostname, port, path })
}

/// Combine merged options with a parsed target into a request snapshot.
///
/// URL-derived host, port and path always win. Without a port in the URL the
/// option port is used, and without either the scheme's default port.
pub fn snapshot(options: &RequestOptions, target: Target, body: Option<String>) -> RequestSnapshot {
    let port = match (target.port, options.port()) {
        (Some(port), _) => port,
        (None, Some(port)) => port,
        (None, None) => target.scheme.default_port(),
    };

    RequestSnapshot {
        scheme: target.scheme,
        hostname: target.hostname,
        port,
        path: target.path,
        method: options.method().to_string(),
        headers: options.headers(),
        body,
    }
}

/// Byte range of the authority; only a `//` right after the scheme opens one.
fn authority_span(raw: &str) -> Option<(usize, usize)> {
    let colon = raw.find(':')?;
    if !raw[colon..].starts_with("://") {
        return None;
    }
    let start = colon + 3;
    let end = raw[start..].find(['/', '?', '#']).map_or(raw.len(), |i| start + i);
    Some((start, end))
}

/// Split an authority into everything before the port and the port text.
fn split_port(authority: &str) -> (&str, Option<&str>) {
    let host_start = authority.rfind('@').map_or(0, |i| i + 1);
    // IPv6 literals contain colons; only look after the closing bracket.
    let search_from = host_start + authority[host_start..].rfind(']').unwrap_or(0);
    match authority[search_from..].rfind(':') {
        Some(i) => {
            let colon = search_from + i;
            (&authority[..colon], Some(&authority[colon + 1..]))
        }
        None => (authority, None),
    }
}

fn explicit_port(raw: &str) -> Option<u16> {
    let (start, end) = authority_span(raw)?;
    split_port(&raw[start..end]).1?.parse().ok()
}

fn without_port(raw: &str) -> String {
    match authority_span(raw) {
        Some((start, end)) => {
            let (host, _) = split_port(&raw[start..end]);
            format!("{}{}{}", &raw[..start], host, &raw[end..])
        }
        None => raw.to_string(),
    }
}
