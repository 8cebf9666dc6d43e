use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FetchError, Result};

static CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"Charset=(.*)$").unwrap());

static CHARSET_REGEX_LENIENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)charset=(.*)$").unwrap());

/// Extract a charset name from a Content-Type value.
///
/// Only the exact `Charset=` spelling is matched, and everything after it up
/// to the end of the value is captured. Returns `None` when there is no
/// match, in which case the caller keeps its current charset.
///
/// # Examples
///
/// ```
/// use http_fetch::detect_charset;
///
/// assert_eq!(detect_charset("text/html; Charset=gb2312"), Some("gb2312"));
/// assert_eq!(detect_charset("text/html"), None);
/// ```
pub fn detect_charset(content_type: &str) -> Option<&str> { capture(&CHARSET_REGEX, content_type) }

/// Like [`detect_charset`], but matches `charset=` in any letter case.
pub fn detect_charset_lenient(content_type: &str) -> Option<&str> {
    capture(&CHARSET_REGEX_LENIENT, content_type)
}

fn capture<'a>(regex: &Regex, content_type: &'a str) -> Option<&'a str> {
    regex.captures(content_type).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Name of the codec that serves `charset`.
///
/// `gb2312` is decoded with `gbk`, its practical superset.
pub fn codec_name(charset: &str) -> &str {
    if charset == "gb2312" { "gbk" } else { charset }
}

/// Resolve a charset name to a decoder.
///
/// # Errors
///
/// Returns [`FetchError::CharsetConversion`] when no encoding is known under
/// that name.
pub fn resolve_encoding(charset: &str) -> Result<&'static Encoding> {
    let codec = codec_name(charset);
    Encoding::for_label(codec.as_bytes())
        .ok_or_else(|| FetchError::CharsetConversion(format!("unknown encoding '{charset}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_exact_spelling() {
        assert_eq!(detect_charset("text/html; Charset=gb2312"), Some("gb2312"));
        assert_eq!(detect_charset("text/html;Charset=utf-8"), Some("utf-8"));
    }

    #[test]
    fn captures_to_end_of_value() {
        assert_eq!(detect_charset("text/html; Charset=utf-8; q=1"), Some("utf-8; q=1"));
    }

    #[test]
    fn no_match_leaves_none() {
        assert_eq!(detect_charset("text/html"), None);
        assert_eq!(detect_charset(""), None);
    }

    #[test]
    fn lowercase_needs_lenient_mode() {
        assert_eq!(detect_charset("text/html; charset=utf-8"), None);
        assert_eq!(detect_charset_lenient("text/html; charset=utf-8"), Some("utf-8"));
        assert_eq!(detect_charset_lenient("text/html; CHARSET=gbk"), Some("gbk"));
    }

    #[test]
    fn gb2312_uses_gbk() {
        assert_eq!(codec_name("gb2312"), "gbk");
        assert_eq!(codec_name("utf8"), "utf8");
        assert_eq!(resolve_encoding("gb2312").unwrap(), encoding_rs::GBK);
    }

    #[test]
    fn resolves_common_labels() {
        assert_eq!(resolve_encoding("utf8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("UTF-8").unwrap(), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("gbk").unwrap(), encoding_rs::GBK);
        assert_eq!(resolve_encoding("shift_jis").unwrap(), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        let err = resolve_encoding("no-such-charset").unwrap_err();
        assert!(matches!(err, FetchError::CharsetConversion(_)));
    }
}
