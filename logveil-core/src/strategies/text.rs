//! Text strategies: masking and URL generalization.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{InvalidValue, ValueKind};

/// Marker written for values that are not URLs.
pub const INVALID_URL: &str = "INVALID_URL";

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<host>[^/?#\s]+)(?P<path>[^?#\s]*)")
        .expect("static URL pattern is valid")
});

/// Keeps the first `visible` characters and masks the rest.
pub fn mask(value: &str, visible: usize, mask_char: char) -> String {
    value
        .chars()
        .enumerate()
        .map(|(idx, c)| if idx < visible { c } else { mask_char })
        .collect()
}

/// Reduces a URL to `scheme://host/first-segment`.
pub fn generalize_url(value: &str) -> Result<String, InvalidValue> {
    let caps = URL_PATTERN
        .captures(value.trim())
        .ok_or_else(|| InvalidValue::new(ValueKind::Url, value))?;
    let scheme = &caps["scheme"];
    let host = &caps["host"];
    let first_segment = caps
        .name("path")
        .and_then(|p| p.as_str().split('/').nth(1))
        .unwrap_or("");
    Ok(format!("{scheme}://{host}/{first_segment}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_after_visible_prefix() {
        assert_eq!(mask("secret-host", 3, 'X'), "secXXXXXXXX");
        assert_eq!(mask("ab", 3, 'X'), "ab");
        assert_eq!(mask("héllo", 1, '*'), "h****");
    }

    #[test]
    fn keeps_scheme_host_and_first_segment() {
        assert_eq!(
            generalize_url("https://example.com/a/b/c?x=1").unwrap(),
            "https://example.com/a"
        );
        assert_eq!(generalize_url("http://10.0.0.1:8080").unwrap(), "http://10.0.0.1:8080/");
        assert_eq!(generalize_url("ftp://files.example.org/").unwrap(), "ftp://files.example.org/");
        assert!(generalize_url("not a url").is_err());
    }
}
