use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{CookieOptions, SameSite};
use crate::error::CookieError;

/// Parse a `Cookie` request header into name/value pairs.
///
/// Pairs that are malformed or fail to percent-decode are skipped, the first
/// occurrence of a name wins and surrounding quotes are stripped.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for cookie in ::cookie::Cookie::split_parse_encoded(header).flatten() {
        if cookie.name().is_empty() {
            continue;
        }
        cookies
            .entry(cookie.name().to_string())
            .or_insert_with(|| cookie.value_trimmed().to_string());
    }

    cookies
}

/// Build a `Set-Cookie` header value. `value` is percent-encoded here.
pub fn serialize_set_cookie(
    name: &str,
    value: &str,
    options: &CookieOptions,
) -> Result<String, CookieError> {
    validate_name(name)?;

    let mut out = format!("{}={}", name, urlencoding::encode(value));

    if let Some(max_age) = options.max_age {
        out.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(domain) = &options.domain {
        validate_attribute("Domain", domain)?;
        out.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &options.path {
        validate_attribute("Path", path)?;
        out.push_str(&format!("; Path={path}"));
    }
    if let Some(expires) = options.expires {
        out.push_str(&format!("; Expires={}", format_http_date(&expires)));
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = options.same_site {
        out.push_str(match same_site {
            SameSite::Lax => "; SameSite=Lax",
            SameSite::Strict => "; SameSite=Strict",
            SameSite::None => "; SameSite=None",
        });
    }

    Ok(out)
}

/// Format a timestamp as an IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Cookie names must be RFC 6265 tokens.
fn validate_name(name: &str) -> Result<(), CookieError> {
    const SEPARATORS: &[char] = &[
        '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}',
    ];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(&c));
    if valid {
        Ok(())
    } else {
        Err(CookieError::InvalidName(name.to_string()))
    }
}

fn validate_attribute(attribute: &'static str, value: &str) -> Result<(), CookieError> {
    if value.chars().any(|c| c == ';' || c.is_control()) {
        return Err(CookieError::InvalidAttribute {
            attribute,
            value: value.to_string(),
        });
    }
    Ok(())
}
