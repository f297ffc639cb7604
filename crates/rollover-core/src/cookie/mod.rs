//! Named, optionally signed cookies carrying JSON values.
//!
//! Values are encoded as base64 of their JSON text. When the cookie has
//! secrets, the encoded value is signed with the first secret and verified
//! against all of them, which allows rotating secrets without logging
//! everyone out.

pub mod header;
pub mod sign;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::CookieError;
use sign::LENIENT;

pub use header::{format_http_date, parse_cookie_header, serialize_set_cookie};

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

/// Attributes written alongside a cookie value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime in seconds.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub same_site: Option<SameSite>,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            expires: None,
            domain: None,
            path: Some("/".to_string()),
            same_site: Some(SameSite::Lax),
            http_only: false,
            secure: false,
        }
    }
}

impl CookieOptions {
    /// The same options, rewritten to make the browser drop the cookie.
    pub fn expired(&self) -> Self {
        Self {
            max_age: None,
            expires: Some(DateTime::<Utc>::UNIX_EPOCH),
            ..self.clone()
        }
    }
}

/// A named cookie with its attributes and signing secrets.
#[derive(Debug, Clone)]
pub struct Cookie {
    name: String,
    secrets: Vec<String>,
    options: CookieOptions,
}

impl Cookie {
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            secrets: Vec::new(),
            options,
        }
    }

    /// Sign values with `secrets[0]`; accept any of them when parsing.
    pub fn with_secrets<I, S>(mut self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets = secrets.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    pub fn is_signed(&self) -> bool {
        !self.secrets.is_empty()
    }

    /// When a cookie serialized now would expire: `max_age` from now if set,
    /// otherwise the configured `expires`.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        match self.options.max_age {
            Some(secs) => Some(Utc::now() + Duration::seconds(secs)),
            None => self.options.expires,
        }
    }

    /// Read this cookie's value out of a `Cookie` request header.
    ///
    /// Returns `None` when the header is absent, does not carry this cookie,
    /// or the signature fails verification. An empty cookie parses to `""`
    /// and an undecodable payload to an empty object.
    pub fn parse(&self, header: Option<&str>) -> Result<Option<Value>, CookieError> {
        let Some(header) = header else {
            return Ok(None);
        };
        let cookies = parse_cookie_header(header);
        let Some(raw) = cookies.get(&self.name) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(Some(Value::String(String::new())));
        }
        Ok(self.decode_value(raw))
    }

    /// Produce a `Set-Cookie` header value. `options` replaces the cookie's
    /// own attributes when given.
    pub fn serialize(
        &self,
        value: &Value,
        options: Option<&CookieOptions>,
    ) -> Result<String, CookieError> {
        let encoded = match value {
            Value::String(s) if s.is_empty() => String::new(),
            _ => self.encode_value(value)?,
        };
        serialize_set_cookie(&self.name, &encoded, options.unwrap_or(&self.options))
    }

    fn encode_value(&self, value: &Value) -> Result<String, CookieError> {
        let encoded = STANDARD.encode(serde_json::to_string(value)?);
        match self.secrets.first() {
            Some(secret) => sign::sign(&encoded, secret),
            None => Ok(encoded),
        }
    }

    fn decode_value(&self, raw: &str) -> Option<Value> {
        if self.secrets.is_empty() {
            return Some(decode_data(raw));
        }
        for secret in &self.secrets {
            if let Some(unsigned) = sign::unsign(raw, secret) {
                return Some(decode_data(unsigned));
            }
        }
        debug!("Rejected cookie {} with invalid signature", self.name);
        None
    }
}

fn decode_data(encoded: &str) -> Value {
    LENIENT
        .decode(encoded)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}

/// JavaScript-style truthiness, used to decide whether a parsed cookie
/// counts as present.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
