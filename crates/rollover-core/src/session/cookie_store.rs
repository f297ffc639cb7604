use async_trait::async_trait;
use serde_json::Value;

use crate::cookie::{Cookie, CookieOptions};
use crate::error::{Result, SessionError};
use crate::session::store::SessionStorage;
use crate::session::Session;

/// Browsers reject cookies longer than this.
pub const MAX_COOKIE_LENGTH: usize = 4096;

/// Session storage that keeps all session data in the cookie itself.
///
/// No server-side state: sessions have an empty id and are only as large as
/// a browser allows a cookie to be.
#[derive(Debug, Clone)]
pub struct CookieSessionStorage {
    cookie: Cookie,
}

impl CookieSessionStorage {
    pub fn new(cookie: Cookie) -> Self {
        if !cookie.is_signed() {
            tracing::warn!(
                "Session cookie {} is not signed; clients can forge session data",
                cookie.name()
            );
        }
        Self { cookie }
    }

    pub fn cookie(&self) -> &Cookie {
        &self.cookie
    }
}

#[async_trait]
impl SessionStorage for CookieSessionStorage {
    async fn get_session(&self, cookie_header: Option<&str>) -> Result<Session> {
        let value = self.cookie.parse(cookie_header)?;
        Ok(Session::from_value("", value))
    }

    async fn commit_session(
        &self,
        session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String> {
        let serialized = self.cookie.serialize(&session.to_value(), options)?;
        if serialized.len() > MAX_COOKIE_LENGTH {
            return Err(SessionError::CookieTooLarge(serialized.len()).into());
        }
        Ok(serialized)
    }

    async fn destroy_session(
        &self,
        _session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String> {
        let expired = options.unwrap_or(self.cookie.options()).expired();
        Ok(self.cookie.serialize(&Value::String(String::new()), Some(&expired))?)
    }
}
