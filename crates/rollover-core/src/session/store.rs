use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::cookie::{Cookie, CookieOptions};
use crate::error::Result;
use crate::session::{Session, SessionData};

/// Trait for session storage backends.
///
/// A storage turns a `Cookie` request header into a [`Session`] and a session
/// back into a `Set-Cookie` header value.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the session for a request. A missing or invalid cookie yields a
    /// fresh, empty session.
    async fn get_session(&self, cookie_header: Option<&str>) -> Result<Session>;

    /// Persist the session and return the `Set-Cookie` value that stores it
    /// (or its id) on the client. `options` replaces the cookie's attributes.
    async fn commit_session(
        &self,
        session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String>;

    /// Drop the session and return a `Set-Cookie` value that clears it.
    async fn destroy_session(
        &self,
        session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String>;
}

/// Server-side persistence for [`IdSessionStorage`].
#[async_trait]
pub trait SessionDataStore: Send + Sync {
    /// Store data for a new session and return its id.
    async fn create_data(
        &self,
        data: &SessionData,
        expires: Option<DateTime<Utc>>,
    ) -> Result<String>;

    /// Read a session's data. Unknown or expired ids return `None`.
    async fn read_data(&self, id: &str) -> Result<Option<SessionData>>;

    async fn update_data(
        &self,
        id: &str,
        data: &SessionData,
        expires: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn delete_data(&self, id: &str) -> Result<()>;
}

/// Session storage that keeps only the session id in the cookie and the data
/// in a [`SessionDataStore`].
pub struct IdSessionStorage<D> {
    cookie: Cookie,
    store: D,
}

impl<D: SessionDataStore> IdSessionStorage<D> {
    pub fn new(cookie: Cookie, store: D) -> Self {
        Self { cookie, store }
    }

    pub fn cookie(&self) -> &Cookie {
        &self.cookie
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    fn expires_for(&self, options: Option<&CookieOptions>) -> Option<DateTime<Utc>> {
        match options {
            Some(opts) => match opts.max_age {
                Some(secs) => Some(Utc::now() + Duration::seconds(secs)),
                None => opts.expires,
            },
            None => self.cookie.expires(),
        }
    }
}

#[async_trait]
impl<D: SessionDataStore> SessionStorage for IdSessionStorage<D> {
    async fn get_session(&self, cookie_header: Option<&str>) -> Result<Session> {
        let id = match self.cookie.parse(cookie_header)? {
            Some(Value::String(id)) => id,
            _ => String::new(),
        };
        if id.is_empty() {
            return Ok(Session::default());
        }

        let data = self.store.read_data(&id).await?.unwrap_or_default();
        Ok(Session::new(id, data))
    }

    async fn commit_session(
        &self,
        session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String> {
        let expires = self.expires_for(options);
        let id = if session.id().is_empty() {
            let id = self.store.create_data(session.data(), expires).await?;
            debug!("Created session {}", id);
            id
        } else {
            self.store
                .update_data(session.id(), session.data(), expires)
                .await?;
            session.id().to_string()
        };
        Ok(self.cookie.serialize(&Value::String(id), options)?)
    }

    async fn destroy_session(
        &self,
        session: &Session,
        options: Option<&CookieOptions>,
    ) -> Result<String> {
        if !session.id().is_empty() {
            self.store.delete_data(session.id()).await?;
            debug!("Deleted session {}", session.id());
        }
        let expired = options.unwrap_or(self.cookie.options()).expired();
        Ok(self.cookie.serialize(&Value::String(String::new()), Some(&expired))?)
    }
}
