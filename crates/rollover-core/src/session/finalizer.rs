//! Per-request session lifecycle.
//!
//! [`ManagedSession::create`] loads the session for a request and records a
//! fingerprint of its data. Handlers mutate it freely, then call
//! [`ManagedSession::finalize`] once with the response headers. Finalize
//! compares fingerprints and appends exactly one of:
//!
//! * nothing, when the data is unchanged (and no rolling refresh applies),
//! * a clearing `Set-Cookie`, when the data is now empty,
//! * a committing `Set-Cookie`, otherwise.

use std::sync::Arc;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Response};
use serde_json::Value;
use tracing::debug;

use crate::cookie::{is_truthy, Cookie};
use crate::error::{Result, SessionError};
use crate::session::store::SessionStorage;
use crate::session::{Session, SessionData};

/// Serialized form of session data used to detect changes.
///
/// Key order matters: the same pairs inserted in a different order produce a
/// different fingerprint.
pub fn fingerprint(data: &SessionData) -> String {
    serde_json::to_string(data).unwrap_or_default()
}

/// The raw `Cookie` header of a request. Multiple header lines are joined.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// A session loaded for one request, committed or destroyed on finalize.
pub struct ManagedSession {
    session: Session,
    storage: Arc<dyn SessionStorage>,
    before: String,
    existing_session: bool,
    rolling: bool,
}

impl ManagedSession {
    /// Load the session for a request.
    ///
    /// `cookie` only decides whether the client presented a session cookie at
    /// all; with `rolling`, such sessions are re-committed on every finalize
    /// to refresh their expiry.
    pub async fn create(
        request: &HeaderMap,
        cookie: &Cookie,
        storage: Arc<dyn SessionStorage>,
        rolling: bool,
    ) -> Result<Self> {
        let header = cookie_header(request);
        let existing_session = cookie
            .parse(header.as_deref())?
            .as_ref()
            .is_some_and(is_truthy);
        let session = storage.get_session(header.as_deref()).await?;
        let before = fingerprint(session.data());

        debug!(
            existing_session,
            rolling,
            keys = session.data().len(),
            "Loaded session"
        );

        Ok(Self {
            session,
            storage,
            before,
            existing_session,
            rolling,
        })
    }

    pub fn id(&self) -> &str {
        self.session.id()
    }

    pub fn data(&self) -> &SessionData {
        self.session.data()
    }

    /// Whether the request carried a session cookie.
    pub fn is_existing(&self) -> bool {
        self.existing_session
    }

    pub fn has(&self, name: &str) -> bool {
        self.session.has(name)
    }

    pub fn get(&mut self, name: &str) -> Option<Value> {
        self.session.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.session.set(name, value);
    }

    pub fn flash(&mut self, name: &str, value: impl Into<Value>) {
        self.session.flash(name, value);
    }

    pub fn unset(&mut self, name: &str) {
        self.session.unset(name);
    }

    /// Remove every key. The cookie is cleared when the session is finalized.
    pub fn destroy(&mut self) {
        let keys: Vec<String> = self.session.data().keys().cloned().collect();
        for key in keys {
            self.session.unset(&key);
        }
    }

    /// Append the `Set-Cookie` directive this request needs, if any.
    ///
    /// Call this exactly once, after all mutations. Every call that finds
    /// work to do appends another header.
    pub async fn finalize(&self, response: &mut HeaderMap) -> Result<()> {
        let after = fingerprint(self.session.data());

        if after == self.before && !(self.rolling && self.existing_session) {
            debug!("Session unchanged, skipping Set-Cookie");
            return Ok(());
        }

        let directive = if self.session.data().is_empty() {
            debug!(id = self.session.id(), "Destroying session");
            self.storage.destroy_session(&self.session, None).await?
        } else {
            debug!(
                id = self.session.id(),
                changed = (after != self.before),
                "Committing session"
            );
            self.storage.commit_session(&self.session, None).await?
        };

        let value = HeaderValue::from_str(&directive).map_err(SessionError::from)?;
        response.append(SET_COOKIE, value);
        Ok(())
    }

    /// [`finalize`](Self::finalize) against a full response.
    pub async fn finalize_response<B>(&self, response: &mut Response<B>) -> Result<()> {
        self.finalize(response.headers_mut()).await
    }
}
