//! End-to-end tests for session finalization against the cookie storage.

use std::sync::Arc;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use serde_json::json;

use rollover_core::cookie::{Cookie, CookieOptions};
use rollover_core::error::{RolloverError, SessionError};
use rollover_core::session::cookie_store::CookieSessionStorage;
use rollover_core::session::{ManagedSession, SessionStorage};

const COMMITTED: &str = "__session=eyJrZXkiOiJ2YWx1ZSJ9.8ph1p%2BJgL0Hu5k0QDNaI7nI27SurTg%2BEBNC2jnN0RKA; \
                         Max-Age=600; Path=/; SameSite=Lax";
const DESTROYED: &str = "__session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax";

fn cookie() -> Cookie {
    Cookie::new(
        "__session",
        CookieOptions {
            max_age: Some(600),
            ..CookieOptions::default()
        },
    )
    .with_secrets(["s3cret"])
}

fn storage() -> Arc<dyn SessionStorage> {
    Arc::new(CookieSessionStorage::new(cookie()))
}

/// A request carrying the cookie from a `Set-Cookie` value.
fn request_with(set_cookie: &str) -> HeaderMap {
    let pair = set_cookie.split(';').next().unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(pair).unwrap());
    headers
}

fn set_cookies(response: &HeaderMap) -> Vec<String> {
    response
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

async fn create(request: &HeaderMap, rolling: bool) -> ManagedSession {
    ManagedSession::create(request, &cookie(), storage(), rolling)
        .await
        .unwrap()
}

async fn finalize(session: &ManagedSession) -> Vec<String> {
    let mut response = HeaderMap::new();
    session.finalize(&mut response).await.unwrap();
    set_cookies(&response)
}

#[tokio::test]
async fn test_fresh_session_without_changes_sets_nothing() {
    let session = create(&HeaderMap::new(), false).await;
    assert!(!session.is_existing());
    assert!(finalize(&session).await.is_empty());
}

#[tokio::test]
async fn test_fresh_rolling_session_without_changes_sets_nothing() {
    let session = create(&HeaderMap::new(), true).await;
    assert!(finalize(&session).await.is_empty());
}

#[tokio::test]
async fn test_set_commits_signed_cookie() {
    let mut session = create(&HeaderMap::new(), false).await;
    session.set("key", "value");
    assert_eq!(finalize(&session).await, vec![COMMITTED.to_string()]);
}

#[tokio::test]
async fn test_committed_cookie_decodes_to_data() {
    let mut session = create(&HeaderMap::new(), false).await;
    session.set("key", "value");
    let headers = finalize(&session).await;

    let parsed = cookie().parse(Some(headers[0].split(';').next().unwrap())).unwrap();
    assert_eq!(parsed, Some(json!({"key": "value"})));
}

#[tokio::test]
async fn test_existing_session_unchanged_sets_nothing() {
    let mut session = create(&request_with(COMMITTED), false).await;
    assert!(session.is_existing());
    assert_eq!(session.get("key"), Some(json!("value")));
    assert!(finalize(&session).await.is_empty());
}

#[tokio::test]
async fn test_rolling_refreshes_existing_session() {
    let session = create(&request_with(COMMITTED), true).await;
    assert_eq!(finalize(&session).await, vec![COMMITTED.to_string()]);
}

#[tokio::test]
async fn test_adding_key_to_existing_session() {
    let mut session = create(&request_with(COMMITTED), false).await;
    session.set("newKey", "newValue");
    let headers = finalize(&session).await;
    assert_eq!(headers.len(), 1);

    let parsed = cookie().parse(Some(headers[0].split(';').next().unwrap())).unwrap();
    assert_eq!(parsed, Some(json!({"key": "value", "newKey": "newValue"})));
}

#[tokio::test]
async fn test_unset_last_key_destroys() {
    let mut session = create(&request_with(COMMITTED), false).await;
    session.unset("key");
    assert_eq!(finalize(&session).await, vec![DESTROYED.to_string()]);
}

#[tokio::test]
async fn test_destroy_clears_cookie_regardless_of_rolling() {
    for rolling in [false, true] {
        let mut session = create(&request_with(COMMITTED), rolling).await;
        session.destroy();
        assert!(session.data().is_empty());
        assert_eq!(finalize(&session).await, vec![DESTROYED.to_string()]);
    }
}

#[tokio::test]
async fn test_rolling_existing_but_emptied_cookie_destroys() {
    // A signed-but-empty payload counts as an existing session.
    let empty = cookie().serialize(&json!({}), None).unwrap();
    let session = create(&request_with(&empty), true).await;
    assert!(session.is_existing());
    assert!(session.data().is_empty());
    assert_eq!(finalize(&session).await, vec![DESTROYED.to_string()]);
}

#[tokio::test]
async fn test_tampered_cookie_is_not_existing() {
    let forged = COMMITTED.replace("eyJrZXkiOiJ2YWx1ZSJ9", "eyJrZXkiOiJldmlsIn0=");
    let session = create(&request_with(&forged), true).await;
    assert!(!session.is_existing());
    assert!(session.data().is_empty());
    assert!(finalize(&session).await.is_empty());
}

#[tokio::test]
async fn test_flash_read_commits_removal() {
    let mut session = create(&HeaderMap::new(), false).await;
    session.flash("notice", "saved");
    let headers = finalize(&session).await;

    let mut session = create(&request_with(&headers[0]), false).await;
    assert!(session.has("notice"));
    assert_eq!(session.get("notice"), Some(json!("saved")));
    assert_eq!(finalize(&session).await, vec![DESTROYED.to_string()]);
}

#[tokio::test]
async fn test_oversized_commit_fails_without_set_cookie() {
    let mut session = create(&HeaderMap::new(), false).await;
    session.set("blob", "x".repeat(5000));

    let mut response = HeaderMap::new();
    let result = session.finalize(&mut response).await;
    assert!(matches!(
        result,
        Err(RolloverError::Session(SessionError::CookieTooLarge(_)))
    ));
    assert!(response.get(SET_COOKIE).is_none());
}
