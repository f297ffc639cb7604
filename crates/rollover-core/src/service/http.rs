use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::cookie::Cookie;
use crate::error::RolloverError;
use crate::session::{ManagedSession, SessionStorage};

/// Shared application state for the HTTP API.
pub struct AppState {
    pub config: Config,
    pub cookie: Cookie,
    pub storage: Arc<dyn SessionStorage>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cookie = config.session.cookie.build();
        let storage = config.session.create_storage();
        Self {
            config,
            cookie,
            storage,
        }
    }

    /// Load the session for a request using the configured rolling mode.
    pub async fn session(&self, headers: &HeaderMap) -> Result<ManagedSession, AppError> {
        Ok(ManagedSession::create(
            headers,
            &self.cookie,
            self.storage.clone(),
            self.config.session.rolling,
        )
        .await?)
    }
}

/// Error returned by handlers; session failures become a 500.
#[derive(Debug)]
pub struct AppError(RolloverError);

impl From<RolloverError> for AppError {
    fn from(e: RolloverError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Session error: {}", self.0);
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[derive(Serialize)]
struct ViewsResponse {
    views: u64,
}

#[derive(Deserialize)]
struct FlashRequest {
    message: String,
}

#[derive(Serialize)]
struct FlashResponse {
    message: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Build the router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_views))
        .route("/flash", get(handle_read_flash).post(handle_set_flash))
        .route("/logout", post(handle_logout))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Count page views in the session.
async fn handle_views(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut session = state.session(&headers).await?;
    let views = session.get("views").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
    session.set("views", views);

    let mut response = Json(ViewsResponse { views }).into_response();
    session.finalize_response(&mut response).await?;
    Ok(response)
}

async fn handle_set_flash(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<FlashRequest>,
) -> Result<Response, AppError> {
    let mut session = state.session(&headers).await?;
    session.flash("message", req.message);

    let mut response = StatusCode::NO_CONTENT.into_response();
    session.finalize_response(&mut response).await?;
    Ok(response)
}

async fn handle_read_flash(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut session = state.session(&headers).await?;
    let message = session
        .get("message")
        .and_then(|v| v.as_str().map(str::to_string));

    let mut response = Json(FlashResponse { message }).into_response();
    session.finalize_response(&mut response).await?;
    Ok(response)
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut session = state.session(&headers).await?;
    session.destroy();

    let mut response = StatusCode::NO_CONTENT.into_response();
    session.finalize_response(&mut response).await?;
    Ok(response)
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Start the HTTP server on the given address.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(rolling: bool) -> Arc<AppState> {
        let mut config = Config::default();
        config.session.cookie.secrets = vec!["test-secret".to_string()];
        config.session.rolling = rolling;
        Arc::new(AppState::new(config))
    }

    fn session_cookie(res: &Response) -> Option<String> {
        res.headers()
            .get(SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_views_counter() {
        let app = create_router(state(false));

        let res = app.clone().oneshot(get_req("/", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res).expect("first visit sets cookie");
        assert_eq!(body_json(res).await["views"], 1);

        let res = app.oneshot(get_req("/", Some(&cookie))).await.unwrap();
        assert!(session_cookie(&res).is_some());
        assert_eq!(body_json(res).await["views"], 2);
    }

    #[tokio::test]
    async fn test_health_sets_no_cookie() {
        let app = create_router(state(true));
        let res = app.oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_flash_roundtrip() {
        let app = create_router(state(false));

        let req = Request::builder()
            .method("POST")
            .uri("/flash")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"hello"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let cookie = session_cookie(&res).unwrap();

        let res = app.clone().oneshot(get_req("/flash", Some(&cookie))).await.unwrap();
        let cleared = res
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert_eq!(body_json(res).await["message"], "hello");

        let res = app.oneshot(get_req("/flash", None)).await.unwrap();
        assert!(res.headers().get(SET_COOKIE).is_none());
        assert!(body_json(res).await["message"].is_null());
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = create_router(state(false));
        let res = app.clone().oneshot(get_req("/", None)).await.unwrap();
        let cookie = session_cookie(&res).unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/logout")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(session_cookie(&res).as_deref(), Some("__session="));
    }
}
