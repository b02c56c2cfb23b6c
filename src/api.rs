use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Extension;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::action::catalog::action_catalog;
use crate::orchestrator::{CommandOrchestrator, CommandResponse};
use crate::session::{AccessCredential, Session};

/// Shared server state. The session holds the process-wide credential
/// installed through `PUT /api/session`.
pub struct ApiState {
    pub orchestrator: CommandOrchestrator,
    pub session: RwLock<Session>,
}

impl ApiState {
    pub fn new(orchestrator: CommandOrchestrator, session: Session) -> Self {
        Self {
            orchestrator,
            session: RwLock::new(session),
        }
    }
}

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: String,
}

fn ok_json<T: Serialize>(data: T) -> impl IntoResponse {
    Json(ApiOk { ok: true, data })
}

fn err_json(status: StatusCode, msg: String) -> impl IntoResponse {
    (status, Json(ApiErr { ok: false, error: msg }))
}

/// HTTP status for a command response, keyed on its error code.
pub fn status_for(response: &CommandResponse) -> StatusCode {
    match response.error.as_deref() {
        None => StatusCode::OK,
        Some("invalid_input") => StatusCode::BAD_REQUEST,
        Some("unauthenticated") => StatusCode::UNAUTHORIZED,
        Some("not_found" | "no_tracks") => StatusCode::NOT_FOUND,
        Some("remote_action_error") => StatusCode::BAD_GATEWAY,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<AccessCredential> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        AccessCredential::new(token)
    } else {
        None
    }
}

// ── Handlers ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CommandBody {
    #[serde(default)]
    command: Option<String>,
}

/// `command` from a JSON body. A missing or malformed body counts as no command.
fn command_from(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<CommandBody>(body).ok()?.command
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: String,
}

async fn post_command(
    Extension(state): Extension<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let session = match bearer_token(&headers) {
        Some(credential) => Session::new(credential),
        None => state.session.read().clone(),
    };
    let command = command_from(&body);

    let response = state.orchestrator.handle(command.as_deref(), &session).await;
    let status = status_for(&response);
    if status.is_server_error() {
        error!(details = ?response.details, "command failed with server error");
    }
    (status, Json(response))
}

async fn post_interpret(
    Extension(state): Extension<Arc<ApiState>>,
    body: Bytes,
) -> impl IntoResponse {
    let command = command_from(&body).unwrap_or_default();
    if command.trim().is_empty() {
        return err_json(StatusCode::BAD_REQUEST, "No command provided".to_string()).into_response();
    }
    let interpretation = state.orchestrator.interpreter().resolve(&command).await;
    ok_json(interpretation).into_response()
}

async fn get_actions() -> impl IntoResponse {
    ok_json(action_catalog())
}

async fn put_session(
    Extension(state): Extension<Arc<ApiState>>,
    Json(body): Json<SessionBody>,
) -> impl IntoResponse {
    match AccessCredential::new(body.access_token) {
        Some(credential) => {
            *state.session.write() = Session::new(credential);
            info!("access credential installed");
            ok_json(true).into_response()
        }
        None => err_json(StatusCode::BAD_REQUEST, "access_token must not be empty".to_string()).into_response(),
    }
}

async fn delete_session(Extension(state): Extension<Arc<ApiState>>) -> impl IntoResponse {
    *state.session.write() = Session::anonymous();
    info!("access credential cleared");
    ok_json(true)
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/command", post(post_command))
        .route("/api/interpret", post(post_interpret))
        .route("/api/actions", get(get_actions))
        .route("/api/session", put(put_session).delete(delete_session))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

/// Bind `addr` and serve in a background task. Returns the bound address.
pub async fn start_api_server(state: Arc<ApiState>, addr: SocketAddr) -> Result<SocketAddr, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server: {e}"))?;
    let bound = listener
        .local_addr()
        .map_err(|e| format!("Failed to get API server address: {e}"))?;

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server error");
        }
    });

    Ok(bound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::executor::tests::FakeMedia;
    use crate::executor::ActionExecutor;
    use crate::interpret::Interpreter;

    async fn spawn(media: &Arc<FakeMedia>, session: Session) -> String {
        let orchestrator =
            CommandOrchestrator::new(Interpreter::heuristic_only(), ActionExecutor::new(media.clone(), "US"));
        let state = Arc::new(ApiState::new(orchestrator, session));
        let addr = start_api_server(state, SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        format!("http://{addr}")
    }

    #[test]
    fn test_status_mapping() {
        let failed = |code: &str| CommandResponse {
            success: false,
            message: None,
            action: None,
            error: Some(code.to_string()),
            details: None,
        };
        assert_eq!(status_for(&failed("invalid_input")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&failed("unauthenticated")), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&failed("no_tracks")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&failed("remote_action_error")), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&failed("unknown_action")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap().secret(), "abc");
    }

    #[tokio::test]
    async fn test_command_requires_credential_then_uses_session() {
        let media = Arc::new(FakeMedia::default());
        let base = spawn(&media, Session::anonymous()).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{base}/api/command"))
            .json(&json!({ "command": "pause" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 401);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");

        let res = client
            .put(format!("{base}/api/session"))
            .json(&json!({ "access_token": "tok" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let res = client
            .post(format!("{base}/api/command"))
            .json(&json!({ "command": "pause" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["action"], json!({ "action": "pause", "parameters": {} }));
        assert_eq!(media.calls(), ["transport:pause"]);

        client.delete(format!("{base}/api/session")).send().await.unwrap();
        let res = client
            .post(format!("{base}/api/command"))
            .json(&json!({ "command": "next" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 401);
    }

    #[tokio::test]
    async fn test_bearer_header_and_error_statuses() {
        let media = Arc::new(FakeMedia::default());
        let base = spawn(&media, Session::anonymous()).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{base}/api/command"))
            .bearer_auth("tok")
            .json(&json!({ "command": "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);

        let res = client
            .post(format!("{base}/api/command"))
            .bearer_auth("tok")
            .json(&json!({ "command": "play my Nowhere playlist" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["details"], "No playlist found for \"Nowhere\"");
    }

    #[tokio::test]
    async fn test_interpret_and_actions() {
        let media = Arc::new(FakeMedia::default());
        let base = spawn(&media, Session::anonymous()).await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{base}/api/interpret"))
            .json(&json!({ "command": "top songs by Daft Punk" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["source"], "heuristic");
        assert_eq!(body["data"]["action"]["parameters"]["artistName"], "Daft Punk");

        let body: Value = client
            .get(format!("{base}/api/actions"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 7);
        assert!(media.calls().is_empty());
    }
}
