//! HTTP front door for the callscreen engine
//!
//! Thin axum surface over [`ScreeningEngine`]: the inbound call-arrival
//! webhook, call-status queries for polling clients, the external hangup
//! signal, and health/stats endpoints. Identity is accepted as an opaque
//! token (`Authorization: Bearer` or `X-API-Key`) and recorded on the call
//! record; verifying it belongs to the identity service in front of this
//! gateway, not here.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use callscreen_core::{
    CallId, CallSnapshot, IncomingCallEvent, ScreenError, ScreenerStats, ScreeningEngine,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScreeningEngine>,
}

/// Build the gateway router over a screening engine
pub fn build_router(engine: Arc<ScreeningEngine>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/call/incoming", post(incoming_call))
        .route("/call/:call_id/status", get(call_status))
        .route("/call/:call_id/hangup", post(hangup_call))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Error wrapper mapping engine errors onto HTTP statuses
pub struct ApiError(ScreenError);

impl From<ScreenError> for ApiError {
    fn from(e: ScreenError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            ScreenError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            ScreenError::AlreadyExists(_) => (StatusCode::CONFLICT, self.0.to_string()),
            ScreenError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ScreenError::ResourceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            // Anything else is internal; the detail stays out of the response
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal screening error".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Disposition summary returned once a screened call terminates
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub status: String,
    pub call_id: String,
    pub action: Option<String>,
    pub message: Option<String>,
}

impl From<CallSnapshot> for CallResponse {
    fn from(snapshot: CallSnapshot) -> Self {
        Self {
            status: snapshot.status.to_string(),
            action: snapshot
                .action_result
                .as_ref()
                .map(|result| result.action.to_string()),
            message: snapshot
                .action_result
                .as_ref()
                .map(|result| result.detail.clone())
                .or_else(|| snapshot.failure_reason.clone()),
            call_id: snapshot.call_id,
        }
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "callscreen",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "components": {
            "engine": true,
            "tracked_calls": state.engine.registry().len(),
            "active_calls": state.engine.registry().active_count(),
        },
    }))
}

async fn stats(State(state): State<AppState>) -> Json<ScreenerStats> {
    Json(state.engine.stats())
}

/// Inbound call-arrival event. Screens the call to its terminal
/// disposition and reports it, the way a signaling webhook expects.
async fn incoming_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<IncomingCallEvent>,
) -> Result<Json<CallResponse>, ApiError> {
    let owner = extract_identity(&headers);
    let snapshot = state.engine.handle_call(event, owner).await?;
    Ok(Json(snapshot.into()))
}

async fn call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallSnapshot>, ApiError> {
    let snapshot = state.engine.call_snapshot(&CallId::from(call_id))?;
    Ok(Json(snapshot))
}

/// External "call ended" signal: the pipeline aborts cooperatively.
async fn hangup_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<CallSnapshot>, ApiError> {
    let snapshot = state.engine.end_call(&CallId::from(call_id))?;
    Ok(Json(snapshot))
}

/// Opaque caller identity from `Authorization: Bearer` or `X-API-Key`
fn extract_identity(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
    }

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::Body;

    use async_trait::async_trait;
    use axum::http::Request;
    use tower::ServiceExt;

    use callscreen_adapters::{DiskRecordingStore, SimulatedTelephony};
    use callscreen_core::ports::{AudioRef, ReasoningPort, TranscriptionPort};
    use callscreen_core::{ReasoningContext, Result as CoreResult, ScreenConfig};

    struct StubTranscriber;

    #[async_trait]
    impl TranscriptionPort for StubTranscriber {
        async fn transcribe(
            &self,
            _audio: &AudioRef,
            _language_hint: Option<&str>,
        ) -> CoreResult<String> {
            Ok("please take a message".to_string())
        }
    }

    struct StubReasoner;

    #[async_trait]
    impl ReasoningPort for StubReasoner {
        async fn recommend(&self, _context: &ReasoningContext) -> CoreResult<String> {
            Ok(r#"{"action": "voicemail"}"#.to_string())
        }
    }

    fn test_app() -> Router {
        let base = std::env::temp_dir().join(format!("callscreen-gw-{}", std::process::id()));

        let mut config = ScreenConfig::default();
        config.capture.capture_window = Duration::from_millis(10);
        config.actions.voicemail_max_duration = Duration::from_millis(10);

        let telephony = Arc::new(SimulatedTelephony::new(base.join("spool")).unwrap());
        let store = Arc::new(DiskRecordingStore::new(base.join("recordings"), 0).unwrap());
        let engine = Arc::new(
            ScreeningEngine::new(config, telephony, Arc::new(StubTranscriber),
                Arc::new(StubReasoner), store)
            .unwrap(),
        );
        build_router(engine)
    }

    fn call_body(id: &str) -> Body {
        Body::from(
            serde_json::to_vec(&json!({
                "call_id": id,
                "caller_number": "+15550100",
                "called_number": "+15550200",
                "channel": "SIP/trunk-00000001",
            }))
            .unwrap(),
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_service_info() {
        let app = test_app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["service"], "callscreen");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_incoming_call_reaches_a_disposition() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call/incoming")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer token-abc")
                    .body(call_body("gw-1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["call_id"], "gw-1");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["action"], "voicemail");

        // The record is queryable afterwards, tagged with the opaque identity
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/call/gw-1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["owner_user_id"], "token-abc");
        assert!(body["action_result"]["artifact_ref"].is_string());
    }

    #[tokio::test]
    async fn test_duplicate_call_id_conflicts() {
        let app = test_app();

        let first = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call/incoming")
                    .header("content-type", "application/json")
                    .body(call_body("gw-dup"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call/incoming")
                    .header("content-type", "application/json")
                    .body(call_body("gw-dup"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_call_status_is_404() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/call/nope/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hangup_unknown_call_is_404() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call/nope/hangup")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_client_error() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call/incoming")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"caller_number": "+15550100"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[test]
    fn test_identity_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_identity(&headers), None);

        headers.insert("x-api-key", "key-1".parse().unwrap());
        assert_eq!(extract_identity(&headers).as_deref(), Some("key-1"));

        // Bearer token wins over the API key
        headers.insert(AUTHORIZATION, "Bearer tok-2".parse().unwrap());
        assert_eq!(extract_identity(&headers).as_deref(), Some("tok-2"));

        // A blank bearer token falls back to the API key
        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_identity(&headers).as_deref(), Some("key-1"));
    }
}
