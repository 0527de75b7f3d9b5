//! HTTP 接口：对话、历史、健康检查、智能体名片
//!
//! - POST {prefix}/chat
//! - GET / DELETE {prefix}/conversations/:id
//! - GET /health
//! - GET /.well-known/agent_card.json

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::agents::AgentCard;
use crate::config::{AppConfig, AppSection, ServerSection};
use crate::core::{TripError, TripOrchestrator, TurnMetadata, TurnRequest};
use crate::memory::ConversationHistory;

pub struct AppState {
    pub orchestrator: TripOrchestrator,
    pub app: AppSection,
}

impl AppState {
    pub fn new(orchestrator: TripOrchestrator, app: AppSection) -> Self {
        Self { orchestrator, app }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(TripOrchestrator::from_config(cfg), cfg.app.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Value,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: Value,
    pub conversation_id: String,
    pub metadata: TurnMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AgentCardDocument {
    pub name: String,
    pub version: String,
    pub agents: Vec<AgentCard>,
}

type ApiError = (StatusCode, String);

fn trip_error_status(err: &TripError) -> StatusCode {
    match err {
        TripError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn is_blank(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if is_blank(&req.message) {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }

    let turn = state
        .orchestrator
        .process_message(TurnRequest {
            message: req.message,
            conversation_id: req.conversation_id.filter(|s| !s.is_empty()),
            user_id: req.user_id,
            context: req.context,
        })
        .await;

    Ok(Json(ChatResponse {
        conversation_id: turn.metadata.conversation_id.clone(),
        response: turn.response,
        metadata: turn.metadata,
    }))
}

async fn api_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<ConversationHistory>, ApiError> {
    state
        .orchestrator
        .get_history(&id, q.limit, q.offset)
        .await
        .map(Json)
        .map_err(|e| (trip_error_status(&e), e.to_string()))
}

async fn api_end_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.orchestrator.end_conversation(&id).await {
        Ok(Json(json!({ "status": "success" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            TripError::ConversationNotFound(id).to_string(),
        ))
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": "healthy", "version": state.app.version }))
}

async fn agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCardDocument> {
    Json(AgentCardDocument {
        name: state.app.name.clone(),
        version: state.app.version.clone(),
        agents: state.orchestrator.agent_cards(),
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(list))
}

/// 规范化路由前缀："api" / "/api/" → "/api"，空或 "/" → ""
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

pub fn router(state: Arc<AppState>, server: &ServerSection) -> Router {
    let prefix = normalize_prefix(&server.api_prefix);
    Router::new()
        .route(&format!("{prefix}/chat"), post(api_chat))
        .route(
            &format!("{prefix}/conversations/:id"),
            get(api_history).delete(api_end_conversation),
        )
        .route("/health", get(health))
        .route("/.well-known/agent_card.json", get(agent_card))
        .layer(cors_layer(&server.allowed_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let cfg = AppConfig::default();
        router(Arc::new(AppState::from_config(&cfg)), &cfg.server)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_agent_card_lists_five_agents() {
        let (status, body) = send(app(), get_req("/.well-known/agent_card.json")).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["agents"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();
        assert_eq!(names, vec!["budget", "location", "planner", "route", "stay"]);
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let (status, _) = send(app(), post_json("/api/chat", json!({ "message": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_then_history_then_delete() {
        let app = app();
        let (status, body) = send(
            app.clone(),
            post_json("/api/chat", json!({ "message": "Plan a 2 day trip to Paris" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["conversation_id"].as_str().unwrap().to_string();
        assert!(id.starts_with("conv_"));
        assert_eq!(body["metadata"]["conversation_id"], id.as_str());

        let (status, history) = send(
            app.clone(),
            get_req(&format!("/api/conversations/{id}?limit=1")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(history["message_count"].as_u64().unwrap() >= 2);
        assert_eq!(history["messages"].as_array().unwrap().len(), 1);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/conversations/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app.clone(), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, _) = send(app, get_req(&format!("/api/conversations/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_unknown_conversation_is_not_found() {
        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/conversations/conv_missing")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(), delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
