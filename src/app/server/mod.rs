use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::app::Result;
use crate::core::{utf16_len, TokenizeOutput, TokenizerDefine, TokenizerInfo};
use crate::envconfig::Config;
use crate::hub::{CompareOutput, HubError, HubStatus, Package, RegistryStatus, TokenizersHub};
use crate::middleware::{allowed_hosts_middleware, AllowedHosts};

#[derive(Clone)]
pub struct AppState {
    pub hub: TokenizersHub,
    pub max_text_len: usize,
}

pub struct Server {
    host: String,
    port: u16,
    state: AppState,
    allowed: AllowedHosts,
}

impl Server {
    pub fn new(hub: TokenizersHub) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            state: AppState {
                hub,
                max_text_len: 100_000,
            },
            allowed: AllowedHosts::default(),
        }
    }

    pub fn from_config(hub: TokenizersHub, config: &Config) -> Self {
        Self::new(hub)
            .host(config.host.host.clone())
            .port(config.host.port)
            .max_text_len(config.max_text_len)
            .allowed_hosts(config.allowed_origins.clone())
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_text_len(mut self, max: usize) -> Self {
        self.state.max_text_len = max;
        self
    }

    pub fn allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed = AllowedHosts::new(hosts);
        self
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), self.allowed.clone())
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("tokscope listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

pub fn create_router(state: AppState, allowed: AllowedHosts) -> Router {
    Router::new()
        .route("/api/packages", get(list_packages))
        .route("/api/status", get(status))
        .route("/api/events", get(events))
        .route("/api/tokenize", post(tokenize))
        .route("/api/info", post(info))
        .route("/api/compare", post(compare))
        .route("/api/repo", post(repo))
        .layer(axum::middleware::from_fn_with_state(allowed, allowed_hosts_middleware))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenizeRequest {
    pub tokenizer: TokenizerDefine,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoRequest {
    pub tokenizer: TokenizerDefine,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompareRequest {
    pub left: TokenizerDefine,
    pub right: TokenizerDefine,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepoRequest {
    pub repo: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HubStatus,
    pub registry: RegistryStatus,
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<HubError>() {
            Ok(hub_err) => hub_err.into(),
            Err(err) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn check_text(state: &AppState, text: &str) -> std::result::Result<(), ApiError> {
    let len = utf16_len(text);
    if len > state.max_text_len {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("text is {} chars, limit is {}", len, state.max_text_len),
        ));
    }
    Ok(())
}

async fn list_packages(State(state): State<AppState>) -> Json<Vec<Package>> {
    Json(state.hub.packages().packages().to_vec())
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.hub.status(),
        registry: state.hub.registry_status(),
        errors: state.hub.errors(),
    })
}

async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.hub.events().receiver()).filter_map(|event| async move {
        let event = event.ok()?;
        SseEvent::default().event("change").json_data(&event).ok().map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn tokenize(State(state): State<AppState>, Json(req): Json<TokenizeRequest>) -> ApiResult<TokenizeOutput> {
    check_text(&state, &req.text)?;
    req.tokenizer.validate_remote()?;
    let tokenizer = state.hub.resolve(&req.tokenizer).await?;
    Ok(Json(state.hub.run(tokenizer, &req.text).await?))
}

async fn info(State(state): State<AppState>, Json(req): Json<InfoRequest>) -> ApiResult<TokenizerInfo> {
    req.tokenizer.validate_remote()?;
    let tokenizer = state.hub.resolve(&req.tokenizer).await?;
    Ok(Json(state.hub.describe(&tokenizer)))
}

async fn compare(State(state): State<AppState>, Json(req): Json<CompareRequest>) -> ApiResult<CompareOutput> {
    check_text(&state, &req.text)?;
    req.left.validate_remote()?;
    req.right.validate_remote()?;
    Ok(Json(state.hub.compare(&req.text, &req.left, &req.right).await?))
}

async fn repo(Json(req): Json<RepoRequest>) -> ApiResult<TokenizerDefine> {
    Ok(Json(TokenizerDefine::from_repo(&req.repo)?))
}
