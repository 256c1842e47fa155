use crate::config::ApiConfig;
use crate::error::Error;
use crate::store::ControlFlags;
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flags: ControlFlags,
}

/// Response envelope of every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_event: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_event: Option<bool>,
}

impl ApiResponse {
    fn ok(message: &str) -> Self {
        Self {
            error: false,
            message: message.to_string(),
            send_event: None,
            mute_event: None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Store(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            message: err.to_string(),
            status,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return err.clone().into();
        }

        ApiError {
            message: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("API request failed: {}", self.message);
        let body = ApiResponse {
            error: true,
            message: self.message,
            send_event: None,
            mute_event: None,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Build the control-plane router
pub fn router(flags: ControlFlags) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/status", get(status))
        .route("/api/v1/stop", get(stop))
        .route("/api/v1/resume", get(resume))
        .route("/api/v1/mute", get(mute))
        .route("/api/v1/unmute", get(unmute))
        .with_state(AppState { flags })
        .layer(cors)
}

pub struct RestApi {
    config: ApiConfig,
    flags: ControlFlags,
}

impl RestApi {
    pub fn new(config: &ApiConfig, flags: ControlFlags) -> Self {
        Self {
            config: config.clone(),
            flags,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid API address {}: {}", addr, e)))?;

        let listener = TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);

        serve(listener, router(self.flags.clone())).await
    }
}

async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::Server::from_tcp(listener.into_std()?)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn ping() -> Json<ApiResponse> {
    Json(ApiResponse::ok("pong"))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    let suppressed = state.flags.is_suppressed().await?;
    let muted = state.flags.is_muted().await?;
    Ok(Json(ApiResponse {
        send_event: Some(!suppressed),
        mute_event: Some(muted),
        ..ApiResponse::ok("status")
    }))
}

async fn stop(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    state.flags.set_suppressed(true).await?;
    Ok(Json(ApiResponse::ok("Stop send message.")))
}

async fn resume(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    state.flags.set_suppressed(false).await?;
    Ok(Json(ApiResponse::ok("Resume send message.")))
}

async fn mute(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    state.flags.set_muted(true).await?;
    Ok(Json(ApiResponse::ok("Mute send message.")))
}

async fn unmute(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    state.flags.set_muted(false).await?;
    Ok(Json(ApiResponse::ok("Unmute send message.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_utils::FailingStore;
    use std::sync::Arc;

    async fn spawn_api(flags: ControlFlags) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, router(flags)));
        format!("http://{}/api/v1", addr)
    }

    async fn call(base: &str, path: &str) -> (StatusCode, ApiResponse) {
        let response = reqwest::get(format!("{}/{}", base, path)).await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_flag_endpoints() {
        let flags = ControlFlags::new(Arc::new(MemoryStore::new()));
        let base = spawn_api(flags.clone()).await;

        let (status, body) = call(&base, "ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, "pong");

        let (_, body) = call(&base, "stop").await;
        assert_eq!(body.message, "Stop send message.");
        assert!(flags.is_suppressed().await.unwrap());

        call(&base, "mute").await;
        let (_, body) = call(&base, "status").await;
        assert!(!body.error);
        assert_eq!(body.send_event, Some(false));
        assert_eq!(body.mute_event, Some(true));

        call(&base, "resume").await;
        call(&base, "unmute").await;
        let (_, body) = call(&base, "status").await;
        assert_eq!(body.send_event, Some(true));
        assert_eq!(body.mute_event, Some(false));
    }

    #[tokio::test]
    async fn test_store_failure_is_bad_gateway() {
        let base = spawn_api(ControlFlags::new(Arc::new(FailingStore))).await;

        let (status, body) = call(&base, "stop").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error);
        assert!(body.send_event.is_none());
    }
}
