/*!
 # HTTP API

 Every endpoint is a `POST` taking its parameters from the query string:

 | Endpoint      | Parameters             |
 |---------------|------------------------|
 | `/on`         | `group`                |
 | `/off`        | `group`                |
 | `/rgb`        | `group`, `r`, `g`, `b` |
 | `/brightness` | `group`, `level`       |
 | `/color`      | `group`, `color`       |
 | `/white`      | `group`                |
 | `/night`      | `group`                |
 | `/disco`      | `group`, `speed`       |

 Omitting `group` (or passing `0`) addresses every group. Errors, including
 query strings that do not decode, are answered with an
 `{"error_code", "message"}` JSON body.
*/

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use crate::bridge::BridgeDriver;
use crate::codec::{HueByte, RawParams, ValidationError};
use crate::dispatch::{CommandDispatcher, CommandKind, Dispatched, Operation};
use crate::{Error, Result};

/// Query parameters, or why they failed to decode
type Params = std::result::Result<Query<RawParams>, QueryRejection>;

/// Shared handler state
pub struct AppState<B> {
    pub dispatcher: Arc<CommandDispatcher<B>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<B: BridgeDriver> AppState<B> {
    pub fn new(dispatcher: CommandDispatcher<B>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Dispatch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DISPATCH_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Bridge(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BRIDGE_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };
        let message = self.to_string();

        match &self {
            // logged with its cause where the bridge call failed
            Error::Dispatch(_) => {}
            _ if status.is_server_error() => {
                tracing::error!(
                    status = %status,
                    error_code,
                    message = %message,
                    "Request error"
                );
            }
            _ => {
                tracing::warn!(
                    status = %status,
                    error_code,
                    message = %message,
                    "Request rejected"
                );
            }
        }

        let body = Json(json!({
            "error_code": error_code,
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Builds the API router
pub fn router<B: BridgeDriver>(state: AppState<B>) -> Router {
    Router::new()
        .route("/on", post(on::<B>))
        .route("/off", post(off::<B>))
        .route("/rgb", post(rgb::<B>))
        .route("/brightness", post(brightness::<B>))
        .route("/color", post(color::<B>))
        .route("/white", post(white::<B>))
        .route("/night", post(night::<B>))
        .route("/disco", post(disco::<B>))
        .with_state(state)
}

/// Serves the API on `listener` until Ctrl-C
pub async fn serve<B: BridgeDriver>(listener: TcpListener, state: AppState<B>) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run<B: BridgeDriver>(
    state: &AppState<B>,
    kind: CommandKind,
    params: Params,
) -> Result<Json<Value>> {
    let Query(params) =
        params.map_err(|rejection| ValidationError::Query(rejection.body_text()))?;
    let (operation, dispatched) = state.dispatcher.execute(kind, &params).await?;
    Ok(Json(describe(operation, dispatched)))
}

/// Response body for a successful command
pub fn describe(operation: Operation, dispatched: Dispatched) -> Value {
    let mut body = json!({
        "command": operation.name(),
        "group": dispatched.group_id(),
    });
    let detail = match operation {
        Operation::SetRgb(color) => Some(("rgb", json!(color))),
        Operation::SetBrightness(level) => Some(("level", json!(level.value()))),
        Operation::SetHue(HueByte(hue)) => Some(("color", json!(format!("{hue:x}")))),
        Operation::Disco(speed) => Some(("speed", json!(speed.as_str()))),
        Operation::On | Operation::Off | Operation::White | Operation::Night => None,
    };
    if let (Some((key, value)), Some(map)) = (detail, body.as_object_mut()) {
        map.insert(key.to_string(), value);
    }
    body
}

async fn on<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::On, params).await
}

async fn off<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Off, params).await
}

async fn rgb<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Rgb, params).await
}

async fn brightness<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Brightness, params).await
}

async fn color<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Color, params).await
}

async fn white<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::White, params).await
}

async fn night<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Night, params).await
}

async fn disco<B: BridgeDriver>(
    State(state): State<AppState<B>>,
    params: Params,
) -> Result<Json<Value>> {
    run(&state, CommandKind::Disco, params).await
}
