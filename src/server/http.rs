// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! HTTP binding for the exposed thing

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::thing::{ExposedThing, ThingError};

/// Error body returned by every failing route
pub struct ApiError(ThingError);

impl From<ThingError> for ApiError {
    fn from(e: ThingError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ThingError::Validation { .. } => StatusCode::BAD_REQUEST,
            ThingError::ReadOnly(_) => StatusCode::FORBIDDEN,
            ThingError::UnknownProperty(_)
            | ThingError::UnknownAction(_)
            | ThingError::UnknownEvent(_) => StatusCode::NOT_FOUND,
            ThingError::InvalidDescription(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Routes for one thing, nested under its slug
pub fn router(thing: Arc<ExposedThing>) -> Router {
    let routes = Router::new()
        .route("/", get(get_description))
        .route("/properties", get(get_all_properties))
        .route("/properties/:name", get(get_property).put(put_property))
        .route("/actions/:name", post(post_action));

    Router::new()
        .route("/health", get(health))
        .nest(&format!("/{}", thing.description().slug()), routes)
        .with_state(thing)
}

/// Bind the HTTP listener. Callers bind before anything else starts so a
/// taken port fails the vehicle at startup.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP binding on {}", addr))
}

/// Serve the binding on an already bound listener until shutdown is signalled
pub async fn serve(
    thing: Arc<ExposedThing>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    info!(
        "HTTP binding listening on http://{}/{}",
        listener.local_addr()?,
        thing.description().slug()
    );

    axum::serve(listener, router(thing))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("HTTP binding shutting down");
        })
        .await?;

    Ok(())
}

async fn health(State(thing): State<Arc<ExposedThing>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "thing": thing.description().title,
        "version": crate::VERSION,
    }))
}

async fn get_description(State(thing): State<Arc<ExposedThing>>) -> Json<Value> {
    Json(thing.description().to_json())
}

async fn get_all_properties(State(thing): State<Arc<ExposedThing>>) -> Json<Value> {
    Json(Value::Object(thing.read_all_properties()))
}

async fn get_property(
    State(thing): State<Arc<ExposedThing>>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(thing.read_property(&name)?))
}

async fn put_property(
    State(thing): State<Arc<ExposedThing>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ThingError::validation(name.as_str(), e.to_string()))?;
    debug!("Write {} <- {}", name, value);
    thing.write_property(&name, value)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn post_action(
    State(thing): State<Arc<ExposedThing>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // Actions take no input; a body is tolerated and ignored if it is not JSON
    let input = serde_json::from_slice::<Value>(&body).ok();
    Ok(Json(thing.invoke_action(&name, input)?))
}
