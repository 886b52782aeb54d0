//! HTTP server for the image cache
//!
//! Every request path is a single cache key. GET reads through to the
//! origin, PUT writes through to disk, DELETE invalidates; anything else is
//! rejected with 405.

use crate::origin::OriginClient;
use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use image_cache_store::{CacheKey, ImageStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const ALLOWED_METHODS: &str = "GET, PUT, DELETE";

const IMAGE_SAVED: &str = "Image saved successfully.";
const IMAGE_DELETED: &str = "Image deleted successfully.";
const IMAGE_NOT_FOUND: &str = "Image not found.";
const SAVE_FAILED: &str = "Failed to save image.";
const INVALID_KEY: &str = "Invalid image key.";
const METHOD_NOT_ALLOWED: &str = "Method Not Allowed.";

/// Shared state for the HTTP server
pub struct ServerState {
    pub store: ImageStore,
    pub origin: OriginClient,
}

impl ServerState {
    pub fn new(store: ImageStore, origin: OriginClient) -> Self {
        Self { store, origin }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/{key}",
            get(get_image)
                .put(put_image)
                .delete(delete_image)
                // axum would otherwise answer HEAD with the GET handler
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .fallback(unrouted)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, host: &str, port: u16) -> std::io::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Serve a cached image, falling back to the origin on a miss
async fn get_image(
    State(state): State<SharedState>,
    uri: Uri,
    raw_key: Result<Path<String>, PathRejection>,
) -> Response {
    info!(method = "GET", path = %uri.path(), "Received request");
    let key = match parse_key(raw_key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.store.read(&key).await {
        Ok(data) => {
            info!(key = %key, path = ?state.store.path_for(&key), "Serving image from cache");
            return image_response(data, "HIT");
        }
        Err(e) => {
            info!(key = %key, reason = %e, "Image not in cache, fetching from origin");
        }
    }

    let data = match state.origin.fetch(&key).await {
        Ok(data) => data,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to fetch image from origin");
            return text_response(StatusCode::NOT_FOUND, IMAGE_NOT_FOUND);
        }
    };

    if let Err(e) = state.store.write(&key, &data).await {
        error!(
            key = %key,
            path = ?state.store.path_for(&key),
            error = %e,
            "Failed to save image fetched from origin"
        );
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED);
    }

    info!(key = %key, path = ?state.store.path_for(&key), "Saved image from origin");
    image_response(data, "MISS")
}

/// Stream the request body into the cache
async fn put_image(
    State(state): State<SharedState>,
    uri: Uri,
    raw_key: Result<Path<String>, PathRejection>,
    body: Body,
) -> Response {
    info!(method = "PUT", path = %uri.path(), "Received request");
    let key = match parse_key(raw_key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state
        .store
        .write_stream(&key, body.into_data_stream())
        .await
    {
        Ok(size) => {
            info!(key = %key, path = ?state.store.path_for(&key), size, "Saved image");
            text_response(StatusCode::CREATED, IMAGE_SAVED)
        }
        Err(e) => {
            error!(
                key = %key,
                path = ?state.store.path_for(&key),
                error = %e,
                "Failed to save image"
            );
            text_response(StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED)
        }
    }
}

/// Remove an image from the cache
async fn delete_image(
    State(state): State<SharedState>,
    uri: Uri,
    raw_key: Result<Path<String>, PathRejection>,
) -> Response {
    info!(method = "DELETE", path = %uri.path(), "Received request");
    let key = match parse_key(raw_key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.store.delete(&key).await {
        Ok(()) => {
            info!(key = %key, path = ?state.store.path_for(&key), "Deleted image");
            text_response(StatusCode::OK, IMAGE_DELETED)
        }
        Err(e) => {
            info!(key = %key, reason = %e, "Image not found for deletion");
            text_response(StatusCode::NOT_FOUND, IMAGE_NOT_FOUND)
        }
    }
}

async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    info!(method = %method, path = %uri.path(), "Method not allowed");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, ALLOWED_METHODS)],
        METHOD_NOT_ALLOWED,
    )
        .into_response()
}

/// Paths that are not a single segment, including `/`
async fn unrouted(method: Method, uri: Uri) -> Response {
    if method == Method::GET || method == Method::PUT || method == Method::DELETE {
        info!(method = %method, path = %uri.path(), "Rejected request without a valid key");
        return text_response(StatusCode::BAD_REQUEST, INVALID_KEY);
    }
    method_not_allowed(method, uri).await
}

/// Turn the decoded path segment into a key, answering 400 when it is unusable
fn parse_key(raw_key: Result<Path<String>, PathRejection>) -> Result<CacheKey, Response> {
    let Path(raw_key) = raw_key.map_err(|rejection| {
        debug!(error = %rejection, "Rejected undecodable cache key");
        text_response(StatusCode::BAD_REQUEST, INVALID_KEY)
    })?;

    CacheKey::parse(&raw_key).map_err(|e| {
        debug!(key = %raw_key, error = %e, "Rejected cache key");
        text_response(StatusCode::BAD_REQUEST, INVALID_KEY)
    })
}

fn image_response(data: Vec<u8>, cache_status: &'static str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, IMAGE_CONTENT_TYPE),
            (X_CACHE, cache_status),
        ],
        data,
    )
        .into_response()
}

fn text_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
