//! HTTP routes for the pkvs key-value store: `GET /get`, `POST /post`,
//! `POST /delete`, `GET /sorted_keys`.
//!
//! Every handler validates the request body itself — exact field set, all
//! string values, key length in `1..=256` — before ever touching the
//! dispatcher, per the engine's request-malformed/not-found/internal-error
//! error model.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use shard::Dispatcher;

const MIN_KEY_LEN: usize = 1;
const MAX_KEY_LEN: usize = 256;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/get", get(get_key))
        .route("/post", post(post_key))
        .route("/delete", post(delete_key))
        .route("/sorted_keys", get(sorted_keys))
        .with_state(dispatcher)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyBody {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PostBody {
    key: String,
    value: String,
}

fn request_error() -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(json!({"result": "request error"}))).into_response()
}

fn invalid_key_size() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"result": "invalid key size"})),
    )
        .into_response()
}

fn internal_server_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"result": "internal server error"})),
    )
        .into_response()
}

fn check_key_len(key: &str) -> Option<axum::response::Response> {
    if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
        Some(invalid_key_size())
    } else {
        None
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, ()> {
    serde_json::from_slice::<T>(body).map_err(|_| ())
}

async fn get_key(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> axum::response::Response {
    let body: KeyBody = match parse_body(&body) {
        Ok(b) => b,
        Err(()) => return request_error(),
    };
    if let Some(resp) = check_key_len(&body.key) {
        return resp;
    }
    match dispatcher.get(body.key.as_bytes()) {
        Ok(Some(value)) => (
            StatusCode::OK,
            Json(json!({"value": String::from_utf8_lossy(&value)})),
        )
            .into_response(),
        Ok(None) => (StatusCode::OK, Json(json!({"result": "missing"}))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "get failed");
            internal_server_error()
        }
    }
}

async fn post_key(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> axum::response::Response {
    let body: PostBody = match parse_body(&body) {
        Ok(b) => b,
        Err(()) => return request_error(),
    };
    if let Some(resp) = check_key_len(&body.key) {
        return resp;
    }
    match dispatcher.insert(body.key.as_bytes(), body.value.into_bytes()) {
        Ok(()) => (StatusCode::OK, Json(json!({"result": "ok"}))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "insert failed");
            internal_server_error()
        }
    }
}

async fn delete_key(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> axum::response::Response {
    let body: KeyBody = match parse_body(&body) {
        Ok(b) => b,
        Err(()) => return request_error(),
    };
    if let Some(resp) = check_key_len(&body.key) {
        return resp;
    }
    match dispatcher.delete(body.key.as_bytes()) {
        Ok(()) => (StatusCode::OK, Json(json!({"result": "ok"}))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "delete failed");
            internal_server_error()
        }
    }
}

async fn sorted_keys(State(dispatcher): State<Arc<Dispatcher>>) -> axum::response::Response {
    match dispatcher.sorted_keys() {
        Ok(keys) => {
            let keys: Vec<Value> = keys
                .into_iter()
                .map(|k| Value::String(String::from_utf8_lossy(&k).into_owned()))
                .collect();
            (StatusCode::OK, Json(json!({"keys": keys}))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "sorted_keys failed");
            internal_server_error()
        }
    }
}
