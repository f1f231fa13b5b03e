// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Every route in the HTTP API, hosted on an `axum::Router`. Data-plane
//! bodies run through the Codec; `/connect` and `/detach` carry plain
//! JSON control-plane requests.

use crate::error::ServerError;
use crate::state::ServerState;
use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use quiverdb_engine::EngineError;
use quiverdb_wire::{ClientId, ConnectRequest, DeleteBatch, DetachRequest, Notification, PutBatch, SuccessResponse, IAMNULL123};
use quiverdb_type::Value;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Byte size at which `/keys_stream` and `/dict_stream` chunk their
/// already fully-encoded body.
const STREAM_CHUNK_SIZE: usize = 1 << 20;

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/check_db", get(check_db))
        .route("/connect", post(connect))
        .route("/disconnect", get(disconnect))
        .route("/detach", post(detach))
        .route("/set", post(set_value))
        .route("/set_batch_stream", post(set_batch_stream))
        .route("/get", post(get_value))
        .route("/get_batch_stream", post(get_batch_stream))
        .route("/delete_batch", post(delete_batch))
        .route("/keys", get(keys))
        .route("/keys_stream", get(keys_stream))
        .route("/dict", get(dict))
        .route("/dict_stream", get(dict_stream))
        .route("/stat", get(stat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct DbNameQuery {
    db_name: String,
}

#[derive(Deserialize)]
struct ClientIdQuery {
    client_id: String,
}

async fn healthz() -> &'static str {
    "OK"
}

async fn check_db(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Bytes, ServerError> {
    let exists = state.has_database(&q.db_name);
    Ok(Bytes::from(quiverdb_codec::encode(&Value::Bool(exists))?))
}

/// Opens or rebuilds the named database, registers this client as a
/// subscriber, and streams deltas until disconnect. The response headers
/// are flushed as soon as the streaming body is returned, which is this
/// endpoint's "connected" acknowledgement.
async fn connect(State(state): State<Arc<ServerState>>, Json(req): Json<ConnectRequest>) -> Result<Response, ServerError> {
    state.attach(&req.db_name, &req.backend, req.rebuild)?;
    let (rx, disconnect) = state.subscribe(req.client_id, req.db_name.clone());
    let body = Body::from_stream(notification_stream(rx, disconnect));
    Ok(Response::builder().status(StatusCode::OK).header("content-type", "application/octet-stream").body(body).unwrap())
}

/// Relays queued deltas to the client, framed with `data: end\n\n`, until
/// either the queue closes or the disconnect signal fires.
fn notification_stream(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    disconnect: Arc<Notify>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    stream::unfold((rx, disconnect), |(mut rx, disconnect)| async move {
        loop {
            tokio::select! {
                biased;
                _ = disconnect.notified() => return None,
                next = rx.recv() => match next {
                    Some(notification) => match notification.encode_framed() {
                        Ok(bytes) => return Some((Ok(Bytes::from(bytes)), (rx, disconnect))),
                        Err(e) => {
                            warn!(error = %e, "dropping unencodable notification");
                            continue;
                        }
                    },
                    None => return None,
                },
            }
        }
    })
}

async fn disconnect(State(state): State<Arc<ServerState>>, Query(q): Query<ClientIdQuery>) -> impl IntoResponse {
    match ClientId::parse(&q.client_id) {
        Some(id) => Json(SuccessResponse { success: state.unsubscribe(id) }),
        None => Json(SuccessResponse::failed()),
    }
}

async fn detach(State(state): State<Arc<ServerState>>, Json(req): Json<DetachRequest>) -> impl IntoResponse {
    Json(SuccessResponse { success: state.detach(&req.db_name) })
}

async fn set_value(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>, body: Bytes) -> Result<StatusCode, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let entries = as_map(quiverdb_codec::decode(&body)?)?;
    let key = map_field(&entries, "key")?.clone();
    let value = map_field(&entries, "value")?.clone();
    dict.set(&key, &value)?;
    Ok(StatusCode::NO_CONTENT)
}

/// A file whose filename is the database name, content `{data, client_id,
/// time}` — the shape `quiverdb_wire::PutBatch` already encodes.
async fn set_batch_stream(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> Result<StatusCode, ServerError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::from(quiverdb_wire::WireError::MalformedPayload(e.to_string())))?
        .ok_or_else(|| ServerError::from(quiverdb_wire::WireError::MalformedPayload("missing multipart file".to_string())))?;
    let db_name = field
        .file_name()
        .ok_or_else(|| ServerError::from(quiverdb_wire::WireError::MalformedPayload("multipart file has no filename".to_string())))?
        .to_string();
    let bytes = field.bytes().await.map_err(|e| ServerError::from(quiverdb_wire::WireError::MalformedPayload(e.to_string())))?;
    let batch = PutBatch::from_value(quiverdb_codec::decode(&bytes)?)?;

    let dict = state.subscriber_database(batch.client_id, &db_name)?;
    let entries: Vec<(Value, Value)> = batch.data.iter().map(|(k, v)| (Value::Bytes(k.clone()), Value::Bytes(v.clone()))).collect();
    dict.update(&entries)?;
    state.fan_out(&db_name, batch.client_id, Notification::from_put_batch(&batch));
    Ok(StatusCode::NO_CONTENT)
}

async fn get_value(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>, body: Bytes) -> Result<Bytes, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let default = Value::Bytes(IAMNULL123.to_vec());
    match dict.get(&Value::Bytes(body.to_vec()), default)? {
        Value::Bytes(b) => Ok(Bytes::from(b)),
        other => Err(ServerError::from(quiverdb_wire::WireError::MalformedPayload(format!("unexpected stored value: {other:?}")))),
    }
}

async fn get_batch_stream(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>, body: Bytes) -> Result<Bytes, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let entries = as_map(quiverdb_codec::decode(&body)?)?;
    let keys = match map_field(&entries, "keys")? {
        Value::Sequence(items) | Value::Tuple(items) => items
            .iter()
            .map(|v| match v {
                Value::Bytes(b) => Ok(b.clone()),
                other => Err(ServerError::from(quiverdb_wire::WireError::MalformedPayload(format!("key is not bytes: {other:?}")))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(ServerError::from(quiverdb_wire::WireError::MalformedPayload(format!("`keys` is not a sequence: {other:?}")))),
    };
    let raw = dict.engine().get_batch(&keys)?;
    let values: Vec<Value> = raw.into_iter().map(|v| v.map(Value::Bytes).unwrap_or(Value::Undefined)).collect();
    Ok(Bytes::from(quiverdb_codec::encode(&Value::Sequence(values))?))
}

async fn delete_batch(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>, body: Bytes) -> Result<StatusCode, ServerError> {
    let batch = DeleteBatch::from_value(quiverdb_codec::decode(&body)?)?;
    let dict = state.subscriber_database(batch.client_id, &q.db_name)?;
    for key in &batch.keys {
        match dict.delete(&Value::Bytes(key.clone())) {
            Ok(()) | Err(EngineError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }
    state.fan_out(&q.db_name, batch.client_id, Notification::from_delete_batch(&batch));
    Ok(StatusCode::NO_CONTENT)
}

async fn keys(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Bytes, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let keys: Vec<Value> = dict.engine().keys()?.into_iter().map(Value::Bytes).collect();
    Ok(Bytes::from(quiverdb_codec::encode(&Value::Sequence(keys))?))
}

async fn keys_stream(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Response, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let keys: Vec<Value> = dict.engine().keys()?.into_iter().map(Value::Bytes).collect();
    Ok(Response::new(chunked_body(quiverdb_codec::encode(&Value::Sequence(keys))?)))
}

async fn dict(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Bytes, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let items: Vec<(Value, Value)> = dict.engine().items()?.into_iter().map(|(k, v)| (Value::Bytes(k), Value::Bytes(v))).collect();
    Ok(Bytes::from(quiverdb_codec::encode(&Value::Map(items))?))
}

async fn dict_stream(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Response, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let items: Vec<(Value, Value)> = dict.engine().items()?.into_iter().map(|(k, v)| (Value::Bytes(k), Value::Bytes(v))).collect();
    Ok(Response::new(chunked_body(quiverdb_codec::encode(&Value::Map(items))?)))
}

async fn stat(State(state): State<Arc<ServerState>>, Query(q): Query<DbNameQuery>) -> Result<Bytes, ServerError> {
    let dict = state.database(&q.db_name).ok_or_else(|| ServerError::DbNotFound(q.db_name.clone()))?;
    let stat = dict.stat()?;
    let wire = quiverdb_wire::Stat {
        count: stat.count as u64,
        buffer: stat.buffer as u64,
        db: stat.db,
        marked_delete: stat.marked_delete as u64,
        backend: stat.backend,
    };
    Ok(Bytes::from(quiverdb_codec::encode(&wire.to_value())?))
}

fn chunked_body(bytes: Vec<u8>) -> Body {
    let chunks: Vec<Result<Bytes, std::io::Error>> =
        bytes.chunks(STREAM_CHUNK_SIZE).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    Body::from_stream(stream::iter(chunks))
}

fn as_map(value: Value) -> Result<Vec<(Value, Value)>, ServerError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ServerError::from(quiverdb_wire::WireError::MalformedPayload(format!("payload is not a map: {other:?}")))),
    }
}

fn map_field<'a>(entries: &'a [(Value, Value)], name: &str) -> Result<&'a Value, ServerError> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == name))
        .map(|(_, v)| v)
        .ok_or_else(|| ServerError::from(quiverdb_wire::WireError::MalformedPayload(format!("missing field `{name}`"))))
}
