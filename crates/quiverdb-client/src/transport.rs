// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Remote Transport: an HTTP/2-capable connection to a server base
//! URL, a unique client id, put/delete buffers, and a long-lived
//! notification stream consumer that mirrors deltas from other
//! subscribers into a local cache-all map.

use crate::error::ClientError;
use crate::retry::{with_retry, RetryPolicy};
use futures_util::StreamExt;
use quiverdb_wire::{ClientId, ConnectRequest, DeleteBatch, Notification, PutBatch, SuccessResponse, FRAME_END, IAMNULL123};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Default bounded connect timeout; the notification stream itself has
/// no inactivity timeout once established.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteTransport {
    http: reqwest::Client,
    base_url: String,
    db_name: String,
    client_id: ClientId,
    put_buffer: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    delete_buffer: Mutex<HashSet<Vec<u8>>>,
    /// Mirrors server-side state this client did not itself write: the
    /// initial `pull_all` hydration plus every notification applied since.
    mirror: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
    notifier: tokio::task::JoinHandle<()>,
}

impl RemoteTransport {
    /// Opens the `/connect` streaming POST, hydrates the mirror via
    /// `pull_all`, and spawns the background notification consumer.
    pub async fn connect(base_url: &str, db_name: &str, backend: &str, rebuild: bool) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        let client_id = ClientId::new();
        let request = ConnectRequest { db_name: db_name.to_string(), backend: backend.to_string(), rebuild, client_id };

        let response = with_retry(RetryPolicy::SINGLE, "connect", || {
            let http = http.clone();
            let base_url = base_url.to_string();
            let request = request.clone();
            async move {
                let resp = http.post(format!("{base_url}/connect")).json(&request).send().await?;
                if !resp.status().is_success() {
                    return Err(ClientError::Server { status: resp.status().as_u16(), body: resp.text().await.unwrap_or_default() });
                }
                Ok(resp)
            }
        })
        .await?;

        let mirror = Arc::new(Mutex::new(HashMap::new()));
        let notifier = spawn_notification_consumer(response, Arc::clone(&mirror));

        let transport = RemoteTransport {
            http,
            base_url: base_url.to_string(),
            db_name: db_name.to_string(),
            client_id,
            put_buffer: Mutex::new(HashMap::new()),
            delete_buffer: Mutex::new(HashSet::new()),
            mirror,
            notifier,
        };

        let snapshot = transport.pull_all().await?;
        *transport.mirror.lock().unwrap() = snapshot;
        Ok(transport)
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// `put(k, v)`/`delete(k)` append to local buffers; never immediate
    /// RPCs.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        self.delete_buffer.lock().unwrap().remove(&key);
        self.put_buffer.lock().unwrap().insert(key, value);
    }

    pub fn delete(&self, key: Vec<u8>) {
        self.put_buffer.lock().unwrap().remove(&key);
        self.delete_buffer.lock().unwrap().insert(key);
    }

    /// Ships one request per non-empty buffer, each with its own retry.
    /// The buffers are cleared only once their request succeeds.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let puts: Vec<_> = {
            let mut guard = self.put_buffer.lock().unwrap();
            guard.drain().collect()
        };
        let deletes: Vec<_> = {
            let mut guard = self.delete_buffer.lock().unwrap();
            guard.drain().collect()
        };

        if !puts.is_empty() {
            if let Err(e) = self.send_put_batch(puts.clone()).await {
                let mut guard = self.put_buffer.lock().unwrap();
                for (k, v) in puts {
                    guard.entry(k).or_insert(v);
                }
                return Err(e);
            }
        }
        if !deletes.is_empty() {
            if let Err(e) = self.send_delete_batch(deletes.clone()).await {
                let mut guard = self.delete_buffer.lock().unwrap();
                guard.extend(deletes);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn send_put_batch(&self, data: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), ClientError> {
        let batch = PutBatch { data, client_id: self.client_id, time: now_millis() };
        let payload = quiverdb_codec::encode(&batch.to_value())?;
        with_retry(RetryPolicy::BATCH, "set_batch_stream", || {
            let http = self.http.clone();
            let url = format!("{}/set_batch_stream", self.base_url);
            let db_name = self.db_name.clone();
            let payload = payload.clone();
            async move {
                let part = reqwest::multipart::Part::bytes(payload).file_name(db_name);
                let form = reqwest::multipart::Form::new().part("file", part);
                let resp = http.post(&url).multipart(form).send().await?;
                expect_no_content(resp).await
            }
        })
        .await
    }

    async fn send_delete_batch(&self, keys: Vec<Vec<u8>>) -> Result<(), ClientError> {
        let batch = DeleteBatch { keys, client_id: self.client_id, time: now_millis() };
        let payload = quiverdb_codec::encode(&batch.to_value())?;
        with_retry(RetryPolicy::BATCH, "delete_batch", || {
            let http = self.http.clone();
            let url = format!("{}/delete_batch?db_name={}", self.base_url, self.db_name);
            let payload = payload.clone();
            async move {
                let resp = http.post(&url).body(payload).send().await?;
                expect_no_content(resp).await
            }
        })
        .await
    }

    /// Single round-trip POST of the raw encoded key. The put-buffer is
    /// consulted first so a just-buffered write is visible before it has
    /// been shipped.
    pub async fn get(&self, key: &[u8], default: &[u8]) -> Result<Vec<u8>, ClientError> {
        if self.delete_buffer.lock().unwrap().contains(key) {
            return Ok(default.to_vec());
        }
        if let Some(v) = self.put_buffer.lock().unwrap().get(key) {
            return Ok(v.clone());
        }
        let url = format!("{}/get?db_name={}", self.base_url, self.db_name);
        let key = key.to_vec();
        let body = with_retry(RetryPolicy::SINGLE, "get", || {
            let http = self.http.clone();
            let url = url.clone();
            let key = key.clone();
            async move {
                let resp = http.post(&url).body(key).send().await?;
                if !resp.status().is_success() {
                    return Err(ClientError::Server { status: resp.status().as_u16(), body: resp.text().await.unwrap_or_default() });
                }
                Ok(resp.bytes().await?.to_vec())
            }
        })
        .await?;
        if body == IAMNULL123 {
            Ok(default.to_vec())
        } else {
            Ok(body)
        }
    }

    /// Streaming GET of the full database as a single encoded mapping,
    /// used for cache-all hydration.
    pub async fn pull_all(&self) -> Result<HashMap<Vec<u8>, Vec<u8>>, ClientError> {
        let url = format!("{}/dict?db_name={}", self.base_url, self.db_name);
        let body = with_retry(RetryPolicy::SINGLE, "pull_all", || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let resp = http.get(&url).send().await?;
                if !resp.status().is_success() {
                    return Err(ClientError::Server { status: resp.status().as_u16(), body: resp.text().await.unwrap_or_default() });
                }
                Ok(resp.bytes().await?.to_vec())
            }
        })
        .await?;
        let value = quiverdb_codec::decode(&body)?;
        match value {
            quiverdb_type::Value::Map(entries) => Ok(entries
                .into_iter()
                .filter_map(|(k, v)| match (k, v) {
                    (quiverdb_type::Value::Bytes(k), quiverdb_type::Value::Bytes(v)) => Some((k, v)),
                    _ => None,
                })
                .collect()),
            _ => Ok(HashMap::new()),
        }
    }

    /// The point-in-time view a `RemoteBackend::new_snapshot` call hands
    /// back: a clone of the current mirror.
    pub fn mirror_snapshot(&self) -> HashMap<Vec<u8>, Vec<u8>> {
        self.mirror.lock().unwrap().clone()
    }

    /// Sends a disconnect RPC identified by client id; the server stops
    /// the notification stream, which ends the background consumer.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let url = format!("{}/disconnect?client_id={}", self.base_url, self.client_id);
        with_retry(RetryPolicy::SINGLE, "disconnect", || {
            let http = self.http.clone();
            let url = url.clone();
            async move {
                let resp = http.get(&url).send().await?;
                let body: SuccessResponse = resp.json().await?;
                if body.success {
                    Ok(())
                } else {
                    Err(ClientError::Server { status: 200, body: "disconnect reported failure".to_string() })
                }
            }
        })
        .await?;
        self.notifier.abort();
        Ok(())
    }
}

async fn expect_no_content(resp: reqwest::Response) -> Result<(), ClientError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(ClientError::Server { status: resp.status().as_u16(), body: resp.text().await.unwrap_or_default() })
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Reads the `/connect` streaming response, reassembling chunks at
/// [`FRAME_END`] and applying each decoded delta to `mirror`. Stream
/// termination by the server ends the task cleanly.
fn spawn_notification_consumer(response: reqwest::Response, mirror: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let chunk = match stream.next().await {
                Some(Ok(c)) => c,
                Some(Err(e)) => {
                    warn!(error = %e, "notification stream errored, closing consumer");
                    return;
                }
                None => return,
            };
            buf.extend_from_slice(&chunk);
            while let Some(pos) = find_subslice(&buf, FRAME_END) {
                let frame = buf.drain(..pos + FRAME_END.len()).collect::<Vec<u8>>();
                let payload = &frame[..frame.len() - FRAME_END.len()];
                match quiverdb_codec::decode(payload).map_err(quiverdb_wire::WireError::from).and_then(Notification::from_value) {
                    Ok(Notification::BufferDict { data, .. }) => {
                        let mut guard = mirror.lock().unwrap();
                        for (k, v) in data {
                            guard.insert(k, v);
                        }
                    }
                    Ok(Notification::DeleteKeys { keys, .. }) => {
                        let mut guard = mirror.lock().unwrap();
                        for k in keys {
                            guard.remove(&k);
                        }
                    }
                    Err(e) => warn!(error = %e, "dropping malformed notification frame"),
                }
            }
        }
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_subslice_locates_the_frame_delimiter() {
        let mut data = b"abc".to_vec();
        data.extend_from_slice(FRAME_END);
        data.extend_from_slice(b"def");
        assert_eq!(find_subslice(&data, FRAME_END), Some(3));
    }
}
