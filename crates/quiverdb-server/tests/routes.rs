// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! End-to-end coverage of the HTTP API, driven over a real bound socket
//! the way a remote client would see it.

use quiverdb_server::{router, ServerState};
use quiverdb_type::Value;
use quiverdb_wire::{ClientId, ConnectRequest};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_server() -> (String, tempfile::TempDir, tokio::task::JoinHandle<()>) {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(ServerState::new(dir.path().to_path_buf()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), dir, handle)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (base, _dir, _server) = spawn_server().await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn check_db_reflects_attachment() {
    let (base, _dir, _server) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/check_db?db_name=demo")).send().await.unwrap();
    let body = resp.bytes().await.unwrap();
    assert_eq!(quiverdb_codec::decode(&body).unwrap(), Value::Bool(false));

    let connect_req = ConnectRequest { db_name: "demo".into(), backend: "lsm".into(), rebuild: false, client_id: ClientId::new() };
    let _connect = client.post(format!("{base}/connect")).json(&connect_req).send().await.unwrap();

    let resp = client.get(format!("{base}/check_db?db_name=demo")).send().await.unwrap();
    let body = resp.bytes().await.unwrap();
    assert_eq!(quiverdb_codec::decode(&body).unwrap(), Value::Bool(true));
}

#[tokio::test]
async fn set_then_get_round_trips_raw_bytes() {
    let (base, _dir, _server) = spawn_server().await;
    let client = reqwest::Client::new();

    let connect_req = ConnectRequest { db_name: "demo".into(), backend: "lsm".into(), rebuild: false, client_id: ClientId::new() };
    let _connect = client.post(format!("{base}/connect")).json(&connect_req).send().await.unwrap();

    let payload = quiverdb_codec::encode(&Value::Map(vec![
        (Value::Text("key".into()), Value::Bytes(b"k".to_vec())),
        (Value::Text("value".into()), Value::Bytes(b"v".to_vec())),
    ]))
    .unwrap();
    let resp = client.post(format!("{base}/set?db_name=demo")).body(payload).send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client.post(format!("{base}/get?db_name=demo")).body(b"k".to_vec()).send().await.unwrap();
    assert_eq!(resp.bytes().await.unwrap().to_vec(), b"v".to_vec());

    let resp = client.post(format!("{base}/get?db_name=demo")).body(b"missing".to_vec()).send().await.unwrap();
    assert_eq!(resp.bytes().await.unwrap().to_vec(), quiverdb_wire::IAMNULL123.to_vec());
}

#[tokio::test]
async fn get_before_connect_reports_db_not_found() {
    let (base, _dir, _server) = spawn_server().await;
    let client = reqwest::Client::new();
    let resp = client.post(format!("{base}/get?db_name=ghost")).body(b"k".to_vec()).send().await.unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn set_batch_stream_fans_out_to_other_subscribers() {
    let (base, _dir, _server) = spawn_server().await;
    let client = reqwest::Client::new();

    let writer_id = ClientId::new();
    let reader_id = ClientId::new();
    let writer_connect = ConnectRequest { db_name: "demo".into(), backend: "lsm".into(), rebuild: false, client_id: writer_id };
    let reader_connect = ConnectRequest { db_name: "demo".into(), backend: "lsm".into(), rebuild: false, client_id: reader_id };
    let writer_stream = client.post(format!("{base}/connect")).json(&writer_connect).send().await.unwrap();
    let mut reader_stream = client.post(format!("{base}/connect")).json(&reader_connect).send().await.unwrap();

    let batch = quiverdb_wire::PutBatch { data: vec![(b"a".to_vec(), b"1".to_vec())], client_id: writer_id, time: 1 };
    let encoded = quiverdb_codec::encode(&batch.to_value()).unwrap();
    let part = reqwest::multipart::Part::bytes(encoded).file_name("demo".to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = client.post(format!("{base}/set_batch_stream")).multipart(form).send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), reader_stream.chunk()).await.unwrap().unwrap();
    assert!(chunk.is_some(), "the other subscriber should see the fanned-out delta");

    drop(writer_stream);
    drop(reader_stream);
}
