// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Two remote clients connected to the same database: one client's write
//! is fanned out to the other but not echoed back to itself.

use quiverdb_client::RemoteTransport;
use quiverdb_server::{router, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(ServerState::new(dir.path().to_path_buf()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), dir)
}

#[tokio::test]
async fn a_clients_write_reaches_b_but_not_its_own_mirror() {
    let (base, _dir) = spawn_server().await;

    let a = RemoteTransport::connect(&base, "demo", "lsm", false).await.unwrap();
    let b = RemoteTransport::connect(&base, "demo", "lsm", false).await.unwrap();

    a.put(b"a".to_vec(), b"1".to_vec());
    a.flush().await.unwrap();

    let mut observed = false;
    for _ in 0..20 {
        if b.mirror_snapshot().get(b"a".as_slice()) == Some(&b"1".to_vec()) {
            observed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(observed, "B should observe A's write via the notification stream within 2s");

    // A never receives its own change on the notification stream: its
    // mirror was hydrated at connect time, before this write, and nothing
    // else touches it.
    assert_eq!(a.mirror_snapshot().get(b"a".as_slice()), None);

    a.disconnect().await.unwrap();
    b.disconnect().await.unwrap();
}
