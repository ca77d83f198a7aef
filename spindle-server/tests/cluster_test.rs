// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end scenarios over real HTTP: a naming server and one or two
//! storage servers on ephemeral ports, driven through the public routes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use spindle_common::conf::{NamingConf, StorageConf};
use spindle_server::naming::NamingServer;
use spindle_server::storage::StorageServer;
use std::collections::HashSet;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

const SETTLE: Duration = Duration::from_millis(150);
const WAIT: Duration = Duration::from_secs(5);

struct Naming {
    service_port: u16,
    registration_port: u16,
}

struct Storage {
    client_port: u16,
    command_port: u16,
    dir: TempDir,
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn start_naming() -> Naming {
    let (service, service_port) = bind().await;
    let (registration, registration_port) = bind().await;
    let server = NamingServer::new(NamingConf::new(service_port, registration_port));
    tokio::spawn(server.serve(service, registration));
    Naming {
        service_port,
        registration_port,
    }
}

/// Seeds the storage root, registers (which already prunes duplicates),
/// then starts serving.
async fn start_storage(registration_port: u16, seed: &[(&str, &[u8])]) -> Storage {
    let dir = TempDir::new().unwrap();
    for (path, data) in seed {
        let full = dir.path().join(path.trim_start_matches('/'));
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, data).unwrap();
    }

    let (client, client_port) = bind().await;
    let (command, command_port) = bind().await;
    let conf = StorageConf::new(client_port, command_port, registration_port, dir.path());
    let server = StorageServer::new(conf);
    server.register().await.unwrap();
    tokio::spawn(server.serve(client, command));

    Storage {
        client_port,
        command_port,
        dir,
    }
}

async fn post(port: u16, route: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/{}", port, route))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn post_value(port: u16, route: &str, body: Value) -> Value {
    post(port, route, body).await.json().await.unwrap()
}

#[tokio::test]
async fn register_then_read() {
    let naming = start_naming().await;
    let s1 = start_storage(
        naming.registration_port,
        &[("/a.txt", b"hello"), ("/d/b.txt", b"world")],
    )
    .await;

    let resp = post_value(naming.service_port, "is_directory", json!({"path": "/d"})).await;
    assert_eq!(resp["success"], json!(true));

    let resp = post_value(naming.service_port, "list", json!({"path": "/"})).await;
    let names: HashSet<&str> = resp["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(names, HashSet::from(["a.txt", "d"]));

    let resp = post_value(naming.service_port, "get_storage", json!({"path": "/a.txt"})).await;
    assert_eq!(resp["server_port"], json!(s1.client_port));

    // read the bytes straight from the storage server it named
    let resp = post_value(
        s1.client_port,
        "storage_read",
        json!({"path": "/a.txt", "offset": 0, "length": -1}),
    )
    .await;
    let data = BASE64.decode(resp["data"].as_str().unwrap()).unwrap();
    assert_eq!(data, b"hello");
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let naming = start_naming().await;
    let s1 = start_storage(naming.registration_port, &[]).await;

    let resp = post(
        naming.registration_port,
        "register",
        json!({
            "storage_ip": "127.0.0.1",
            "client_port": s1.client_port,
            "command_port": s1.command_port,
            "files": [],
        }),
    )
    .await;
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["exception_type"], json!("IllegalStateException"));
}

#[tokio::test]
async fn duplicate_files_are_pruned_on_registration() {
    let naming = start_naming().await;
    let _s1 = start_storage(naming.registration_port, &[("/x", b"one")]).await;
    let s2 = start_storage(
        naming.registration_port,
        &[("/x", b"two"), ("/y", b"yy")],
    )
    .await;

    // the naming server already knew /x, so s2 dropped its copy
    assert!(!s2.dir.path().join("x").exists());
    assert!(s2.dir.path().join("y").exists());

    let resp = post_value(naming.service_port, "list", json!({"path": "/"})).await;
    let names: HashSet<&str> = resp["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(names, HashSet::from(["x", "y"]));

    let resp = post_value(naming.service_port, "get_storage", json!({"path": "/y"})).await;
    assert_eq!(resp["server_port"], json!(s2.client_port));
}

/// Twenty shared locks push one replica onto the idle server.
async fn escalate(naming: &Naming, path: &str) {
    for _ in 0..20 {
        let resp = post(
            naming.service_port,
            "lock",
            json!({"path": path, "exclusive": false}),
        )
        .await;
        assert!(resp.status().is_success());
        let resp = post(
            naming.service_port,
            "unlock",
            json!({"path": path, "exclusive": false}),
        )
        .await;
        assert!(resp.status().is_success());
    }
}

#[tokio::test]
async fn read_burst_replicates_to_a_second_server() {
    let naming = start_naming().await;
    let _s1 = start_storage(naming.registration_port, &[("/f", b"data")]).await;
    let s2 = start_storage(naming.registration_port, &[]).await;

    escalate(&naming, "/f").await;

    // the copy is awaited inside the lock call, so the bytes are already on s2
    assert_eq!(std::fs::read(s2.dir.path().join("f")).unwrap(), b"data");

    // both replicas eventually show up through get_storage
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let resp = post_value(naming.service_port, "get_storage", json!({"path": "/f"})).await;
        seen.insert(resp["server_port"].as_u64().unwrap() as u16);
        if seen.len() == 2 {
            break;
        }
    }
    assert_eq!(seen.len(), 2, "expected both replicas to serve reads");
}

#[tokio::test]
async fn write_lock_invalidates_the_extra_replica() {
    let naming = start_naming().await;
    let s1 = start_storage(naming.registration_port, &[("/f", b"data")]).await;
    let s2 = start_storage(naming.registration_port, &[]).await;

    escalate(&naming, "/f").await;
    assert!(s2.dir.path().join("f").exists());

    let resp = post(
        naming.service_port,
        "lock",
        json!({"path": "/f", "exclusive": true}),
    )
    .await;
    assert!(resp.status().is_success());
    // the delete is awaited before the lock call returns
    assert!(!s2.dir.path().join("f").exists());
    assert!(s1.dir.path().join("f").exists());

    let resp = post(
        naming.service_port,
        "unlock",
        json!({"path": "/f", "exclusive": true}),
    )
    .await;
    assert!(resp.status().is_success());

    for _ in 0..20 {
        let resp = post_value(naming.service_port, "get_storage", json!({"path": "/f"})).await;
        assert_eq!(resp["server_port"], json!(s1.client_port));
    }
}

#[tokio::test]
async fn delete_fans_out_to_every_replica() {
    let naming = start_naming().await;
    let s1 = start_storage(naming.registration_port, &[("/f", b"data")]).await;
    let s2 = start_storage(naming.registration_port, &[]).await;

    escalate(&naming, "/f").await;
    assert!(s2.dir.path().join("f").exists());

    let resp = post_value(naming.service_port, "delete", json!({"path": "/f"})).await;
    assert_eq!(resp["success"], json!(true));

    // deletes were awaited, so both copies are gone by now
    assert!(!s1.dir.path().join("f").exists());
    assert!(!s2.dir.path().join("f").exists());

    let resp = post_value(naming.service_port, "is_valid_path", json!({"path": "/f"})).await;
    assert_eq!(resp["success"], json!(false));
}

#[tokio::test]
async fn queued_writer_is_granted_before_a_later_reader() {
    let naming = start_naming().await;
    let _s1 = start_storage(naming.registration_port, &[]).await;

    let resp = post_value(
        naming.service_port,
        "create_directory",
        json!({"path": "/p"}),
    )
    .await;
    assert_eq!(resp["success"], json!(true));

    // A holds /p shared
    let resp = post(
        naming.service_port,
        "lock",
        json!({"path": "/p", "exclusive": false}),
    )
    .await;
    assert!(resp.status().is_success());

    let (events, mut granted) = mpsc::unbounded_channel();

    let writer = {
        let events = events.clone();
        let port = naming.service_port;
        tokio::spawn(async move {
            let resp = post(port, "lock", json!({"path": "/p", "exclusive": true})).await;
            assert!(resp.status().is_success());
            events.send("writer").unwrap();
        })
    };
    sleep(SETTLE).await;

    let reader = {
        let events = events.clone();
        let port = naming.service_port;
        tokio::spawn(async move {
            let resp = post(port, "lock", json!({"path": "/p", "exclusive": false})).await;
            assert!(resp.status().is_success());
            events.send("reader").unwrap();
        })
    };
    sleep(SETTLE).await;

    // A releases; the queued writer must win even though the reader is
    // compatible with A's shared hold.
    let resp = post(
        naming.service_port,
        "unlock",
        json!({"path": "/p", "exclusive": false}),
    )
    .await;
    assert!(resp.status().is_success());

    let first = timeout(WAIT, granted.recv()).await.unwrap().unwrap();
    assert_eq!(first, "writer");
    writer.await.unwrap();

    let resp = post(
        naming.service_port,
        "unlock",
        json!({"path": "/p", "exclusive": true}),
    )
    .await;
    assert!(resp.status().is_success());

    let second = timeout(WAIT, granted.recv()).await.unwrap().unwrap();
    assert_eq!(second, "reader");
    reader.await.unwrap();

    let resp = post(
        naming.service_port,
        "unlock",
        json!({"path": "/p", "exclusive": false}),
    )
    .await;
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn create_and_delete_round_trip() {
    let naming = start_naming().await;
    let s1 = start_storage(naming.registration_port, &[]).await;

    let resp = post_value(naming.service_port, "create_file", json!({"path": "/g"})).await;
    assert_eq!(resp["success"], json!(true));
    sleep(SETTLE).await;
    assert!(s1.dir.path().join("g").exists());

    let resp = post_value(naming.service_port, "delete", json!({"path": "/g"})).await;
    assert_eq!(resp["success"], json!(true));
    assert!(!s1.dir.path().join("g").exists());

    let resp = post_value(naming.service_port, "is_valid_path", json!({"path": "/g"})).await;
    assert_eq!(resp["success"], json!(false));
}

#[tokio::test]
async fn edge_cases_and_error_statuses() {
    let naming = start_naming().await;

    // no storage server registered yet
    let resp = post(naming.service_port, "create_file", json!({"path": "/z"})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);

    let _s1 = start_storage(naming.registration_port, &[]).await;

    let resp = post_value(naming.service_port, "delete", json!({"path": "/"})).await;
    assert_eq!(resp["success"], json!(false));
    let resp = post_value(naming.service_port, "create_file", json!({"path": "/"})).await;
    assert_eq!(resp["success"], json!(false));

    let resp = post_value(
        naming.service_port,
        "create_directory",
        json!({"path": "/d"}),
    )
    .await;
    assert_eq!(resp["success"], json!(true));
    let resp = post_value(
        naming.service_port,
        "create_directory",
        json!({"path": "/d"}),
    )
    .await;
    assert_eq!(resp["success"], json!(false));

    // wrong-kind lookups
    let resp = post(naming.service_port, "get_storage", json!({"path": "/d"})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let resp = post_value(naming.service_port, "create_file", json!({"path": "/d/f"})).await;
    assert_eq!(resp["success"], json!(true));
    let resp = post(naming.service_port, "list", json!({"path": "/d/f"})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    // malformed paths and unlocked unlocks are the caller's fault
    let resp = post(naming.service_port, "is_valid_path", json!({"path": "no-slash"})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let resp = post(
        naming.service_port,
        "unlock",
        json!({"path": "/d", "exclusive": false}),
    )
    .await;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["exception_type"], json!("IllegalArgumentException"));
}
