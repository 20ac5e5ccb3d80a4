//! Integration tests for the host bridge.
//!
//! These tests verify JSON-RPC message parsing and drive a full server over
//! an in-memory duplex stream, with the test playing the host shim.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use snapeda_importer::bridge::protocol::{parse_message, IncomingMessage, RequestId};
use snapeda_importer::bridge::{BridgeOptions, BridgeServer, LineTransport, ServerState};
use snapeda_importer::import::ImportSettings;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_opened_from_url_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 7,
        "method": "openedFromUrl",
        "params": {
            "privateInfo": "{\"lib_path\": \"/tmp/dl\", \"target_library\": \"R0805.lbr\"}"
        }
    }"#;

    let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
        panic!("Expected Request");
    };
    assert_eq!(req.method, "openedFromUrl");
    assert_eq!(req.id, RequestId::Number(7));
    assert!(req.params.unwrap()["privateInfo"].is_string());
}

#[test]
fn test_parse_exit_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "exit"}"#;

    let IncomingMessage::Notification(notif) = parse_message(json).unwrap() else {
        panic!("Expected Notification");
    };
    assert_eq!(notif.method, "exit");
}

#[test]
fn test_parse_host_reply() {
    let json = r#"{"jsonrpc": "2.0", "id": 3, "result": [{"id": "urn:x", "name": "SnapEDA Library"}]}"#;

    let IncomingMessage::Reply(reply) = parse_message(json).unwrap() else {
        panic!("Expected Reply");
    };
    assert_eq!(reply.id, RequestId::Number(3));
    assert!(reply.result.unwrap().is_array());
}

#[test]
fn test_parse_reply_without_result_or_error() {
    let json = r#"{"jsonrpc": "2.0", "id": 3}"#;
    assert!(parse_message(json).is_err());
}

#[test]
fn test_parse_invalid_json() {
    let error = parse_message("not valid json").unwrap_err();
    assert_eq!(error.error.code, -32700);
}

#[test]
fn test_parse_wrong_version() {
    let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#;
    assert!(parse_message(json).is_err());
}

// =============================================================================
// Server Round Trips
// =============================================================================

async fn send(writer: &mut WriteHalf<DuplexStream>, message: Value) {
    writer
        .write_all(format!("{message}\n").as_bytes())
        .await
        .unwrap();
}

fn options(plugin_dir: &std::path::Path) -> BridgeOptions {
    BridgeOptions {
        settings: ImportSettings {
            plugin_dir: plugin_dir.to_path_buf(),
            ..ImportSettings::default()
        },
        client_executable: plugin_dir.join("no-such-client"),
        client_image_name: None,
        host_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_session_over_duplex_with_deferred_ping() {
    let plugin_dir = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();

    let (bridge_end, shim_end) = tokio::io::duplex(64 * 1024);
    let (bridge_read, bridge_write) = tokio::io::split(bridge_end);
    let mut server = BridgeServer::new(
        LineTransport::new(BufReader::new(bridge_read), bridge_write),
        options(plugin_dir.path()),
    );

    let private_info = json!({
        "lib_path": downloads.path().to_string_lossy(),
        "target_library": "MISSING.lbr",
    })
    .to_string();

    let shim = async move {
        let (shim_read, mut shim_write) = tokio::io::split(shim_end);
        let mut lines = BufReader::new(shim_read).lines();

        send(&mut shim_write, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        send(
            &mut shim_write,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "openedFromUrl",
                "params": {"privateInfo": private_info}
            }),
        )
        .await;
        send(&mut shim_write, json!({"jsonrpc": "2.0", "id": 3, "method": "ping"})).await;

        let mut created = false;
        let mut host_calls = Vec::new();
        let mut responses = HashMap::new();
        while responses.len() < 3 {
            let line = lines.next_line().await.unwrap().unwrap();
            let msg: Value = serde_json::from_str(&line).unwrap();
            let Some(method) = msg["method"].as_str() else {
                responses.insert(msg["id"].as_i64().unwrap(), msg);
                continue;
            };
            host_calls.push(method.to_string());
            let result = match method {
                "host/listRootFolder" if created => {
                    json!([{"id": "urn:lib", "name": "SnapEDA Library"}])
                }
                "host/listRootFolder" => json!([]),
                "host/createDocument" => {
                    created = true;
                    json!({"name": msg["params"]["name"], "id": "urn:lib"})
                }
                _ => Value::Null,
            };
            send(
                &mut shim_write,
                json!({"jsonrpc": "2.0", "id": msg["id"], "result": result}),
            )
            .await;
        }

        send(&mut shim_write, json!({"jsonrpc": "2.0", "id": 4, "method": "shutdown"})).await;
        let line = lines.next_line().await.unwrap().unwrap();
        let shutdown: Value = serde_json::from_str(&line).unwrap();
        (responses, host_calls, shutdown)
    };

    let (served, (responses, host_calls, shutdown)) = tokio::join!(server.serve(), shim);
    served.unwrap();
    assert_eq!(server.state(), ServerState::ShuttingDown);

    assert_eq!(responses[&1]["result"]["protocolVersion"], "1");
    assert_eq!(responses[&2]["result"]["status"], "skipped");
    assert_eq!(responses[&2]["result"]["target"]["origin"], "created");
    assert_eq!(responses[&2]["result"]["cached"], "urn:lib");
    assert_eq!(responses[&3]["result"], json!({}));
    assert_eq!(shutdown["id"], 4);

    assert_eq!(
        host_calls,
        vec![
            "host/listRootFolder",
            "host/createDocument",
            "host/listRootFolder"
        ]
    );
    assert_eq!(
        std::fs::read_to_string(plugin_dir.path().join("team_urn.txt")).unwrap(),
        "urn:lib\n"
    );
}

#[tokio::test]
async fn test_unknown_method_and_failed_launch() {
    let plugin_dir = tempfile::tempdir().unwrap();
    let (bridge_end, shim_end) = tokio::io::duplex(16 * 1024);
    let (bridge_read, bridge_write) = tokio::io::split(bridge_end);
    let mut server = BridgeServer::new(
        LineTransport::new(BufReader::new(bridge_read), bridge_write),
        options(plugin_dir.path()),
    );

    let shim = async move {
        let (shim_read, mut shim_write) = tokio::io::split(shim_end);
        let mut lines = BufReader::new(shim_read).lines();
        let mut replies = Vec::new();

        for (id, method) in [(1, "initialize"), (2, "tools/list"), (3, "launchClient")] {
            send(&mut shim_write, json!({"jsonrpc": "2.0", "id": id, "method": method})).await;
            let line = lines.next_line().await.unwrap().unwrap();
            replies.push(serde_json::from_str::<Value>(&line).unwrap());
        }
        send(&mut shim_write, json!({"jsonrpc": "2.0", "method": "exit"})).await;
        replies
    };

    let (served, replies) = tokio::join!(server.serve(), shim);
    served.unwrap();

    assert!(replies[0].get("result").is_some());
    assert_eq!(replies[1]["error"]["code"], -32601);
    assert_eq!(replies[2]["error"]["code"], -32603);
    assert!(replies[2]["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to launch client"));
    assert!(replies[2]["error"]["data"]["path"]
        .as_str()
        .unwrap()
        .ends_with("no-such-client"));
    assert!(server.clients().is_empty());
}

#[tokio::test]
async fn test_undecodable_url_payload_answers_with_result() {
    let plugin_dir = tempfile::tempdir().unwrap();
    let (bridge_end, shim_end) = tokio::io::duplex(16 * 1024);
    let (bridge_read, bridge_write) = tokio::io::split(bridge_end);
    let mut server = BridgeServer::new(
        LineTransport::new(BufReader::new(bridge_read), bridge_write),
        options(plugin_dir.path()),
    );

    let shim = async move {
        let (shim_read, mut shim_write) = tokio::io::split(shim_end);
        let mut lines = BufReader::new(shim_read).lines();
        let requests = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "openedFromUrl", "params": {"privateInfo": "{not json"}}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "openedFromUrl", "params": {}}),
            json!({"jsonrpc": "2.0", "id": 4, "method": "openedFromUrl"}),
            json!({"jsonrpc": "2.0", "id": 5, "method": "openedFromUrl", "params": [1, 2]}),
        ];

        let mut replies = Vec::new();
        for request in requests {
            send(&mut shim_write, request).await;
            let line = lines.next_line().await.unwrap().unwrap();
            replies.push(serde_json::from_str::<Value>(&line).unwrap());
        }
        send(&mut shim_write, json!({"jsonrpc": "2.0", "method": "exit"})).await;
        replies
    };

    let (served, replies) = tokio::join!(server.serve(), shim);
    served.unwrap();

    for reply in &replies[1..] {
        assert!(reply.get("error").is_none(), "unexpected error reply: {reply}");
        assert_eq!(reply["result"]["status"], "failed");
        assert_eq!(reply["result"]["severity"], "degraded");
    }
    assert!(replies[1]["result"]["error"]
        .as_str()
        .unwrap()
        .contains("not valid JSON"));
    assert!(!plugin_dir.path().join("team_urn.txt").exists());
}
