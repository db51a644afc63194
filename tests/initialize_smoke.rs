use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

const SERVER_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(200);
const DOCUMENT_URI: &str = "file:///tmp/greeting.ssml";

#[test]
fn initialize_smoke() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut server = spawn_server(home.path());
    let mut reader = take_reader(&mut server);

    // Send initialize request
    send_lsp_message(&mut server, &create_initialize_request());

    // Read and validate response
    let response = read_response(&mut reader, 1);
    validate_initialize_response(&response);

    // Clean shutdown
    shutdown_server(server);
}

#[test]
fn report_request() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut server = spawn_server(home.path());
    let mut reader = take_reader(&mut server);

    send_lsp_message(&mut server, &create_initialize_request());
    read_response(&mut reader, 1);
    send_lsp_message(
        &mut server,
        &serde_json::json!({ "jsonrpc": "2.0", "method": "initialized", "params": {} }),
    );

    send_lsp_message(
        &mut server,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": DOCUMENT_URI,
                    "languageId": "ssml",
                    "version": 1,
                    "text": "<speak>Hello <emphasis level=\"loud\">world</emphasis>!</speak>"
                }
            }
        }),
    );

    // Diagnostics are published once the document is stored
    let published = read_notification(&mut reader, "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["uri"], DOCUMENT_URI);
    let diagnostics = published["params"]["diagnostics"]
        .as_array()
        .expect("diagnostics array");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["source"], "ssml-ls");

    send_lsp_message(
        &mut server,
        &serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "ssml/report",
            "params": { "uri": DOCUMENT_URI }
        }),
    );

    let response = read_response(&mut reader, 2);
    let report = response
        .get("result")
        .expect("Response should contain 'result' field");

    assert_eq!(report["valid"], false);
    assert_eq!(
        report["errors"][0],
        "Invalid value 'loud' for attribute 'level' in tag <emphasis>"
    );
    assert_eq!(report["info"]["characterCount"], 12);
    assert_eq!(report["info"]["tagCount"], 4);

    shutdown_server(server);
}

fn spawn_server(home: &Path) -> std::process::Child {
    let bin_path = std::env::var("CARGO_BIN_EXE_ssml-ls")
        .unwrap_or_else(|_| "target/debug/ssml-ls".to_string());

    // Keep the schema template and project lookup away from the real user
    Command::new(bin_path)
        .current_dir(home)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("RUST_LOG", "warn")
        .spawn()
        .expect("Failed to spawn language server")
}

fn take_reader(child: &mut std::process::Child) -> BufReader<ChildStdout> {
    let stdout = child
        .stdout
        .take()
        .expect("Child stdout should be available");
    BufReader::new(stdout)
}

fn create_initialize_request() -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "processId": null,
            "rootUri": null,
            "capabilities": {
                "textDocument": {
                    "hover": { "dynamicRegistration": false },
                    "completion": { "dynamicRegistration": false }
                }
            },
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }
    })
}

fn send_lsp_message(child: &mut std::process::Child, message: &Value) {
    let body = message.to_string();
    let request = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);

    let stdin = child
        .stdin
        .as_mut()
        .expect("Child stdin should be available");
    stdin
        .write_all(request.as_bytes())
        .expect("Failed to write request");
    stdin.flush().expect("Failed to flush stdin");
}

/// Read messages until the response to `id`, skipping notifications
fn read_response(reader: &mut BufReader<ChildStdout>, id: i64) -> Value {
    read_until(reader, |message| {
        message.get("id").and_then(|v| v.as_i64()) == Some(id)
            && message.get("method").is_none()
    })
}

fn read_notification(reader: &mut BufReader<ChildStdout>, method: &str) -> Value {
    read_until(reader, |message| {
        message.get("method").and_then(|v| v.as_str()) == Some(method)
    })
}

fn read_until(reader: &mut BufReader<ChildStdout>, wanted: impl Fn(&Value) -> bool) -> Value {
    let start_time = Instant::now();

    loop {
        if start_time.elapsed() > SERVER_TIMEOUT {
            panic!("Timeout waiting for message");
        }

        let content_length = read_content_length_header(reader);
        let body = read_message_body(reader, content_length);
        let message: Value = serde_json::from_str(&body)
            .unwrap_or_else(|e| panic!("Invalid JSON response: {}\nBody: {}", e, body));

        if wanted(&message) {
            return message;
        }
    }
}

fn read_content_length_header(reader: &mut BufReader<ChildStdout>) -> usize {
    let start_time = Instant::now();
    let mut content_length = None;

    loop {
        if start_time.elapsed() > SERVER_TIMEOUT {
            panic!("Timeout waiting for response headers");
        }

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => panic!("Unexpected EOF while reading headers"),
            Ok(_) => {
                if line.trim().is_empty() {
                    // End of headers - we've consumed the empty line
                    break;
                }

                if let Some(length_str) = line.strip_prefix("Content-Length:") {
                    content_length = Some(
                        length_str
                            .trim()
                            .parse::<usize>()
                            .expect("Invalid Content-Length header"),
                    );
                }
            }
            Err(e) => panic!("Error reading headers: {}", e),
        }
    }

    content_length.expect("Missing Content-Length header")
}

fn read_message_body(reader: &mut BufReader<ChildStdout>, content_length: usize) -> String {
    let mut body_bytes = vec![0u8; content_length];
    std::io::Read::read_exact(reader, &mut body_bytes).expect("Failed to read response body");

    String::from_utf8(body_bytes).expect("Response body should be valid UTF-8")
}

fn validate_initialize_response(response: &Value) {
    // Validate JSON-RPC structure
    assert_eq!(
        response.get("jsonrpc").and_then(|v| v.as_str()),
        Some("2.0"),
        "Response should have jsonrpc: '2.0'"
    );

    assert_eq!(
        response.get("id").and_then(|v| v.as_i64()),
        Some(1),
        "Response should have matching request id"
    );

    let result = response
        .get("result")
        .expect("Response should contain 'result' field");
    let capabilities = result
        .get("capabilities")
        .expect("Result should contain server capabilities");

    assert!(capabilities.is_object(), "Capabilities should be an object");
    assert!(capabilities.get("hoverProvider").is_some(), "Should support hover");
    assert!(
        capabilities.get("documentSymbolProvider").is_some(),
        "Should support document symbols"
    );

    let triggers = &capabilities["completionProvider"]["triggerCharacters"];
    assert!(
        triggers
            .as_array()
            .is_some_and(|chars| chars.iter().any(|c| c == "<")),
        "Completion should trigger on '<'"
    );

    assert_eq!(result["serverInfo"]["name"], "ssml-ls");
}

fn shutdown_server(mut child: std::process::Child) {
    // Close stdin to signal we're done
    drop(child.stdin.take());

    // Give the server a moment to exit gracefully
    std::thread::sleep(SHUTDOWN_GRACE_PERIOD);

    match child.try_wait() {
        Ok(Some(status)) => {
            if !status.success() {
                eprintln!("Server exited with non-zero status: {:?}", status);
            }
        }
        Ok(None) => {
            // Still running, force termination
            eprintln!("Server didn't exit gracefully, forcing termination");
            let _ = child.kill();
            let _ = child.wait();
        }
        Err(e) => panic!("Error checking server status: {}", e),
    }
}
