mod common;

use common::{
    initialize_request, read_message, send_lsp_message, shutdown_server, spawn_server, take_reader,
};
use serde_json::Value;

#[test]
fn initialize_smoke() {
    let mut server = spawn_server();
    let mut reader = take_reader(&mut server);

    send_lsp_message(&mut server, &initialize_request());
    let response = read_message(&mut reader);
    validate_initialize_response(&response);

    shutdown_server(server);
}

fn validate_initialize_response(response: &Value) {
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
    assert_eq!(capabilities.get("documentSymbolProvider"), Some(&Value::Bool(true)));
    assert_eq!(capabilities.get("hoverProvider"), Some(&Value::Bool(true)));
    // Full document sync
    assert_eq!(
        capabilities.get("textDocumentSync").and_then(Value::as_i64),
        Some(1)
    );
    assert!(capabilities.get("completionProvider").is_none());

    assert_eq!(
        result.pointer("/serverInfo/name").and_then(Value::as_str),
        Some("toolpath-ls")
    );
}
