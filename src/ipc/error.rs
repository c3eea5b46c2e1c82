use serde_json::json;

/// Success envelope: `{"id","ok":true,"result"}`.
pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({ "id": id, "ok": true, "result": result })
}

fn error_body(code: &str, message: String, details: Option<serde_json::Value>) -> serde_json::Value {
    let mut body = json!({ "code": code, "message": message });
    if let Some(d) = details {
        body["details"] = d;
    }
    body
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let message = message.into();
    tracing::debug!(id, code, %message, "request failed");
    json!({ "id": id, "ok": false, "error": error_body(code, message, details) })
}

/// Reply to a line that did not parse; there is no id to echo back.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    json!({ "ok": false, "error": error_body("bad_json", message.into(), None) })
}
