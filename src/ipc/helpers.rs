use crate::import::{self, ImportError, Row};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::session::SessionError;
use crate::store::StoreError;
use serde_json::json;
use std::path::PathBuf;

pub fn str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn no_workspace(req: &Request) -> serde_json::Value {
    err(&req.id, "no_workspace", "select a workspace first", None)
}

pub fn require_admin(state: &AppState, req: &Request) -> Result<(), serde_json::Value> {
    if state.portal.is_admin() {
        return Ok(());
    }
    Err(err(&req.id, "not_authorized", "admin login required", None))
}

pub fn store_err(req: &Request, e: &StoreError) -> serde_json::Value {
    tracing::error!(method = %req.method, error = %e, "store failure");
    err(&req.id, "store_failed", e.to_string(), None)
}

pub fn import_err(req: &Request, e: ImportError) -> serde_json::Value {
    match e {
        ImportError::InvalidRows(issues) => err(
            &req.id,
            "import_invalid",
            format!("{} row issue(s); nothing was imported", issues.len()),
            Some(json!({ "issues": issues })),
        ),
        ImportError::Store(e) => store_err(req, &e),
    }
}

pub fn session_err(req: &Request, e: SessionError) -> serde_json::Value {
    let code = match &e {
        SessionError::NoExamAvailable | SessionError::EmptyPaper(_) => "no_exam",
        SessionError::NotInProgress => "session_closed",
        SessionError::UnknownQuestion(_) => "unknown_question",
        SessionError::InvalidOption { .. } => "invalid_option",
        SessionError::Store(s) => return store_err(req, s),
    };
    err(&req.id, code, e.to_string(), None)
}

/// Import rows come inline as `params.rows` or from a file at `params.path`.
pub fn rows_param(req: &Request) -> Result<Vec<Row>, serde_json::Value> {
    if let Some(rows) = req.params.get("rows") {
        return import::rows_from_json(rows)
            .map_err(|e| err(&req.id, "bad_params", e.to_string(), None));
    }
    let Some(path) = str_param(req, "path") else {
        return Err(err(&req.id, "bad_params", "missing rows or path", None));
    };
    import::read_rows_file(&PathBuf::from(path)).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("{e:#}"),
            Some(json!({ "path": path })),
        )
    })
}
