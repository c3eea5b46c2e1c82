use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{no_workspace, require_admin, str_param};
use crate::ipc::types::{AppState, Request};
use crate::store::{ExamStore, SqliteKv};
use serde_json::json;
use std::path::PathBuf;

fn handle_responses_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let Some(student_id) = str_param(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    // Defaults to <workspace>/exports.
    let out_dir = match str_param(req, "outDir") {
        Some(p) => PathBuf::from(p),
        None => match state.workspace.as_ref() {
            Some(ws) => ws.join("exports"),
            None => return no_workspace(req),
        },
    };

    let store = ExamStore::new(SqliteKv::new(conn));
    match export::export_student_responses(&store, student_id, &out_dir) {
        Ok(file) => ok(
            &req.id,
            json!({
                "path": file.path.to_string_lossy(),
                "fileName": export::response_file_name(student_id),
                "responseCount": file.response_count,
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

fn handle_responses_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let Some(out_path) = str_param(req, "outPath").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    let store = ExamStore::new(SqliteKv::new(conn));
    match export::export_responses_bundle(&store, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "bundleFormat": summary.bundle_format,
                "studentCount": summary.student_count,
                "responseCount": summary.response_count,
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&mut AppState, &Request) -> serde_json::Value = match req.method.as_str() {
        "responses.export" => handle_responses_export,
        "responses.exportBundle" => handle_responses_export_bundle,
        _ => return None,
    };
    if let Err(resp) = require_admin(state, req) {
        return Some(resp);
    }
    Some(handler(state, req))
}
