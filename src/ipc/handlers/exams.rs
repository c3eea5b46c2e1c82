use crate::dashboard;
use crate::import;
use crate::ipc::error::ok;
use crate::ipc::helpers::{import_err, no_workspace, require_admin, rows_param, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{ExamStore, SqliteKv};
use serde_json::json;

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "examPapers": [] }));
    };
    match dashboard::paper_summaries(&ExamStore::new(SqliteKv::new(conn))) {
        Ok(papers) => ok(&req.id, json!({ "examPapers": papers })),
        Err(e) => store_err(req, &e),
    }
}

fn handle_exams_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let rows = match rows_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match import::import_exams(&ExamStore::new(SqliteKv::new(conn)), &rows) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => import_err(req, e),
    }
}

fn handle_exams_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    match ExamStore::new(SqliteKv::new(conn)).clear_exam_papers() {
        Ok(()) => {
            tracing::info!("exam papers cleared");
            ok(&req.id, json!({ "cleared": true }))
        }
        Err(e) => store_err(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&mut AppState, &Request) -> serde_json::Value = match req.method.as_str() {
        "exams.list" => handle_exams_list,
        "exams.import" => handle_exams_import,
        "exams.clear" => handle_exams_clear,
        _ => return None,
    };
    if let Err(resp) = require_admin(state, req) {
        return Some(resp);
    }
    Some(handler(state, req))
}
