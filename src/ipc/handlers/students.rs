use crate::dashboard;
use crate::import;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{import_err, no_workspace, require_admin, rows_param, store_err, str_param};
use crate::ipc::types::{AppState, Request};
use crate::store::{ExamStore, SqliteKv};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    match dashboard::students(&ExamStore::new(SqliteKv::new(conn))) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => store_err(req, &e),
    }
}

fn handle_students_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let rows = match rows_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match import::import_students(&ExamStore::new(SqliteKv::new(conn)), &rows) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => import_err(req, e),
    }
}

fn handle_students_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    match ExamStore::new(SqliteKv::new(conn)).clear_students() {
        Ok(()) => {
            tracing::info!("student roster cleared");
            ok(&req.id, json!({ "cleared": true }))
        }
        Err(e) => store_err(req, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let Some(student_id) = str_param(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    match dashboard::delete_student(&ExamStore::new(SqliteKv::new(conn)), student_id) {
        Ok(true) => ok(&req.id, json!({ "studentId": student_id })),
        Ok(false) => err(
            &req.id,
            "not_found",
            "student not found",
            Some(json!({ "studentId": student_id })),
        ),
        Err(e) => store_err(req, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&mut AppState, &Request) -> serde_json::Value = match req.method.as_str() {
        "students.list" => handle_students_list,
        "students.import" => handle_students_import,
        "students.clear" => handle_students_clear,
        "students.delete" => handle_students_delete,
        _ => return None,
    };
    if let Err(resp) = require_admin(state, req) {
        return Some(resp);
    }
    Some(handler(state, req))
}
