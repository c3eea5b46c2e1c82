use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use crate::store::{ExamStore, SqliteKv};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::exams::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::responses::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::exam::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

/// One countdown second. Runs on the same thread as requests, so a
/// timeout and a manual submit are never in flight together.
pub fn handle_tick(state: &mut AppState) {
    let Some(conn) = state.db.as_ref() else {
        return;
    };
    let store = ExamStore::new(SqliteKv::new(conn));
    if let Err(e) = state.portal.tick(&store) {
        tracing::error!(error = %e, "auto-submit failed");
    }
}
