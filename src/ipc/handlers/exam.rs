use crate::dashboard;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{no_workspace, session_err, str_param};
use crate::ipc::types::{AppState, Request};
use crate::session::{ExamSession, SubmitOutcome};
use crate::store::{ExamStore, SqliteKv};
use serde_json::json;

fn no_session(req: &Request) -> serde_json::Value {
    err(&req.id, "no_session", "no exam session is open", None)
}

fn view(req: &Request, session: &ExamSession) -> serde_json::Value {
    ok(&req.id, json!(dashboard::exam_view(session)))
}

fn handle_exam_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.portal.session() {
        Some(s) => view(req, s),
        None => no_session(req),
    }
}

fn handle_exam_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.portal.session_mut() else {
        return no_session(req);
    };
    let (Some(question_id), Some(answer)) = (str_param(req, "questionId"), str_param(req, "answer"))
    else {
        return err(&req.id, "bad_params", "missing questionId or answer", None);
    };
    match session.record_answer(question_id, answer) {
        Ok(()) => view(req, session),
        Err(e) => session_err(req, e),
    }
}

fn handle_exam_goto(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.portal.session_mut() else {
        return no_session(req);
    };
    let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing index", None);
    };
    session.go_to(usize::try_from(index).unwrap_or(usize::MAX));
    view(req, session)
}

fn handle_exam_next(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.portal.session_mut() else {
        return no_session(req);
    };
    session.next();
    view(req, session)
}

fn handle_exam_previous(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.portal.session_mut() else {
        return no_session(req);
    };
    session.previous();
    view(req, session)
}

fn handle_exam_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let Some(session) = state.portal.session_mut() else {
        return no_session(req);
    };
    let store = ExamStore::new(SqliteKv::new(conn));
    match session.submit(&store) {
        Ok(SubmitOutcome::Submitted(response)) => ok(
            &req.id,
            json!({ "alreadySubmitted": false, "response": response }),
        ),
        Ok(SubmitOutcome::AlreadySubmitted) => ok(
            &req.id,
            json!({ "alreadySubmitted": true, "response": session.response() }),
        ),
        Err(e) => session_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exam.view" => Some(handle_exam_view(state, req)),
        "exam.answer" => Some(handle_exam_answer(state, req)),
        "exam.goto" => Some(handle_exam_goto(state, req)),
        "exam.next" => Some(handle_exam_next(state, req)),
        "exam.previous" => Some(handle_exam_previous(state, req)),
        "exam.submit" => Some(handle_exam_submit(state, req)),
        _ => None,
    }
}
