use crate::dashboard;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{no_workspace, store_err, str_param};
use crate::ipc::types::{AppState, Request};
use crate::portal::{Identity, PortalError, View};
use crate::store::{ExamStore, SqliteKv};
use serde_json::json;

fn identity_json(identity: &Identity) -> serde_json::Value {
    match identity {
        Identity::LoggedOut => json!(null),
        Identity::Admin => json!({ "role": "admin" }),
        Identity::Student { id, name } => json!({
            "role": "student",
            "studentId": id,
            "studentName": name,
        }),
    }
}

/// The routed view plus whatever that view renders.
pub fn view_json(state: &AppState, req: &Request) -> serde_json::Value {
    let view = state.portal.view();
    let payload = match view {
        View::Login | View::NoExamAvailable => json!(null),
        View::AdminDashboard => {
            let Some(conn) = state.db.as_ref() else {
                return no_workspace(req);
            };
            match dashboard::admin_dashboard(&ExamStore::new(SqliteKv::new(conn))) {
                Ok(d) => json!(d),
                Err(e) => return store_err(req, &e),
            }
        }
        View::Exam => state
            .portal
            .session()
            .map(|s| json!(dashboard::exam_view(s)))
            .unwrap_or(json!(null)),
        View::Submitted => state
            .portal
            .session()
            .and_then(dashboard::submission_receipt)
            .map(|r| json!(r))
            .unwrap_or(json!(null)),
    };
    ok(
        &req.id,
        json!({
            "view": view,
            "identity": identity_json(state.portal.identity()),
            "payload": payload,
        }),
    )
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(req);
    };
    let (Some(role), Some(username), Some(password)) = (
        str_param(req, "role"),
        str_param(req, "username"),
        str_param(req, "password"),
    ) else {
        return err(
            &req.id,
            "bad_params",
            "missing role, username or password",
            None,
        );
    };

    let res = match role {
        "admin" => state.portal.login_admin(&state.config, username, password),
        "student" => {
            let store = ExamStore::new(SqliteKv::new(conn));
            state.portal.login_student(
                &store,
                &state.config,
                username,
                password,
                &mut rand::thread_rng(),
            )
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                "role must be admin or student",
                Some(json!({ "role": other })),
            )
        }
    };

    match res {
        Ok(()) => view_json(state, req),
        Err(PortalError::InvalidCredentials) => {
            tracing::warn!(role, username, "login rejected");
            err(&req.id, "invalid_credentials", "invalid username or password", None)
        }
        Err(PortalError::Store(e)) => store_err(req, &e),
        Err(PortalError::Session(e)) => crate::ipc::helpers::session_err(req, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.portal.logout();
    view_json(state, req)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.view" => Some(view_json(state, req)),
        _ => None,
    }
}
