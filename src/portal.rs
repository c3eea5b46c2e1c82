use crate::config::Config;
use crate::session::{ExamSession, SessionError, SessionState, SubmitOutcome};
use crate::store::{ExamStore, KvStore, StoreError};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    LoggedOut,
    Admin,
    Student { id: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Login,
    AdminDashboard,
    Exam,
    NoExamAvailable,
    Submitted,
}

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Who is logged in and, for a student, the attempt in front of them.
#[derive(Debug)]
pub struct Portal {
    identity: Identity,
    session: Option<ExamSession>,
}

impl Default for Portal {
    fn default() -> Self {
        Self {
            identity: Identity::LoggedOut,
            session: None,
        }
    }
}

impl Portal {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_admin(&self) -> bool {
        self.identity == Identity::Admin
    }

    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ExamSession> {
        self.session.as_mut()
    }

    pub fn view(&self) -> View {
        match (&self.identity, &self.session) {
            (Identity::LoggedOut, _) => View::Login,
            (Identity::Admin, _) => View::AdminDashboard,
            (Identity::Student { .. }, None) => View::NoExamAvailable,
            (Identity::Student { .. }, Some(s)) if s.state() == SessionState::Submitted => {
                View::Submitted
            }
            (Identity::Student { .. }, Some(_)) => View::Exam,
        }
    }

    pub fn login_admin(&mut self, config: &Config, username: &str, password: &str) -> Result<(), PortalError> {
        if username != config.admin_username || password != config.admin_password {
            return Err(PortalError::InvalidCredentials);
        }
        self.logout();
        self.identity = Identity::Admin;
        tracing::info!("admin logged in");
        Ok(())
    }

    /// Plaintext match against the roster, then opens an attempt on the
    /// active paper. A missing paper leaves the student on NoExamAvailable.
    pub fn login_student<K: KvStore, R: Rng + ?Sized>(
        &mut self,
        store: &ExamStore<K>,
        config: &Config,
        username: &str,
        password: &str,
        rng: &mut R,
    ) -> Result<(), PortalError> {
        let student = store
            .students()?
            .into_iter()
            .find(|s| s.username == username && s.password == password)
            .ok_or(PortalError::InvalidCredentials)?;

        let session = match ExamSession::open(store, &student, config.exam_duration_secs, rng) {
            Ok(s) => Some(s),
            Err(SessionError::NoExamAvailable) | Err(SessionError::EmptyPaper(_)) => {
                tracing::warn!(student = %student.id, "no exam available");
                None
            }
            Err(e) => return Err(e.into()),
        };

        self.logout();
        self.identity = Identity::Student {
            id: student.id.clone(),
            name: student.username.clone(),
        };
        self.session = session;
        tracing::info!(student = %student.id, "student logged in");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(s) = &self.session {
            if s.state() == SessionState::InProgress {
                tracing::warn!(
                    answered = s.answered_count(),
                    "logout discards an unsubmitted attempt"
                );
            }
        }
        if self.identity != Identity::LoggedOut {
            tracing::info!("logged out");
        }
        self.identity = Identity::LoggedOut;
        self.session = None;
    }

    /// One countdown second for the open attempt, if any.
    pub fn tick<K: KvStore>(&mut self, store: &ExamStore<K>) -> Result<Option<SubmitOutcome>, SessionError> {
        match self.session.as_mut() {
            Some(s) => s.tick(store),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{paper, student};
    use crate::store::memory::MemoryKv;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_store(with_paper: bool) -> ExamStore<MemoryKv> {
        let store = ExamStore::new(MemoryKv::default());
        store.save_students(&[student()]).expect("students");
        if with_paper {
            store.save_exam_papers(&[paper(3)]).expect("papers");
        }
        store
    }

    #[test]
    fn starts_at_login() {
        assert_eq!(Portal::default().view(), View::Login);
    }

    #[test]
    fn admin_login_checks_configured_credentials() {
        let cfg = Config::default();
        let mut p = Portal::default();
        assert!(matches!(
            p.login_admin(&cfg, "admin", "wrong"),
            Err(PortalError::InvalidCredentials)
        ));
        assert_eq!(p.view(), View::Login);
        p.login_admin(&cfg, "admin", "admin").expect("login");
        assert_eq!(p.view(), View::AdminDashboard);
        p.logout();
        assert_eq!(p.view(), View::Login);
    }

    #[test]
    fn student_login_routes_to_exam_then_receipt() {
        let store = seeded_store(true);
        let cfg = Config::default();
        let mut p = Portal::default();
        p.login_student(&store, &cfg, "ana", "pw", &mut StdRng::seed_from_u64(3))
            .expect("login");
        assert_eq!(p.view(), View::Exam);
        assert_eq!(
            p.identity(),
            &Identity::Student {
                id: "s1".into(),
                name: "ana".into()
            }
        );

        p.session_mut().expect("session").submit(&store).expect("submit");
        assert_eq!(p.view(), View::Submitted);
        p.logout();
        assert_eq!(p.view(), View::Login);
        assert!(p.session().is_none());
    }

    #[test]
    fn student_without_paper_sees_no_exam_state() {
        let store = seeded_store(false);
        let mut p = Portal::default();
        p.login_student(&store, &Config::default(), "ana", "pw", &mut StdRng::seed_from_u64(3))
            .expect("login");
        assert_eq!(p.view(), View::NoExamAvailable);
        assert!(p.tick(&store).expect("tick").is_none());
    }

    #[test]
    fn wrong_student_password_is_rejected() {
        let store = seeded_store(true);
        let mut p = Portal::default();
        let err = p
            .login_student(&store, &Config::default(), "ana", "PW", &mut StdRng::seed_from_u64(3))
            .expect_err("reject");
        assert!(matches!(err, PortalError::InvalidCredentials));
        assert_eq!(p.view(), View::Login);
    }

    #[test]
    fn logout_discards_attempt_without_writing() {
        let store = seeded_store(true);
        let mut p = Portal::default();
        p.login_student(&store, &Config::default(), "ana", "pw", &mut StdRng::seed_from_u64(3))
            .expect("login");
        p.logout();
        assert!(store.responses().expect("log").is_empty());
    }
}
