use crate::model::{ExamPaper, ExamResponse, Question, ResponseAnswer, Student};
use crate::store::{ExamStore, KvStore, StoreError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

pub const DEFAULT_EXAM_SECONDS: u64 = 30 * 60;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no exam paper is available")]
    NoExamAvailable,
    #[error("exam paper {0} has no questions")]
    EmptyPaper(String),
    #[error("the attempt is not in progress")]
    NotInProgress,
    #[error("unknown question {0}")]
    UnknownQuestion(String),
    #[error("`{value}` is not an option of question {question_id}")]
    InvalidOption { question_id: String, value: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NavStatus {
    Current,
    Answered,
    Unanswered,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted(ExamResponse),
    AlreadySubmitted,
}

/// Whole-second countdown. Once cancelled it never moves again.
#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u64,
    armed: bool,
}

impl Countdown {
    pub fn new(secs: u64) -> Self {
        Self {
            remaining: secs,
            armed: false,
        }
    }

    pub fn start(&mut self) {
        self.armed = true;
    }

    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns true on the tick that reaches zero.
    fn tick(&mut self) -> bool {
        if !self.armed || self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One student's attempt at one exam paper.
#[derive(Debug)]
pub struct ExamSession {
    student_id: String,
    student_name: String,
    paper: ExamPaper,
    order: Vec<usize>,
    current: usize,
    // Recorded order, not question order.
    answers: Vec<(String, String)>,
    countdown: Countdown,
    state: SessionState,
    response: Option<ExamResponse>,
}

impl ExamSession {
    pub fn new(student: &Student, paper: ExamPaper, duration_secs: u64) -> Result<Self, SessionError> {
        if paper.questions.is_empty() {
            return Err(SessionError::EmptyPaper(paper.id));
        }
        let order = (0..paper.questions.len()).collect();
        Ok(Self {
            student_id: student.id.clone(),
            student_name: student.username.clone(),
            paper,
            order,
            current: 0,
            answers: Vec::new(),
            countdown: Countdown::new(duration_secs),
            state: SessionState::NotStarted,
            response: None,
        })
    }

    /// Loads the active paper (the first stored one) and starts the attempt.
    pub fn open<K: KvStore, R: Rng + ?Sized>(
        store: &ExamStore<K>,
        student: &Student,
        duration_secs: u64,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let paper = store
            .exam_papers()?
            .into_iter()
            .next()
            .ok_or(SessionError::NoExamAvailable)?;
        let mut session = Self::new(student, paper, duration_secs)?;
        session.begin(rng);
        tracing::info!(
            student = %session.student_id,
            exam = %session.paper.id,
            questions = session.order.len(),
            "exam session started"
        );
        Ok(session)
    }

    /// Shuffles the question order and arms the countdown.
    pub fn begin<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.state != SessionState::NotStarted {
            return;
        }
        self.order.shuffle(rng);
        self.current = 0;
        self.countdown.start();
        self.state = SessionState::InProgress;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn paper(&self) -> &ExamPaper {
        &self.paper
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining()
    }

    pub fn clock_running(&self) -> bool {
        self.countdown.is_armed()
    }

    pub fn question_count(&self) -> usize {
        self.order.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.paper.questions[self.order[self.current]]
    }

    /// Questions in the order this attempt presents them.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.order.iter().map(|&i| &self.paper.questions[i])
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|(id, _)| id == question_id)
            .map(|(_, a)| a.as_str())
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn response(&self) -> Option<&ExamResponse> {
        self.response.as_ref()
    }

    pub fn record_answer(&mut self, question_id: &str, value: &str) -> Result<(), SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let question = self
            .paper
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

        if value.trim().is_empty() {
            self.answers.retain(|(id, _)| id != question_id);
            return Ok(());
        }
        if !question.accepts(value) {
            return Err(SessionError::InvalidOption {
                question_id: question_id.to_string(),
                value: value.to_string(),
            });
        }

        match self.answers.iter_mut().find(|(id, _)| id == question_id) {
            Some((_, a)) => *a = value.to_string(),
            None => self
                .answers
                .push((question_id.to_string(), value.to_string())),
        }
        Ok(())
    }

    pub fn go_to(&mut self, index: usize) {
        self.current = index.min(self.order.len() - 1);
    }

    pub fn next(&mut self) {
        self.go_to(self.current.saturating_add(1));
    }

    pub fn previous(&mut self) {
        self.go_to(self.current.saturating_sub(1));
    }

    pub fn navigator(&self) -> Vec<NavStatus> {
        self.questions()
            .enumerate()
            .map(|(i, q)| {
                if i == self.current {
                    NavStatus::Current
                } else if self.answer_for(&q.id).is_some() {
                    NavStatus::Answered
                } else {
                    NavStatus::Unanswered
                }
            })
            .collect()
    }

    /// Advances the countdown by one second. The tick that reaches zero
    /// submits the attempt.
    pub fn tick<K: KvStore>(&mut self, store: &ExamStore<K>) -> Result<Option<SubmitOutcome>, SessionError> {
        if self.state != SessionState::InProgress {
            return Ok(None);
        }
        if !self.countdown.tick() {
            return Ok(None);
        }
        tracing::info!(student = %self.student_id, "time is up, submitting");
        self.submit(store).map(Some)
    }

    pub fn submit<K: KvStore>(&mut self, store: &ExamStore<K>) -> Result<SubmitOutcome, SessionError> {
        match self.state {
            SessionState::Submitted => return Ok(SubmitOutcome::AlreadySubmitted),
            SessionState::NotStarted => return Err(SessionError::NotInProgress),
            SessionState::InProgress => {}
        }
        self.countdown.cancel();

        let answers = self
            .answers
            .iter()
            .map(|(qid, answer)| ResponseAnswer {
                question_id: qid.clone(),
                question_text: self
                    .paper
                    .questions
                    .iter()
                    .find(|q| &q.id == qid)
                    .map(|q| q.text.clone()),
                answer: answer.clone(),
            })
            .collect();
        let response = ExamResponse {
            student_id: self.student_id.clone(),
            student_name: self.student_name.clone(),
            exam_id: self.paper.id.clone(),
            answers,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };

        store.append_response(&response)?;
        self.state = SessionState::Submitted;
        self.response = Some(response.clone());
        tracing::info!(
            student = %self.student_id,
            exam = %self.paper.id,
            answered = self.answers.len(),
            "exam submitted"
        );
        Ok(SubmitOutcome::Submitted(response))
    }
}
