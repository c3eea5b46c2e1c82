use crate::model::QuestionKind;
use crate::session::{format_remaining, ExamSession, NavStatus, SessionState};
use crate::store::{ExamStore, KvStore, StoreError};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentItem {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub mcq_count: usize,
    pub open_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub students: Vec<StudentItem>,
    pub exam_papers: Vec<PaperSummary>,
    pub response_count: usize,
}

pub fn students(store: &ExamStore<impl KvStore>) -> Result<Vec<StudentItem>, StoreError> {
    Ok(store
        .students()?
        .into_iter()
        .map(|s| StudentItem {
            id: s.id,
            username: s.username,
        })
        .collect())
}

pub fn paper_summaries(store: &ExamStore<impl KvStore>) -> Result<Vec<PaperSummary>, StoreError> {
    Ok(store
        .exam_papers()?
        .into_iter()
        .map(|p| {
            let mcq_count = p
                .questions
                .iter()
                .filter(|q| q.kind == QuestionKind::Mcq)
                .count();
            PaperSummary {
                question_count: p.questions.len(),
                open_count: p.questions.len() - mcq_count,
                mcq_count,
                id: p.id,
                title: p.title,
            }
        })
        .collect())
}

pub fn admin_dashboard(store: &ExamStore<impl KvStore>) -> Result<AdminDashboard, StoreError> {
    Ok(AdminDashboard {
        students: students(store)?,
        exam_papers: paper_summaries(store)?,
        response_count: store.responses()?.len(),
    })
}

/// Removes one student. Returns false when the id is not on the roster.
pub fn delete_student(store: &ExamStore<impl KvStore>, student_id: &str) -> Result<bool, StoreError> {
    let mut roster = store.students()?;
    let before = roster.len();
    roster.retain(|s| s.id != student_id);
    if roster.len() == before {
        return Ok(false);
    }
    store.save_students(&roster)?;
    tracing::info!(student = %student_id, "student removed");
    Ok(true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub index: usize,
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamView {
    pub exam_id: String,
    pub title: String,
    pub status: SessionState,
    pub remaining_secs: u64,
    pub remaining: String,
    pub clock_running: bool,
    pub question_count: usize,
    pub answered_count: usize,
    pub current: QuestionView,
    pub navigator: Vec<NavStatus>,
    pub can_previous: bool,
    /// Submit replaces Next on the last question.
    pub is_last: bool,
}

pub fn exam_view(session: &ExamSession) -> ExamView {
    let q = session.current_question();
    let index = session.current_index();
    ExamView {
        exam_id: session.paper().id.clone(),
        title: session.paper().title.clone(),
        status: session.state(),
        remaining_secs: session.remaining_secs(),
        remaining: format_remaining(session.remaining_secs()),
        clock_running: session.clock_running(),
        question_count: session.question_count(),
        answered_count: session.answered_count(),
        current: QuestionView {
            index,
            id: q.id.clone(),
            text: q.text.clone(),
            kind: q.kind,
            options: q.options.clone(),
            answer: session.answer_for(&q.id).map(str::to_string),
        },
        navigator: session.navigator(),
        can_previous: index > 0,
        is_last: index + 1 == session.question_count(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub exam_id: String,
    pub title: String,
    pub submitted_at: String,
    pub answered_count: usize,
    pub question_count: usize,
}

pub fn submission_receipt(session: &ExamSession) -> Option<SubmissionReceipt> {
    let r = session.response()?;
    Some(SubmissionReceipt {
        exam_id: r.exam_id.clone(),
        title: session.paper().title.clone(),
        submitted_at: r.submitted_at.clone(),
        answered_count: r.answers.len(),
        question_count: session.question_count(),
    })
}
