use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl Question {
    /// True when `value` may be recorded as an answer to this question.
    /// Open questions take any text; mcq answers must be a declared option.
    pub fn accepts(&self, value: &str) -> bool {
        match self.kind {
            QuestionKind::Open => true,
            QuestionKind::Mcq => self
                .options
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|o| o == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPaper {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAnswer {
    pub question_id: String,
    // Older records stored the question text under `question`.
    #[serde(
        default,
        alias = "question",
        skip_serializing_if = "Option::is_none"
    )]
    pub question_text: Option<String>,
    // Some older records never wrote `answer` at all.
    #[serde(default)]
    pub answer: String,
}

/// One completed attempt. Records written under the legacy `responses`
/// key used `responses` instead of `answers`; both are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResponse {
    pub student_id: String,
    pub student_name: String,
    pub exam_id: String,
    #[serde(default, alias = "responses")]
    pub answers: Vec<ResponseAnswer>,
    pub submitted_at: String,
}
