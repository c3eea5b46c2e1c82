use crate::model::{ExamPaper, Question, QuestionKind, Student};
use crate::store::{ExamStore, KvStore, StoreError};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// One loosely-typed record as produced by a spreadsheet reader.
pub type Row = serde_json::Map<String, Value>;

pub const UNTITLED_EXAM: &str = "Untitled Exam";

#[derive(Debug, Clone, Serialize)]
pub struct RowIssue {
    /// 1-based position among the data rows.
    pub row: usize,
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{} row issue(s); nothing was imported", .0.len())]
    InvalidRows(Vec<RowIssue>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentImport {
    pub added: usize,
    pub roster_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamImport {
    pub papers: usize,
    pub questions: usize,
}

/// A row with every cell reduced to an optional trimmed string.
struct Cells(HashMap<String, String>);

impl Cells {
    fn from_row(row: &Row) -> Self {
        let mut out = HashMap::new();
        for (k, v) in row {
            let text = match v {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if !text.is_empty() {
                out.insert(k.trim().to_string(), text);
            }
        }
        Cells(out)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

struct StudentRow {
    id: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl StudentRow {
    fn from_cells(c: &Cells) -> Self {
        Self {
            id: c.get("id").map(str::to_string),
            username: c.get("username").map(str::to_string),
            password: c.get("password").map(str::to_string),
        }
    }
}

struct ExamRow {
    title: Option<String>,
    question: Option<String>,
    kind: Option<String>,
    options: Option<String>,
    answer: Option<String>,
}

impl ExamRow {
    fn from_cells(c: &Cells) -> Self {
        Self {
            title: c.get("ExamTitle").map(str::to_string),
            question: c.get("Question").map(str::to_string),
            kind: c.get("Type").map(str::to_string),
            options: c.get("Options").map(str::to_string),
            answer: c.get("Answer").map(str::to_string),
        }
    }
}

fn missing(row: usize, field: &'static str) -> RowIssue {
    RowIssue {
        row,
        field,
        message: format!("missing {field}"),
    }
}

pub fn question_kind(raw: Option<&str>) -> QuestionKind {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("multiple choice") | Some("mcq") => QuestionKind::Mcq,
        _ => QuestionKind::Open,
    }
}

pub fn split_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Appends the rows' students to the existing roster.
pub fn import_students<K: KvStore>(
    store: &ExamStore<K>,
    rows: &[Row],
) -> Result<StudentImport, ImportError> {
    let mut roster = store.students()?;
    if rows.is_empty() {
        return Ok(StudentImport {
            added: 0,
            roster_size: roster.len(),
        });
    }

    let mut seen: HashSet<String> = roster.iter().map(|s| s.id.clone()).collect();
    let mut issues = Vec::new();
    let mut added = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        let r = StudentRow::from_cells(&Cells::from_row(row));
        if r.username.is_none() {
            issues.push(missing(n, "username"));
        }
        if r.password.is_none() {
            issues.push(missing(n, "password"));
        }
        let id = r.id.unwrap_or_else(fresh_id);
        if !seen.insert(id.clone()) {
            issues.push(RowIssue {
                row: n,
                field: "id",
                message: format!("duplicate student id {id}"),
            });
        }
        if let (Some(username), Some(password)) = (r.username, r.password) {
            added.push(Student {
                id,
                username,
                password,
            });
        }
    }

    if !issues.is_empty() {
        return Err(ImportError::InvalidRows(issues));
    }

    let count = added.len();
    roster.extend(added);
    store.save_students(&roster)?;
    tracing::info!(added = count, roster = roster.len(), "imported students");
    Ok(StudentImport {
        added: count,
        roster_size: roster.len(),
    })
}

/// Groups rows into one paper per ExamTitle and replaces every stored paper.
pub fn import_exams<K: KvStore>(
    store: &ExamStore<K>,
    rows: &[Row],
) -> Result<ExamImport, ImportError> {
    if rows.is_empty() {
        return Ok(ExamImport {
            papers: store.exam_papers()?.len(),
            questions: 0,
        });
    }

    let mut papers: Vec<ExamPaper> = Vec::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    let mut issues = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        let r = ExamRow::from_cells(&Cells::from_row(row));
        let kind = question_kind(r.kind.as_deref());

        let Some(text) = r.question else {
            issues.push(missing(n, "Question"));
            continue;
        };

        let (options, correct_answer) = match kind {
            QuestionKind::Open => (None, None),
            QuestionKind::Mcq => {
                let opts = r.options.as_deref().map(split_options).unwrap_or_default();
                if opts.is_empty() {
                    issues.push(RowIssue {
                        row: n,
                        field: "Options",
                        message: "multiple choice question has no options".to_string(),
                    });
                    continue;
                }
                let answer = r.answer.unwrap_or_default();
                if !opts.contains(&answer) {
                    tracing::warn!(row = n, answer = %answer, "answer is not one of the options");
                }
                (Some(opts), Some(answer))
            }
        };

        let title = r.title.unwrap_or_else(|| UNTITLED_EXAM.to_string());
        let idx = *by_title.entry(title.clone()).or_insert_with(|| {
            papers.push(ExamPaper {
                id: fresh_id(),
                title,
                questions: Vec::new(),
            });
            papers.len() - 1
        });
        papers[idx].questions.push(Question {
            id: fresh_id(),
            text,
            kind,
            options,
            correct_answer,
        });
    }

    if !issues.is_empty() {
        return Err(ImportError::InvalidRows(issues));
    }

    let questions = papers.iter().map(|p| p.questions.len()).sum();
    store.save_exam_papers(&papers)?;
    tracing::info!(papers = papers.len(), questions, "imported exam papers");
    Ok(ExamImport {
        papers: papers.len(),
        questions,
    })
}

/// Reads rows from a `.json` array of objects or the first sheet of a `.csv`.
pub fn read_rows_file(path: &Path) -> anyhow::Result<Vec<Row>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => rows_from_json(
            &serde_json::from_str(&text).context("rows file is not valid JSON")?,
        ),
        "csv" => Ok(rows_from_csv(&text)),
        other => Err(anyhow!("unsupported rows file type: .{other}")),
    }
}

pub fn rows_from_json(v: &Value) -> anyhow::Result<Vec<Row>> {
    let Some(items) = v.as_array() else {
        return Err(anyhow!("rows must be an array of objects"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .cloned()
                .ok_or_else(|| anyhow!("row {} is not an object", i + 1))
        })
        .collect()
}

/// First record gives the keys. Cells may be double-quoted with `""`
/// escapes, and a quoted cell may span lines.
pub fn rows_from_csv(text: &str) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_csv_records(text).into_iter();
    let Some(header) = records.next() else {
        return Vec::new();
    };
    let keys: Vec<String> = header.into_iter().map(|k| k.trim().to_string()).collect();

    records
        .map(|record| {
            let mut row = Row::new();
            for (k, cell) in keys.iter().zip(record) {
                if k.is_empty() || cell.trim().is_empty() {
                    continue;
                }
                row.insert(k.clone(), Value::String(cell));
            }
            row
        })
        .collect()
}

// Records end at line breaks outside quotes. Blank lines are dropped.
fn split_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>, cur: &mut String| {
        fields.push(std::mem::take(cur));
        let record = std::mem::take(fields);
        if record.iter().any(|f| !f.trim().is_empty()) {
            records.push(record);
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut cur)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => end_record(&mut fields, &mut cur),
            _ => cur.push(c),
        }
    }
    if !cur.is_empty() || !fields.is_empty() {
        end_record(&mut fields, &mut cur);
    }
    records
}
