use crate::model::{ExamPaper, ExamResponse, Student};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const STUDENTS_KEY: &str = "students";
pub const EXAM_PAPERS_KEY: &str = "examPapers";
pub const RESPONSES_KEY: &str = "examResponses";
/// Older frontends wrote the response log here. Migrated on workspace open.
pub const LEGACY_RESPONSES_KEY: &str = "responses";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend failed: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("stored value under `{key}` is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed blob storage. Values are whole-collection JSON snapshots.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub struct SqliteKv<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteKv<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKv<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let v = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
                r.get::<_, String>(0)
            })
            .optional()?;
        Ok(v)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, &now),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(())
    }
}

/// Typed access to the three collections. The only place that knows the keys.
pub struct ExamStore<K> {
    kv: K,
}

impl<K: KvStore> ExamStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.kv.set(key, &raw)
    }

    pub fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.load(STUDENTS_KEY)
    }

    pub fn save_students(&self, students: &[Student]) -> Result<(), StoreError> {
        self.save(STUDENTS_KEY, students)
    }

    pub fn clear_students(&self) -> Result<(), StoreError> {
        self.kv.remove(STUDENTS_KEY)
    }

    pub fn exam_papers(&self) -> Result<Vec<ExamPaper>, StoreError> {
        self.load(EXAM_PAPERS_KEY)
    }

    pub fn save_exam_papers(&self, papers: &[ExamPaper]) -> Result<(), StoreError> {
        self.save(EXAM_PAPERS_KEY, papers)
    }

    pub fn clear_exam_papers(&self) -> Result<(), StoreError> {
        self.kv.remove(EXAM_PAPERS_KEY)
    }

    pub fn responses(&self) -> Result<Vec<ExamResponse>, StoreError> {
        self.load(RESPONSES_KEY)
    }

    pub fn append_response(&self, response: &ExamResponse) -> Result<(), StoreError> {
        let mut all = self.responses()?;
        all.push(response.clone());
        self.save(RESPONSES_KEY, &all)
    }

    pub fn responses_for_student(&self, student_id: &str) -> Result<Vec<ExamResponse>, StoreError> {
        Ok(self
            .responses()?
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }

    /// Moves records from the legacy response key into the canonical one.
    /// Returns how many records were moved.
    pub fn migrate_legacy_responses(&self) -> Result<usize, StoreError> {
        if self.kv.get(LEGACY_RESPONSES_KEY)?.is_none() {
            return Ok(0);
        }
        let legacy: Vec<ExamResponse> = self.load(LEGACY_RESPONSES_KEY)?;
        let moved = legacy.len();
        if moved > 0 {
            let mut all = self.responses()?;
            all.extend(legacy);
            self.save(RESPONSES_KEY, &all)?;
        }
        self.kv.remove(LEGACY_RESPONSES_KEY)?;
        Ok(moved)
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryKv;
    use super::*;

    fn student(id: &str) -> Student {
        Student {
            id: id.into(),
            username: format!("user-{id}"),
            password: "pw".into(),
        }
    }

    #[test]
    fn absent_keys_load_as_empty() {
        let store = ExamStore::new(MemoryKv::default());
        assert!(store.students().expect("students").is_empty());
        assert!(store.exam_papers().expect("papers").is_empty());
        assert!(store.responses().expect("responses").is_empty());
    }

    #[test]
    fn malformed_json_is_reported_not_swallowed() {
        let kv = MemoryKv::default();
        kv.set(STUDENTS_KEY, "{not json").expect("set");
        let store = ExamStore::new(&kv);
        match store.students() {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, STUDENTS_KEY),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn save_replaces_whole_snapshot() {
        let store = ExamStore::new(MemoryKv::default());
        store
            .save_students(&[student("a"), student("b")])
            .expect("save");
        store.save_students(&[student("c")]).expect("save");
        let ids: Vec<_> = store
            .students()
            .expect("load")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn legacy_responses_are_moved_to_canonical_key() {
        let kv = MemoryKv::default();
        kv.set(
            LEGACY_RESPONSES_KEY,
            r#"[{"studentId":"s1","studentName":"ana","examId":"e1",
                "responses":[{"questionId":"q1","questionText":"Q","answer":"x"}],
                "submittedAt":"2024-01-01T00:00:00Z"}]"#,
        )
        .expect("set legacy");
        let store = ExamStore::new(&kv);
        assert_eq!(store.migrate_legacy_responses().expect("migrate"), 1);
        assert!(kv.get(LEGACY_RESPONSES_KEY).expect("get").is_none());
        let all = store.responses().expect("responses");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].answers[0].answer, "x");
        assert_eq!(store.migrate_legacy_responses().expect("again"), 0);
    }

    #[test]
    fn answerless_legacy_entries_do_not_block_later_submits() {
        let kv = MemoryKv::default();
        kv.set(
            LEGACY_RESPONSES_KEY,
            r#"[{"studentId":"s1","studentName":"ana","examId":"e1",
                "responses":[{"question":"q1","questionId":"B"}],
                "submittedAt":"2024-01-01T00:00:00Z"}]"#,
        )
        .expect("set legacy");
        let store = ExamStore::new(&kv);
        assert_eq!(store.migrate_legacy_responses().expect("migrate"), 1);

        let next = ExamResponse {
            student_id: "s2".into(),
            student_name: "ben".into(),
            exam_id: "e1".into(),
            answers: Vec::new(),
            submitted_at: "2024-01-02T00:00:00Z".into(),
        };
        store.append_response(&next).expect("append");
        let all = store.responses().expect("responses");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].answers[0].answer, "");
        assert_eq!(all[1].student_id, "s2");
    }
}
