//! Per-student progress and study-plan persistence.

use chrono::Duration;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;
use crate::model::{StoreStats, StudentData, now_millis};

/// Reads and replaces [`StudentData`] records.
#[derive(Clone)]
pub struct ProgressStore {
    db: Database,
}

impl ProgressStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The saved record for `student_id`, or an empty placeholder.
    ///
    /// Never fails for an unknown id; only storage errors are returned.
    #[instrument(skip(self))]
    pub async fn get_student_data(&self, student_id: &str) -> StoreResult<StudentData> {
        let student_id = student_id.to_string();
        self.db
            .read(move |doc| {
                Ok(doc
                    .data_for(&student_id)
                    .cloned()
                    .unwrap_or_else(|| StudentData::empty(student_id)))
            })
            .await
    }

    /// Replace the student's progress and study plan wholesale.
    ///
    /// Absent values are stored as `{}` and `[]`. The new `lastUpdated`
    /// is always later than the previous one for this student. Callers are
    /// responsible for checking that the student exists.
    #[instrument(skip(self, progress, study_plan))]
    pub async fn save_student_data(
        &self,
        student_id: &str,
        progress: Option<Map<String, Value>>,
        study_plan: Option<Vec<Value>>,
    ) -> StoreResult<StudentData> {
        let student_id = student_id.to_string();

        let saved = self
            .db
            .transaction(move |doc| {
                let mut stamp = now_millis();
                if let Some(prev) = doc.data_for(&student_id).and_then(|d| d.last_updated)
                    && stamp <= prev
                {
                    stamp = prev + Duration::milliseconds(1);
                }

                let record = StudentData {
                    student_id,
                    progress: progress.unwrap_or_default(),
                    study_plan: study_plan.unwrap_or_default(),
                    last_updated: Some(stamp),
                };
                doc.upsert_data(record.clone());
                Ok(record)
            })
            .await?;

        debug!(
            student_id = %saved.student_id,
            progress_keys = saved.progress.len(),
            plan_items = saved.study_plan.len(),
            "student data saved"
        );
        Ok(saved)
    }

    /// Counts of registered students and saved records.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        self.db
            .read(|doc| {
                Ok(StoreStats {
                    total_students: doc.students.len(),
                    total_student_data: doc.student_data.len(),
                })
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_student_gets_empty_record() {
        let store = ProgressStore::new(Database::open_in_memory());
        let data = store.get_student_data("missing").await.unwrap();
        assert_eq!(data.student_id, "missing");
        assert!(data.progress.is_empty());
        assert!(data.study_plan.is_empty());
        assert!(data.last_updated.is_none());
    }

    #[tokio::test]
    async fn save_then_get_round_trip() {
        let store = ProgressStore::new(Database::open_in_memory());
        let first = store
            .save_student_data("1", Some(map(json!({"math": 0}))), None)
            .await
            .unwrap();

        store
            .save_student_data("1", Some(map(json!({"math": 1}))), Some(vec![json!("algebra")]))
            .await
            .unwrap();

        let data = store.get_student_data("1").await.unwrap();
        assert_eq!(data.progress, map(json!({"math": 1})));
        assert_eq!(data.study_plan, vec![json!("algebra")]);
        assert!(data.last_updated.unwrap() > first.last_updated.unwrap());
    }

    #[tokio::test]
    async fn save_replaces_without_merging() {
        let store = ProgressStore::new(Database::open_in_memory());
        store
            .save_student_data("1", Some(map(json!({"math": 1, "art": 2}))), Some(vec![json!(1)]))
            .await
            .unwrap();
        store.save_student_data("1", None, None).await.unwrap();

        let data = store.get_student_data("1").await.unwrap();
        assert!(data.progress.is_empty());
        assert!(data.study_plan.is_empty());
    }

    #[tokio::test]
    async fn rapid_saves_have_strictly_increasing_stamps() {
        let store = ProgressStore::new(Database::open_in_memory());
        let mut last = None;
        for _ in 0..25 {
            let saved = store.save_student_data("1", None, None).await.unwrap();
            let stamp = saved.last_updated.unwrap();
            if let Some(prev) = last {
                assert!(stamp > prev);
            }
            last = Some(stamp);
        }
    }

    #[tokio::test]
    async fn stats_count_records() {
        let store = ProgressStore::new(Database::open_in_memory());
        store.save_student_data("1", None, None).await.unwrap();
        store.save_student_data("2", None, None).await.unwrap();
        store.save_student_data("1", None, None).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_student_data, 2);
        assert_eq!(stats.total_students, 0);
    }
}
