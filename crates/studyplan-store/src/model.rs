//! Persisted record types.
//!
//! The whole store is a single [`Document`] holding every [`Student`] and
//! every [`StudentData`] record. Student fields serialize in snake_case,
//! progress records and the top-level keys in camelCase, so the file stays
//! compatible with data written by earlier deployments.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ═══════════════════════════════════════════════════════════════════════
//  Document
// ═══════════════════════════════════════════════════════════════════════

/// The complete persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Registered accounts, in creation order.
    #[serde(default)]
    pub students: Vec<Student>,
    /// Saved progress, at most one record per student.
    #[serde(default)]
    pub student_data: Vec<StudentData>,
}

impl Document {
    /// Find a student by exact (case-sensitive) username.
    pub fn student_by_username(&self, username: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.username == username)
    }

    /// Find a student by id.
    pub fn student_by_id(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Find the saved data for a student.
    pub fn data_for(&self, student_id: &str) -> Option<&StudentData> {
        self.student_data.iter().find(|d| d.student_id == student_id)
    }

    /// Insert or replace the record for `data.student_id`.
    pub fn upsert_data(&mut self, data: StudentData) {
        match self
            .student_data
            .iter_mut()
            .find(|d| d.student_id == data.student_id)
        {
            Some(existing) => *existing = data,
            None => self.student_data.push(data),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Student
// ═══════════════════════════════════════════════════════════════════════

/// A registered student account, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Creation-time-derived identifier (decimal milliseconds).
    pub id: String,
    /// Unique, case-sensitive login name.
    pub username: String,
    /// `iterations:base64(salt):base64(hash)`.
    pub password_hash: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// The client-facing view of this account.
    pub fn to_public(&self) -> PublicStudent {
        PublicStudent {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

/// A student without credentials. This is the only shape handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicStudent {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::StudentStore::create_student`].
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  StudentData
// ═══════════════════════════════════════════════════════════════════════

/// A student's saved progress and study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentData {
    pub student_id: String,
    #[serde(default)]
    pub progress: Map<String, Value>,
    #[serde(default)]
    pub study_plan: Vec<Value>,
    /// `None` only for the placeholder returned when nothing was saved yet.
    #[serde(default, with = "timestamp::option")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl StudentData {
    /// The placeholder returned for a student with no saved record.
    pub fn empty(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            progress: Map::new(),
            study_plan: Vec::new(),
            last_updated: None,
        }
    }
}

/// Aggregate counts reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_students: usize,
    pub total_student_data: usize,
}

// ═══════════════════════════════════════════════════════════════════════
//  Timestamps
// ═══════════════════════════════════════════════════════════════════════

/// Current time truncated to the millisecond precision we persist.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&super::format(ts)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
