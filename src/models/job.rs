use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum JobStatus {
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => {
                tracing::warn!(status = s, "Invalid job status");
                JobStatus::Processing
            }
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A URL ingestion tracked from request to stored version.
#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct IngestJob {
    pub id: Uuid,
    pub package_name: String,
    pub package_version: String,
    pub url: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub version_id: Option<i64>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
