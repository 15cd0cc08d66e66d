use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::package::PackageMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "history_action", rename_all = "UPPERCASE")]
pub enum HistoryAction {
    Upload,
    Search,
    Download,
    Rate,
}

impl Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryAction::Upload => write!(f, "UPLOAD"),
            HistoryAction::Search => write!(f, "SEARCH"),
            HistoryAction::Download => write!(f, "DOWNLOAD"),
            HistoryAction::Rate => write!(f, "RATE"),
        }
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UPLOAD" => Ok(HistoryAction::Upload),
            "SEARCH" => Ok(HistoryAction::Search),
            "DOWNLOAD" => Ok(HistoryAction::Download),
            "RATE" => Ok(HistoryAction::Rate),
            other => Err(format!("{} is not a valid history action", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    #[sqlx(rename = "username")]
    pub user: String,
    pub date: DateTime<Utc>,
    #[sqlx(json)]
    pub package_metadata: PackageMetadata,
    pub action: HistoryAction,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub user: String,
    pub date: DateTime<Utc>,
    pub package_metadata: PackageMetadata,
    pub action: HistoryAction,
}

/// Who touched a package and when, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryRecord {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Date")]
    pub date: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryRecord {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            user: entry.user,
            date: entry.date,
        }
    }
}
