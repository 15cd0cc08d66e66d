use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "access_level", rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Public,
    Group,
    Private,
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Public => write!(f, "public"),
            AccessLevel::Group => write!(f, "group"),
            AccessLevel::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Version {
    pub id: i64,
    pub version: String,
    pub package_id: i64,
    pub author: String,
    pub access_level: AccessLevel,
    pub program_path: String,
    pub package_url: Option<String>,
    pub readme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVersion {
    pub version: String,
    pub package_id: i64,
    pub author: String,
    pub access_level: AccessLevel,
    pub program_path: String,
    pub package_url: Option<String>,
    pub readme: Option<String>,
}

/// Which rows a batched version scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    All,
    Packages(Vec<i64>),
}

impl VersionFilter {
    pub fn includes(&self, package_id: i64) -> bool {
        match self {
            VersionFilter::All => true,
            VersionFilter::Packages(ids) => ids.contains(&package_id),
        }
    }
}
