use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    archive::ArchiveStore, db::Store, models::package::PackageMetadata, queue::JobQueue,
    telemetry::Metrics,
};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub archives: Arc<dyn ArchiveStore>,
    pub queue: Arc<dyn JobQueue>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Body of a download, and of a successful inline upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct PackageResponse {
    pub metadata: PackageMetadata,
    pub data: PackageData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackageData {
    /// Base64-encoded archive.
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}
