use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::version::AccessLevel;

/// Published for every URL upload; consumed by the ingestion worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestMessage {
    pub job_id: Uuid,
    pub package_name: String,
    pub package_version: String,
    pub url: String,
    pub author: String,
    #[serde(default)]
    pub access_level: AccessLevel,
    pub readme: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_message_defaults_access_level() {
        let message: IngestMessage = serde_json::from_value(serde_json::json!({
            "job_id": "0190c2d4-7b0a-7cc1-9d35-0c6f1c1e0a11",
            "package_name": "alpha",
            "package_version": "1.0.0",
            "url": "https://example.com/alpha.zip",
            "author": "ada",
            "readme": null,
        }))
        .unwrap();

        assert_eq!(message.access_level, AccessLevel::Public);
        assert_eq!(message.package_name, "alpha");
    }
}
