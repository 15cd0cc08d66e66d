use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_aux::prelude::deserialize_number_from_string;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub content_upload: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub name: String,
    pub content_upload: bool,
}

/// `{ID, Name, Version}` triple returned by searches and embedded in history
/// entries. The id travels as a string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageMetadata {
    #[serde(
        rename = "ID",
        serialize_with = "serialize_id",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
}

fn serialize_id<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}
