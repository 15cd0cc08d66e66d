use chrono::Utc;
use tracing::instrument;

use crate::{
    db::{HistoryStore, PackageStore},
    error::Error,
    models::{
        history::{HistoryAction, HistoryEntry, HistoryRecord, NewHistoryEntry},
        package::PackageMetadata,
    },
};

/// Appends an audit entry for `user` acting on `version_id`, snapshotting the
/// version's name and number as they are now.
#[instrument(name = "record_history", skip(store))]
pub async fn record<S>(
    store: &S,
    user: &str,
    version_id: i64,
    action: HistoryAction,
) -> Result<HistoryEntry, Error>
where
    S: PackageStore + HistoryStore + ?Sized,
{
    let version = store
        .find_version_by_id(version_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Version {} not found", version_id)))?;
    let package = store
        .find_package_by_id(version.package_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Package {} not found", version.package_id)))?;

    store
        .insert_history(NewHistoryEntry {
            user: user.to_string(),
            date: Utc::now(),
            package_metadata: PackageMetadata {
                id: version.id,
                name: package.name,
                version: version.version,
            },
            action,
        })
        .await
}

/// Records `action` for each version, logging failures instead of returning
/// them. The action being audited has already happened.
pub async fn record_all<S>(store: &S, user: &str, version_ids: &[i64], action: HistoryAction)
where
    S: PackageStore + HistoryStore + ?Sized,
{
    for &version_id in version_ids {
        if let Err(err) = record(store, user, version_id, action).await {
            tracing::warn!(error = ?err, version_id, %action, "Failed to record history");
        }
    }
}

/// Every `action` entry for packages named `package_name`, in recording order.
#[instrument(name = "query_history", skip(store))]
pub async fn query<S>(
    store: &S,
    package_name: &str,
    action: HistoryAction,
) -> Result<Vec<HistoryRecord>, Error>
where
    S: HistoryStore + ?Sized,
{
    let entries = store.list_history(package_name, action).await?;

    Ok(entries.into_iter().map(HistoryRecord::from).collect())
}
