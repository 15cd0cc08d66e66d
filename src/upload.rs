use tracing::instrument;

use crate::{
    archive::{archive_key, ArchiveStore},
    db::{HistoryStore, PackageStore},
    error::Error,
    history,
    models::{
        history::HistoryAction,
        package::NewPackage,
        version::{AccessLevel, NewVersion, Version},
    },
    search::WILDCARD,
};

/// A version ready to be stored, whether uploaded inline or fetched by URL.
#[derive(Debug, Clone)]
pub struct Publication {
    pub name: String,
    pub version: String,
    pub author: String,
    pub access_level: AccessLevel,
    pub readme: Option<String>,
    pub package_url: Option<String>,
    pub content: Vec<u8>,
}

impl Publication {
    pub fn content_upload(&self) -> bool {
        self.package_url.is_none()
    }
}

pub fn validate_coordinates(name: &str, version: &str) -> Result<(), Error> {
    if name.trim().is_empty() || name == WILDCARD {
        return Err(Error::InvalidQuery(format!(
            "Invalid package name {:?}",
            name
        )));
    }
    semver::Version::parse(version)
        .map_err(|err| Error::InvalidQuery(format!("Invalid version {:?}: {}", version, err)))?;

    Ok(())
}

/// Id of the package called `name`, creating it if needed. A concurrent
/// creator winning the race is not an error.
#[instrument(name = "ensure_package", skip(store))]
pub async fn ensure_package<S>(store: &S, name: &str, content_upload: bool) -> Result<i64, Error>
where
    S: PackageStore + ?Sized,
{
    if let Some(package_id) = store.find_package_id_by_name(name).await? {
        return Ok(package_id);
    }

    let created = store
        .create_package(NewPackage {
            name: name.to_string(),
            content_upload,
        })
        .await;

    match created {
        Ok(package) => Ok(package.id),
        Err(Error::DuplicateName(_)) => store
            .find_package_id_by_name(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Package {} not found", name))),
        Err(err) => Err(err),
    }
}

/// Fails with [`Error::DuplicateVersion`] when `name@version` already exists.
pub async fn ensure_version_is_new<S>(store: &S, name: &str, version: &str) -> Result<(), Error>
where
    S: PackageStore + ?Sized,
{
    let Some(package_id) = store.find_package_id_by_name(name).await? else {
        return Ok(());
    };
    if store.find_version_id(package_id, version).await?.is_some() {
        return Err(Error::DuplicateVersion {
            package_id,
            version: version.to_string(),
        });
    }

    Ok(())
}

/// Stores the archive, creates the version and records the upload.
#[instrument(
    name = "publish_version",
    skip(store, archives, publication),
    fields(name = %publication.name, version = %publication.version)
)]
pub async fn publish_version<S, A>(
    store: &S,
    archives: &A,
    publication: Publication,
) -> Result<Version, Error>
where
    S: PackageStore + HistoryStore + ?Sized,
    A: ArchiveStore + ?Sized,
{
    validate_coordinates(&publication.name, &publication.version)?;

    let package_id =
        ensure_package(store, &publication.name, publication.content_upload()).await?;
    if store
        .find_version_id(package_id, &publication.version)
        .await?
        .is_some()
    {
        return Err(Error::DuplicateVersion {
            package_id,
            version: publication.version,
        });
    }

    let program_path = archive_key(&publication.name, &publication.version);
    archives.put(&program_path, publication.content).await?;

    let version = store
        .create_version(NewVersion {
            version: publication.version,
            package_id,
            author: publication.author.clone(),
            access_level: publication.access_level,
            program_path,
            package_url: publication.package_url,
            readme: publication.readme,
        })
        .await?;

    history::record_all(store, &publication.author, &[version.id], HistoryAction::Upload).await;
    tracing::info!(version_id = version.id, "Published version");

    Ok(version)
}
