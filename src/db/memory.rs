use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{HistoryStore, JobStore, PackageStore, Store, UserStore},
    error::Error,
    models::{
        history::{HistoryAction, HistoryEntry, NewHistoryEntry},
        job::{IngestJob, JobStatus},
        package::{NewPackage, Package},
        user::{NewUser, User},
        version::{NewVersion, Version, VersionFilter},
    },
};

/// Process-local store. Rows keep insertion order, which is creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    packages: Vec<Package>,
    versions: Vec<Version>,
    history: Vec<HistoryEntry>,
    users: Vec<User>,
    jobs: Vec<IngestJob>,
    package_sequence: i64,
    version_sequence: i64,
    history_sequence: i64,
    user_sequence: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn find_package_id_by_name(&self, name: &str) -> Result<Option<i64>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .packages
            .iter()
            .find(|package| package.name == name)
            .map(|package| package.id))
    }

    async fn find_package_by_id(&self, id: i64) -> Result<Option<Package>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.packages.iter().find(|package| package.id == id).cloned())
    }

    async fn find_version_by_id(&self, id: i64) -> Result<Option<Version>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.versions.iter().find(|version| version.id == id).cloned())
    }

    async fn list_versions_for_package(&self, package_id: i64) -> Result<Vec<Version>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .versions
            .iter()
            .filter(|version| version.package_id == package_id)
            .cloned()
            .collect())
    }

    async fn find_version_id(
        &self,
        package_id: i64,
        version: &str,
    ) -> Result<Option<i64>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .versions
            .iter()
            .find(|row| row.package_id == package_id && row.version == version)
            .map(|row| row.id))
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, Error> {
        let mut inner = self.inner.write().await;
        if inner.packages.iter().any(|row| row.name == package.name) {
            return Err(Error::DuplicateName(package.name));
        }

        inner.package_sequence += 1;
        let package = Package {
            id: inner.package_sequence,
            name: package.name,
            content_upload: package.content_upload,
            created_at: Utc::now(),
        };
        inner.packages.push(package.clone());

        Ok(package)
    }

    async fn create_version(&self, version: NewVersion) -> Result<Version, Error> {
        let mut inner = self.inner.write().await;
        if !inner.packages.iter().any(|row| row.id == version.package_id) {
            return Err(Error::NotFound(format!(
                "Package {} not found",
                version.package_id
            )));
        }
        if inner
            .versions
            .iter()
            .any(|row| row.package_id == version.package_id && row.version == version.version)
        {
            return Err(Error::DuplicateVersion {
                package_id: version.package_id,
                version: version.version,
            });
        }

        inner.version_sequence += 1;
        let now = Utc::now();
        let version = Version {
            id: inner.version_sequence,
            version: version.version,
            package_id: version.package_id,
            author: version.author,
            access_level: version.access_level,
            program_path: version.program_path,
            package_url: version.package_url,
            readme: version.readme,
            created_at: now,
            updated_at: now,
        };
        inner.versions.push(version.clone());

        Ok(version)
    }

    async fn fetch_versions(
        &self,
        filter: &VersionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Version>, Error> {
        let offset = usize::try_from(offset)
            .map_err(|_| Error::InvalidQuery(format!("Invalid offset {}", offset)))?;
        let limit = usize::try_from(limit)
            .map_err(|_| Error::InvalidQuery(format!("Invalid limit {}", limit)))?;

        let inner = self.inner.read().await;
        Ok(inner
            .versions
            .iter()
            .filter(|version| filter.includes(version.package_id))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_packages(&self) -> Result<Vec<Package>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.packages.clone())
    }

    async fn list_versions_with_readme(&self) -> Result<Vec<Version>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .versions
            .iter()
            .filter(|version| version.readme.is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, Error> {
        let mut inner = self.inner.write().await;
        inner.history_sequence += 1;
        let entry = HistoryEntry {
            id: inner.history_sequence,
            user: entry.user,
            date: entry.date,
            package_metadata: entry.package_metadata,
            action: entry.action,
        };
        inner.history.push(entry.clone());

        Ok(entry)
    }

    async fn list_history(
        &self,
        package_name: &str,
        action: HistoryAction,
    ) -> Result<Vec<HistoryEntry>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .history
            .iter()
            .filter(|entry| entry.package_metadata.name == package_name && entry.action == action)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|row| row.username == user.username) {
            return Err(Error::DuplicateUser(user.username));
        }
        if inner.users.iter().any(|row| row.token == user.token) {
            return Err(Error::DuplicateUser(user.username));
        }

        inner.user_sequence += 1;
        let user = User {
            id: inner.user_sequence,
            username: user.username,
            user_group: user.user_group,
            token: user.token,
            is_admin: user.is_admin,
            can_upload: user.can_upload,
            can_search: user.can_search,
            can_download: user.can_download,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|user| user.token == token).cloned())
    }

    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: IngestJob) -> Result<IngestJob, Error> {
        let mut inner = self.inner.write().await;
        inner.jobs.push(job.clone());
        Ok(job)
    }

    async fn complete_job(&self, id: Uuid, version_id: i64) -> Result<IngestJob, Error> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        job.status = JobStatus::Completed;
        job.version_id = Some(version_id);

        Ok(job.clone())
    }

    async fn fail_job(&self, id: Uuid, error: &str) -> Result<IngestJob, Error> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());

        Ok(job.clone())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<IngestJob>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.iter().find(|job| job.id == id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn reset(&self) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.packages.clear();
        inner.versions.clear();
        inner.history.clear();
        inner.jobs.clear();
        inner.package_sequence = 0;
        inner.version_sequence = 0;
        inner.history_sequence = 0;

        Ok(())
    }
}
