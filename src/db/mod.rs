//! Persistence for packages, versions, history, users and ingestion jobs.
//!
//! Every concern is a trait so the search engine and handlers run the same
//! way against Postgres and against the in-process [`MemoryStore`].

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::Error,
    models::{
        history::{HistoryAction, HistoryEntry, NewHistoryEntry},
        job::IngestJob,
        package::{NewPackage, Package},
        user::{NewUser, User},
        version::{NewVersion, Version, VersionFilter},
    },
};

mod history;
mod jobs;
mod memory;
mod packages;
mod users;
mod versions;

pub use memory::MemoryStore;

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn find_package_id_by_name(&self, name: &str) -> Result<Option<i64>, Error>;

    async fn find_package_by_id(&self, id: i64) -> Result<Option<Package>, Error>;

    async fn find_version_by_id(&self, id: i64) -> Result<Option<Version>, Error>;

    /// Versions of one package, oldest first.
    async fn list_versions_for_package(&self, package_id: i64) -> Result<Vec<Version>, Error>;

    async fn find_version_id(&self, package_id: i64, version: &str)
        -> Result<Option<i64>, Error>;

    /// Fails with [`Error::DuplicateName`] when the name is taken.
    async fn create_package(&self, package: NewPackage) -> Result<Package, Error>;

    /// Fails with [`Error::DuplicateVersion`] when `(package_id, version)` exists.
    async fn create_version(&self, version: NewVersion) -> Result<Version, Error>;

    /// One window of versions in creation order.
    async fn fetch_versions(
        &self,
        filter: &VersionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Version>, Error>;

    /// All packages, oldest first.
    async fn list_packages(&self) -> Result<Vec<Package>, Error>;

    /// All versions carrying a readme, oldest first.
    async fn list_versions_with_readme(&self) -> Result<Vec<Version>, Error>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, Error>;

    async fn list_history(
        &self,
        package_name: &str,
        action: HistoryAction,
    ) -> Result<Vec<HistoryEntry>, Error>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`Error::DuplicateUser`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, Error>;

    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, Error>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: IngestJob) -> Result<IngestJob, Error>;

    async fn complete_job(&self, id: Uuid, version_id: i64) -> Result<IngestJob, Error>;

    async fn fail_job(&self, id: Uuid, error: &str) -> Result<IngestJob, Error>;

    async fn get_job(&self, id: Uuid) -> Result<Option<IngestJob>, Error>;
}

#[async_trait]
pub trait Store: PackageStore + HistoryStore + UserStore + JobStore {
    /// Drops every package, version, history entry and job. Users survive.
    async fn reset(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn reset(&self) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        packages::truncate_registry(&mut conn).await
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
