use async_trait::async_trait;
use sqlx::{Executor, PgConnection};
use tracing::{instrument, Instrument};

use crate::{
    db::{is_unique_violation, versions, PackageStore, PgStore},
    error::Error,
    models::{
        package::{NewPackage, Package},
        version::{NewVersion, Version, VersionFilter},
    },
    telemetry::{instrument_query, Operation},
};

#[instrument(name = "insert_package", skip(conn))]
pub async fn insert_package(conn: &mut PgConnection, package: NewPackage) -> Result<Package, Error> {
    let result = sqlx::query_as::<_, Package>(
        r#"INSERT INTO packages (name, content_upload) VALUES ($1, $2) RETURNING *;"#,
    )
    .bind(&package.name)
    .bind(package.content_upload)
    .fetch_one(&mut *conn)
    .instrument(instrument_query(Operation::Insert, "packages"))
    .await;

    match result {
        Ok(package) => Ok(package),
        Err(err) if is_unique_violation(&err) => Err(Error::DuplicateName(package.name)),
        Err(err) => Err(err.into()),
    }
}

#[instrument(name = "get_package_id_by_name", skip(conn))]
pub async fn get_package_id_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<i64>, Error> {
    let id = sqlx::query_scalar::<_, i64>(r#"SELECT id FROM packages WHERE name = $1;"#)
        .bind(name)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "packages"))
        .await?;

    Ok(id)
}

#[instrument(name = "get_package_by_id", skip(conn))]
pub async fn get_package_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Package>, Error> {
    let package = sqlx::query_as::<_, Package>(r#"SELECT * FROM packages WHERE id = $1;"#)
        .bind(id)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "packages"))
        .await?;

    Ok(package)
}

#[instrument(name = "get_packages", skip(conn))]
pub async fn get_packages(conn: &mut PgConnection) -> Result<Vec<Package>, Error> {
    let packages =
        sqlx::query_as::<_, Package>(r#"SELECT * FROM packages ORDER BY created_at, id;"#)
            .fetch_all(&mut *conn)
            .instrument(instrument_query(Operation::Select, "packages"))
            .await?;

    Ok(packages)
}

#[instrument(name = "truncate_registry", skip(conn))]
pub async fn truncate_registry(conn: &mut PgConnection) -> Result<(), Error> {
    conn.execute(
        r#"TRUNCATE package_history, versions, packages, jobs RESTART IDENTITY;"#,
    )
    .instrument(instrument_query(Operation::Delete, "packages"))
    .await?;

    Ok(())
}

#[async_trait]
impl PackageStore for PgStore {
    async fn find_package_id_by_name(&self, name: &str) -> Result<Option<i64>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_package_id_by_name(&mut conn, name).await
    }

    async fn find_package_by_id(&self, id: i64) -> Result<Option<Package>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_package_by_id(&mut conn, id).await
    }

    async fn find_version_by_id(&self, id: i64) -> Result<Option<Version>, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::get_version_by_id(&mut conn, id).await
    }

    async fn list_versions_for_package(&self, package_id: i64) -> Result<Vec<Version>, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::get_versions_by_package_id(&mut conn, package_id).await
    }

    async fn find_version_id(
        &self,
        package_id: i64,
        version: &str,
    ) -> Result<Option<i64>, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::get_version_id(&mut conn, package_id, version).await
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, Error> {
        let mut conn = self.pool.acquire().await?;
        insert_package(&mut conn, package).await
    }

    async fn create_version(&self, version: NewVersion) -> Result<Version, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::insert_version(&mut conn, version).await
    }

    async fn fetch_versions(
        &self,
        filter: &VersionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Version>, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::get_versions_window(&mut conn, filter, offset, limit).await
    }

    async fn list_packages(&self) -> Result<Vec<Package>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_packages(&mut conn).await
    }

    async fn list_versions_with_readme(&self) -> Result<Vec<Version>, Error> {
        let mut conn = self.pool.acquire().await?;
        versions::get_versions_with_readme(&mut conn).await
    }
}
