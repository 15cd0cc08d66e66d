use sqlx::PgConnection;
use tracing::{instrument, Instrument};

use crate::{
    db::is_unique_violation,
    error::Error,
    models::version::{NewVersion, Version, VersionFilter},
    telemetry::{instrument_query, Operation},
};

#[instrument(name = "insert_version", skip(conn, version), fields(package_id = version.package_id, version = %version.version))]
pub async fn insert_version(conn: &mut PgConnection, version: NewVersion) -> Result<Version, Error> {
    let result = sqlx::query_as::<_, Version>(
        r#"INSERT INTO versions (version, package_id, author, access_level, program_path, package_url, readme)
        VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *;"#,
    )
    .bind(&version.version)
    .bind(version.package_id)
    .bind(&version.author)
    .bind(version.access_level)
    .bind(&version.program_path)
    .bind(&version.package_url)
    .bind(&version.readme)
    .fetch_one(&mut *conn)
    .instrument(instrument_query(Operation::Insert, "versions"))
    .await;

    match result {
        Ok(version) => Ok(version),
        Err(err) if is_unique_violation(&err) => Err(Error::DuplicateVersion {
            package_id: version.package_id,
            version: version.version,
        }),
        Err(err) => Err(err.into()),
    }
}

#[instrument(name = "get_version_by_id", skip(conn))]
pub async fn get_version_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Version>, Error> {
    let version = sqlx::query_as::<_, Version>(r#"SELECT * FROM versions WHERE id = $1;"#)
        .bind(id)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "versions"))
        .await?;

    Ok(version)
}

#[instrument(name = "get_version_id", skip(conn))]
pub async fn get_version_id(
    conn: &mut PgConnection,
    package_id: i64,
    version: &str,
) -> Result<Option<i64>, Error> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"SELECT id FROM versions WHERE package_id = $1 AND version = $2;"#,
    )
    .bind(package_id)
    .bind(version)
    .fetch_optional(&mut *conn)
    .instrument(instrument_query(Operation::Select, "versions"))
    .await?;

    Ok(id)
}

#[instrument(name = "get_versions_by_package_id", skip(conn))]
pub async fn get_versions_by_package_id(
    conn: &mut PgConnection,
    package_id: i64,
) -> Result<Vec<Version>, Error> {
    let versions = sqlx::query_as::<_, Version>(
        r#"SELECT * FROM versions WHERE package_id = $1 ORDER BY created_at, id;"#,
    )
    .bind(package_id)
    .fetch_all(&mut *conn)
    .instrument(instrument_query(Operation::Select, "versions"))
    .await?;

    Ok(versions)
}

#[instrument(name = "get_versions_window", skip(conn))]
pub async fn get_versions_window(
    conn: &mut PgConnection,
    filter: &VersionFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Version>, Error> {
    let query = match filter {
        VersionFilter::All => sqlx::query_as::<_, Version>(
            r#"SELECT * FROM versions ORDER BY created_at, id OFFSET $1 LIMIT $2;"#,
        )
        .bind(offset)
        .bind(limit),
        VersionFilter::Packages(package_ids) => sqlx::query_as::<_, Version>(
            r#"SELECT * FROM versions WHERE package_id = ANY($3) ORDER BY created_at, id OFFSET $1 LIMIT $2;"#,
        )
        .bind(offset)
        .bind(limit)
        .bind(package_ids),
    };

    let versions = query
        .fetch_all(&mut *conn)
        .instrument(instrument_query(Operation::Select, "versions"))
        .await?;

    Ok(versions)
}

#[instrument(name = "get_versions_with_readme", skip(conn))]
pub async fn get_versions_with_readme(conn: &mut PgConnection) -> Result<Vec<Version>, Error> {
    let versions = sqlx::query_as::<_, Version>(
        r#"SELECT * FROM versions WHERE readme IS NOT NULL ORDER BY created_at, id;"#,
    )
    .fetch_all(&mut *conn)
    .instrument(instrument_query(Operation::Select, "versions"))
    .await?;

    Ok(versions)
}
