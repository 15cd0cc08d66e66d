use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{instrument, Instrument};
use uuid::Uuid;

use crate::{
    db::{JobStore, PgStore},
    error::Error,
    models::job::IngestJob,
    telemetry::{instrument_query, Operation},
};

#[instrument(name = "insert_job", skip(conn))]
pub async fn insert_job(conn: &mut PgConnection, job: IngestJob) -> Result<IngestJob, Error> {
    let result = sqlx::query_as::<_, IngestJob>(
        "INSERT INTO jobs (id, package_name, package_version, url, status, version_id, error, trace_id, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *;",
    )
    .bind(job.id)
    .bind(&job.package_name)
    .bind(&job.package_version)
    .bind(&job.url)
    .bind(job.status.to_string())
    .bind(job.version_id)
    .bind(&job.error)
    .bind(&job.trace_id)
    .bind(job.created_at)
    .fetch_one(&mut *conn)
    .instrument(instrument_query(Operation::Insert, "jobs"))
    .await?;

    Ok(result)
}

#[instrument(name = "complete_job", skip(conn))]
pub async fn complete_job(
    conn: &mut PgConnection,
    id: Uuid,
    version_id: i64,
) -> Result<IngestJob, Error> {
    let job = sqlx::query_as::<_, IngestJob>(
        "UPDATE jobs SET status = 'completed', version_id = $2 WHERE id = $1 RETURNING *;",
    )
    .bind(id)
    .bind(version_id)
    .fetch_optional(&mut *conn)
    .instrument(instrument_query(Operation::Update, "jobs"))
    .await?;

    job.ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))
}

#[instrument(name = "fail_job", skip(conn))]
pub async fn fail_job(conn: &mut PgConnection, id: Uuid, error: &str) -> Result<IngestJob, Error> {
    let job = sqlx::query_as::<_, IngestJob>(
        "UPDATE jobs SET status = 'failed', error = $2 WHERE id = $1 RETURNING *;",
    )
    .bind(id)
    .bind(error)
    .fetch_optional(&mut *conn)
    .instrument(instrument_query(Operation::Update, "jobs"))
    .await?;

    job.ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))
}

#[instrument(name = "get_job_by_id", skip(conn))]
pub async fn get_job_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<IngestJob>, Error> {
    let job = sqlx::query_as::<_, IngestJob>("SELECT * FROM jobs WHERE id = $1;")
        .bind(id)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "jobs"))
        .await?;

    Ok(job)
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: IngestJob) -> Result<IngestJob, Error> {
        let mut conn = self.pool.acquire().await?;
        insert_job(&mut conn, job).await
    }

    async fn complete_job(&self, id: Uuid, version_id: i64) -> Result<IngestJob, Error> {
        let mut conn = self.pool.acquire().await?;
        complete_job(&mut conn, id, version_id).await
    }

    async fn fail_job(&self, id: Uuid, error: &str) -> Result<IngestJob, Error> {
        let mut conn = self.pool.acquire().await?;
        fail_job(&mut conn, id, error).await
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<IngestJob>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_job_by_id(&mut conn, id).await
    }
}
