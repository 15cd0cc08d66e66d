use async_trait::async_trait;
use sqlx::{types::Json, PgConnection};
use tracing::{instrument, Instrument};

use crate::{
    db::{HistoryStore, PgStore},
    error::Error,
    models::history::{HistoryAction, HistoryEntry, NewHistoryEntry},
    telemetry::{instrument_query, Operation},
};

#[instrument(name = "insert_history_entry", skip(conn))]
pub async fn insert_history_entry(
    conn: &mut PgConnection,
    entry: NewHistoryEntry,
) -> Result<HistoryEntry, Error> {
    let entry = sqlx::query_as::<_, HistoryEntry>(
        r#"INSERT INTO package_history (username, date, package_metadata, action) VALUES ($1, $2, $3, $4) RETURNING *;"#,
    )
    .bind(&entry.user)
    .bind(entry.date)
    .bind(Json(&entry.package_metadata))
    .bind(entry.action)
    .fetch_one(&mut *conn)
    .instrument(instrument_query(Operation::Insert, "package_history"))
    .await?;

    Ok(entry)
}

#[instrument(name = "get_history_entries", skip(conn))]
pub async fn get_history_entries(
    conn: &mut PgConnection,
    package_name: &str,
    action: HistoryAction,
) -> Result<Vec<HistoryEntry>, Error> {
    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"SELECT * FROM package_history WHERE package_metadata ->> 'Name' = $1 AND action = $2 ORDER BY date, id;"#,
    )
    .bind(package_name)
    .bind(action)
    .fetch_all(&mut *conn)
    .instrument(instrument_query(Operation::Select, "package_history"))
    .await?;

    Ok(entries)
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, Error> {
        let mut conn = self.pool.acquire().await?;
        insert_history_entry(&mut conn, entry).await
    }

    async fn list_history(
        &self,
        package_name: &str,
        action: HistoryAction,
    ) -> Result<Vec<HistoryEntry>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_history_entries(&mut conn, package_name, action).await
    }
}
