use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{instrument, Instrument};

use crate::{
    db::{is_unique_violation, PgStore, UserStore},
    error::Error,
    models::user::{NewUser, User},
    telemetry::{instrument_query, Operation},
};

#[instrument(name = "insert_user", skip(conn, user), fields(username = %user.username))]
pub async fn insert_user(conn: &mut PgConnection, user: NewUser) -> Result<User, Error> {
    let result = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (username, user_group, token, is_admin, can_upload, can_search, can_download)
        VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *;"#,
    )
    .bind(&user.username)
    .bind(&user.user_group)
    .bind(&user.token)
    .bind(user.is_admin)
    .bind(user.can_upload)
    .bind(user.can_search)
    .bind(user.can_download)
    .fetch_one(&mut *conn)
    .instrument(instrument_query(Operation::Insert, "users"))
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(err) if is_unique_violation(&err) => Err(Error::DuplicateUser(user.username)),
        Err(err) => Err(err.into()),
    }
}

#[instrument(name = "get_user_by_token", skip_all)]
pub async fn get_user_by_token(conn: &mut PgConnection, token: &str) -> Result<Option<User>, Error> {
    let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE token = $1;"#)
        .bind(token)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "users"))
        .await?;

    Ok(user)
}

#[instrument(name = "get_user_by_name", skip(conn))]
pub async fn get_user_by_name(
    conn: &mut PgConnection,
    username: &str,
) -> Result<Option<User>, Error> {
    let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE username = $1;"#)
        .bind(username)
        .fetch_optional(&mut *conn)
        .instrument(instrument_query(Operation::Select, "users"))
        .await?;

    Ok(user)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_user_by_token(&mut conn, token).await
    }

    async fn find_user_by_name(&self, username: &str) -> Result<Option<User>, Error> {
        let mut conn = self.pool.acquire().await?;
        get_user_by_name(&mut conn, username).await
    }
}
