use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_tracing_opentelemetry::tracing_opentelemetry_instrumentation_sdk::find_current_trace_id;
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::Utc;
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::{
        middlewares,
        types::{ApiResponse, AppState, PackageData, PackageResponse},
    },
    db::{JobStore, PackageStore},
    error::Error,
    history,
    models::{
        history::HistoryAction,
        job::{IngestJob, JobStatus},
        package::PackageMetadata,
        user::{Permission, User},
        version::AccessLevel,
    },
    search::{self, Cursor, PackageQuery},
    types::IngestMessage,
    upload::{self, Publication},
};

pub const OFFSET_HEADER: &str = "offset";

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/packages", post(search_packages))
        .route("/package", post(upload_package))
        .route("/package/byRegEx", post(search_by_regex))
        .route("/package/:id", get(download_package))
        .route("/package/byName/:name/history", get(get_package_history))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middlewares::authenticate,
        ))
        .with_state(app_state)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub offset: Option<String>,
}

#[instrument(name = "search_packages", skip(app_state, user), fields(user = %user.username))]
pub async fn search_packages(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<SearchQuery>,
    Json(queries): Json<Vec<PackageQuery>>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::Search)?;

    let cursor = match query.offset.as_deref() {
        Some(offset) => offset.parse::<Cursor>()?,
        None => Cursor::default(),
    };

    let page = search::search(&*app_state.store, &queries, cursor, &user.user_group).await?;
    app_state.metrics.registry_searches_total("semver").inc();

    let version_ids: Vec<i64> = page.results.iter().map(|hit| hit.id).collect();
    history::record_all(
        &*app_state.store,
        &user.username,
        &version_ids,
        HistoryAction::Search,
    )
    .await;

    Ok((
        [(OFFSET_HEADER, page.cursor.to_string())],
        Json(page.results),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RegexPayload {
    #[serde(rename = "RegEx")]
    pub regex: String,
}

#[instrument(name = "search_by_regex", skip(app_state, user), fields(user = %user.username))]
pub async fn search_by_regex(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<RegexPayload>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::Search)?;

    let results = search::search_by_pattern(&*app_state.store, &payload.regex).await?;
    app_state.metrics.registry_searches_total("regex").inc();

    let version_ids: Vec<i64> = results.iter().map(|hit| hit.id).collect();
    history::record_all(
        &*app_state.store,
        &user.username,
        &version_ids,
        HistoryAction::Search,
    )
    .await;

    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct UploadPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Content")]
    pub content: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "Readme")]
    pub readme: Option<String>,
    #[serde(rename = "AccessLevel", default)]
    pub access_level: AccessLevel,
}

#[instrument(
    name = "upload_package",
    skip(app_state, user, payload),
    fields(user = %user.username, name = %payload.name, version = %payload.version)
)]
pub async fn upload_package(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UploadPayload>,
) -> Result<Response, Error> {
    user.require(Permission::Upload)?;
    upload::validate_coordinates(&payload.name, &payload.version)?;

    match (payload.content.clone(), payload.url.clone()) {
        (Some(content), None) => upload_content(&app_state, &user, payload, content).await,
        (None, Some(url)) => enqueue_ingestion(&app_state, &user, payload, url).await,
        _ => Err(Error::InvalidQuery(
            "Exactly one of Content or URL is required".to_string(),
        )),
    }
}

async fn upload_content(
    app_state: &AppState,
    user: &User,
    payload: UploadPayload,
    encoded: String,
) -> Result<Response, Error> {
    let content = BASE64_STANDARD
        .decode(encoded.as_bytes())
        .map_err(|err| Error::InvalidQuery(format!("Content is not valid base64: {}", err)))?;

    let version = upload::publish_version(
        &*app_state.store,
        &*app_state.archives,
        Publication {
            name: payload.name.clone(),
            version: payload.version,
            author: user.username.clone(),
            access_level: payload.access_level,
            readme: payload.readme,
            package_url: None,
            content,
        },
    )
    .await?;

    let response = PackageResponse {
        metadata: PackageMetadata {
            id: version.id,
            name: payload.name,
            version: version.version,
        },
        data: PackageData {
            content: encoded,
            url: None,
        },
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn enqueue_ingestion(
    app_state: &AppState,
    user: &User,
    payload: UploadPayload,
    url: String,
) -> Result<Response, Error> {
    url::Url::parse(&url).map_err(|err| Error::InvalidQuery(format!("Invalid URL: {}", err)))?;
    upload::ensure_version_is_new(&*app_state.store, &payload.name, &payload.version).await?;

    let job = app_state
        .store
        .insert_job(IngestJob {
            id: Uuid::now_v7(),
            package_name: payload.name.clone(),
            package_version: payload.version.clone(),
            url: url.clone(),
            status: JobStatus::Processing,
            version_id: None,
            error: None,
            trace_id: find_current_trace_id(),
            created_at: Utc::now(),
        })
        .await?;

    let message = IngestMessage {
        job_id: job.id,
        package_name: payload.name,
        package_version: payload.version,
        url,
        author: user.username.clone(),
        access_level: payload.access_level,
        readme: payload.readme,
    };
    if let Err(err) = app_state.queue.publish(&message).await {
        app_state.store.fail_job(job.id, &err.to_string()).await?;
        return Err(err);
    }

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::new(job))).into_response())
}

#[instrument(name = "download_package", skip(app_state, user), fields(user = %user.username))]
pub async fn download_package(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::Download)?;

    let id = id
        .parse::<i64>()
        .map_err(|_| Error::InvalidQuery(format!("Invalid package ID {:?}", id)))?;
    let not_found = || Error::NotFound(format!("Package with id {} not found", id));

    let version = app_state
        .store
        .find_version_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    let package = app_state
        .store
        .find_package_by_id(version.package_id)
        .await?
        .ok_or_else(not_found)?;
    let content = app_state.archives.get(&version.program_path).await?;

    history::record_all(
        &*app_state.store,
        &user.username,
        &[version.id],
        HistoryAction::Download,
    )
    .await;

    Ok(Json(PackageResponse {
        metadata: PackageMetadata {
            id: version.id,
            name: package.name,
            version: version.version,
        },
        data: PackageData {
            content: BASE64_STANDARD.encode(content),
            url: version.package_url,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub action: Option<String>,
}

#[instrument(name = "get_package_history", skip(app_state, user), fields(user = %user.username))]
pub async fn get_package_history(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, Error> {
    user.require(Permission::Search)?;

    let action = query
        .action
        .ok_or_else(|| Error::InvalidQuery("The action query parameter is required".to_string()))?
        .parse::<HistoryAction>()
        .map_err(Error::InvalidQuery)?;

    let records = history::query(&*app_state.store, &name, action).await?;

    Ok(Json(records))
}
