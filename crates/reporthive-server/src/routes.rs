//! HTTP routes and handlers.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use reporthive_core::{decode_branch, Error};
use reporthive_db::general;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::ingest::{self, Upload};
use crate::retention;
use crate::state::{AppState, JobContext};
use crate::views;
use crate::files;

/// Error wrapper translating the core taxonomy into HTTP responses.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the service router. Calls arrive from CI uploaders and dashboards
/// on other origins, so CORS is wide open and the `Location` header of a
/// 201 is exposed to browser scripts.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::LOCATION]);

    Router::new()
        .route("/:job", get(get_job).post(post_upload).put(put_general))
        .route(
            "/:job/:branch",
            get(get_branch).delete(delete_branch),
        )
        .route(
            "/:job/:branch/:id",
            get(get_build).delete(delete_old_builds),
        )
        .route("/:job/:branch/:id/*path", get(get_file))
        // Result archives of large test suites run into the hundreds of MB.
        .layer(DefaultBodyLimit::max(1024 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve a build-id path segment, where `latest` means the highest id.
async fn resolve_build_id(ctx: &JobContext, branch: &str, segment: &str) -> Result<i64, Error> {
    if segment == "latest" {
        views::latest_build_id(ctx, branch).await
    } else {
        segment
            .parse()
            .map_err(|_| Error::validation(format!("invalid build id: {segment}")))
    }
}

async fn get_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> ApiResult<Json<views::JobView>> {
    let ctx = state.job(&job)?;
    Ok(Json(views::job_view(&ctx).await?))
}

async fn post_upload(
    State(state): State<AppState>,
    Path(job): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let ctx = state.job(&job)?;

    let mut metadata = None;
    let mut archive = None;
    let mut failed_tests = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("metadata_file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::validation(format!("unreadable metadata part: {e}")))?;
                metadata = Some(bytes.to_vec());
            }
            Some("zip_file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::validation(format!("unreadable archive part: {e}")))?;
                archive = Some(bytes.to_vec());
            }
            Some("failed_junit_tests") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::validation(format!("unreadable text part: {e}")))?;
                failed_tests = Some(text);
            }
            _ => {}
        }
    }

    let upload = Upload {
        metadata: metadata
            .ok_or_else(|| Error::validation("missing 'metadata_file' part"))?,
        archive: archive.ok_or_else(|| Error::validation("missing 'zip_file' part"))?,
        failed_tests,
    };

    let location = ingest::process_upload(&ctx, upload).await?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

/// `PUT /{job}`: replace the general info. The body is parsed by hand so
/// that every malformed shape lands on the Validation row of the status
/// table instead of the extractor's own rejection code.
async fn put_general(
    State(state): State<AppState>,
    Path(job): Path<String>,
    body: axum::body::Bytes,
) -> ApiResult<StatusCode> {
    let ctx = state.job(&job)?;

    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| Error::validation(format!("body is not valid JSON: {e}")))?;
    let job_url = value
        .get("job")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation("missing 'job'"))?;
    let git_url = value
        .get("git")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation("missing 'git'"))?;

    let mut conn = ctx.db.acquire().await?;
    general::update(&mut conn, job_url, git_url).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_branch(
    State(state): State<AppState>,
    Path((job, branch)): Path<(String, String)>,
) -> ApiResult<Json<views::BranchView>> {
    let ctx = state.job(&job)?;
    let branch = decode_branch(&branch);
    Ok(Json(views::branch_view(&ctx, &branch).await?))
}

async fn delete_branch(
    State(state): State<AppState>,
    Path((job, branch)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let ctx = state.job(&job)?;
    let branch = decode_branch(&branch);
    retention::delete_branch(&ctx, &branch).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_build(
    State(state): State<AppState>,
    Path((job, branch, id)): Path<(String, String, String)>,
) -> ApiResult<Json<views::BuildView>> {
    let ctx = state.job(&job)?;
    let branch = decode_branch(&branch);
    let id = resolve_build_id(&ctx, &branch, &id).await?;
    Ok(Json(views::build_view(&ctx, &branch, id).await?))
}

/// `DELETE /{job}/{branch}/{keep}`: the trailing segment is the number of
/// newest builds to retain, not a build id.
async fn delete_old_builds(
    State(state): State<AppState>,
    Path((job, branch, keep)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let ctx = state.job(&job)?;
    let branch = decode_branch(&branch);

    let keep: usize = keep
        .parse()
        .ok()
        .filter(|k| *k > 0)
        .ok_or_else(|| Error::validation(format!("invalid keep count: {keep}")))?;

    retention::keep_latest(&ctx, &branch, keep).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_file(
    State(state): State<AppState>,
    Path((job, branch, id, path)): Path<(String, String, String, String)>,
) -> ApiResult<Response> {
    let ctx = state.job(&job)?;
    let branch = decode_branch(&branch);
    let id = resolve_build_id(&ctx, &branch, &id).await?;

    {
        let mut conn = ctx.db.acquire().await?;
        reporthive_db::builds::get(&mut conn, &branch, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("no build {id} on branch {branch}")))?;
    }

    let file = files::resolve_file(&ctx.build_dir(&branch, id), &path)?;
    let body = tokio::fs::read(&file).await.map_err(Error::from)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, files::content_type(&file))],
        body,
    )
        .into_response())
}
