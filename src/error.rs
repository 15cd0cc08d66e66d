use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("Package {0} already exists")]
    DuplicateName(String),
    #[error("Version {version} of package {package_id} already exists")]
    DuplicateVersion { package_id: i64, version: String },
    #[error("User {0} already exists")]
    DuplicateUser(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("{0}")]
    InvalidQuery(String),
    #[error("Authentication failed")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    RabbitMQ(#[from] lapin::Error),
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateName(_) | Error::DuplicateVersion { .. } | Error::DuplicateUser(_) => {
                StatusCode::CONFLICT
            }
            Error::InvalidPattern(_) | Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Io(_) | Error::Sqlx(_) | Error::RabbitMQ(_) | Error::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
