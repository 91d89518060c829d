use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use comicverse_auth::{IdentityError, PermissionError, TokenError};
use comicverse_projects::ProjectError;
use comicverse_users::UserError;

/// Body for every project route that must not reveal whether the project
/// exists: unknown project and missing capability look identical.
pub fn project_not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "project not found")
}

pub fn unavailable() -> axum::response::Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "unavailable",
        "temporarily unavailable, retry later",
    )
}

pub fn identity_error_to_response(err: IdentityError) -> axum::response::Response {
    match err {
        IdentityError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
        IdentityError::Unavailable => unavailable(),
    }
}

pub fn token_error_to_response(err: TokenError) -> axum::response::Response {
    if err.is_transient() {
        unavailable()
    } else {
        json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
    }
}

pub fn permission_error_to_response(err: PermissionError) -> axum::response::Response {
    match err {
        PermissionError::NotFound => project_not_found(),
        PermissionError::RepositoryUnavailable(_) | PermissionError::Canceled => unavailable(),
    }
}

pub fn project_error_to_response(err: ProjectError) -> axum::response::Response {
    match err {
        ProjectError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        ProjectError::NotFound => project_not_found(),
        ProjectError::RepositoryUnavailable(_) | ProjectError::Canceled => unavailable(),
    }
}

pub fn user_error_to_response(err: UserError) -> axum::response::Response {
    match err {
        UserError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        UserError::UsernameTaken => json_error(
            StatusCode::CONFLICT,
            "username_taken",
            "username is already taken",
        ),
        UserError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        UserError::Password(e) => {
            tracing::error!(error = %e, "password handling failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
        UserError::RepositoryUnavailable(_) | UserError::Canceled => unavailable(),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
