use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto::WhoAmIResponse;
use crate::context::UserContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(user): Extension<UserContext>) -> impl IntoResponse {
    Json(WhoAmIResponse {
        user_id: user.user_id(),
        token_id: user.token_id(),
        expires_at: user.expires_at(),
    })
}
