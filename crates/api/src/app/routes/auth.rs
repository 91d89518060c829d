use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use comicverse_auth::Token;
use comicverse_core::RequestScope;

use crate::app::dto::{CredentialsRequest, IssueTokenRequest, IssueTokenResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::UserContext;

/// Development-only routes. Mounted only when dev mode is on.
pub fn dev_router() -> Router {
    Router::new().route("/tokens", post(issue_dev_token))
}

/// Mint a token for any user id. Stands in for a real login flow.
pub async fn issue_dev_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Json(body): Json<IssueTokenRequest>,
) -> Response {
    match services.tokens.issue(body.user_id, &scope).await {
        Ok(token) => (StatusCode::CREATED, Json(issued(&token))).into_response(),
        Err(e) => errors::token_error_to_response(e),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    match services
        .users
        .register(&body.username, &body.password, &scope)
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::user_error_to_response(e),
    }
}

/// Exchange credentials for a token, returned in the body and as the
/// `token` cookie.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let user = match services
        .users
        .authenticate(&body.username, &body.password, &scope)
        .await
    {
        Ok(user) => user,
        Err(e) => return errors::user_error_to_response(e),
    };

    match services.tokens.issue(user.id, &scope).await {
        Ok(token) => (
            [(header::SET_COOKIE, session_cookie(&token))],
            Json(issued(&token)),
        )
            .into_response(),
        Err(e) => errors::token_error_to_response(e),
    }
}

fn issued(token: &Token) -> IssueTokenResponse {
    IssueTokenResponse {
        token: token.encode(),
        token_id: token.id(),
        expires_at: token.expires_at(),
    }
}

fn session_cookie(token: &Token) -> String {
    let max_age = (token.expires_at() - Utc::now()).num_seconds().max(0);
    format!(
        "{}={}; Path=/; Max-Age={max_age}; HttpOnly; Secure; SameSite=Lax",
        crate::middleware::TOKEN_COOKIE,
        token.encode()
    )
}

/// Revoke the token that authenticated this request.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
) -> Response {
    match services.tokens.revoke(user.token_id(), &scope).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::token_error_to_response(e),
    }
}
