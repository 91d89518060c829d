use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, header},
    middleware::Next,
    response::Response,
};

use comicverse_auth::{BearerHeader, CookieHeader, IdentityContext};
use comicverse_core::RequestScope;

use crate::app::errors;
use crate::app::services::DynTokenRepository;
use crate::context::UserContext;

/// Cookie consulted when no `Authorization: Bearer` header is present.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
pub struct AuthState {
    pub identity: IdentityContext<DynTokenRepository>,
    pub request_timeout: Duration,
}

/// Attaches a [`RequestScope`] to every request.
///
/// The scope's deadline bounds all storage calls made on behalf of the
/// request, including the revocation lookup below.
pub async fn scope_middleware(
    State(timeout): State<Duration>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    req.extensions_mut()
        .insert(RequestScope::with_timeout(timeout));
    next.run(req).await
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let scope = req
        .extensions()
        .get::<RequestScope>()
        .cloned()
        .unwrap_or_else(|| RequestScope::with_timeout(state.request_timeout));

    let identity = {
        let headers = req.headers();
        let cookies = cookie_header(headers);
        let carrier = (
            header_str(headers, header::AUTHORIZATION).map(BearerHeader),
            cookies
                .as_deref()
                .map(|c| CookieHeader::new(c, TOKEN_COOKIE)),
        );
        state.identity.authenticate(&carrier, &scope).await
    }
    .map_err(errors::identity_error_to_response)?;

    req.extensions_mut().insert(UserContext::from(identity));
    req.extensions_mut().insert(scope);

    Ok(next.run(req).await)
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name)?.to_str().ok()
}

/// All `Cookie` headers folded into one list; HTTP/2 clients may send several.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
