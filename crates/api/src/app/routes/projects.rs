use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};

use comicverse_auth::Capability;
use comicverse_core::{ProjectId, RequestScope, UserId};

use crate::app::dto::CreateProjectRequest;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project))
        .route("/:id/permissions", get(list_permissions))
        .route(
            "/:id/permissions/:user_id/:capability",
            put(grant_permission).delete(revoke_permission),
        )
}

/// The caller's own projects, newest first.
pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
) -> Response {
    match services.projects.list_owned_by(user.user_id(), &scope).await {
        Ok(projects) => Json(projects).into_response(),
        Err(e) => errors::project_error_to_response(e),
    }
}

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
    Json(body): Json<CreateProjectRequest>,
) -> Response {
    match services
        .projects
        .create(&body.title, user.user_id(), &scope)
        .await
    {
        Ok(project) => (StatusCode::CREATED, Json(project)).into_response(),
        Err(e) => errors::project_error_to_response(e),
    }
}

pub async fn get_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<String>,
) -> Response {
    let project_id = match parse_project_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = require(&services, &user, project_id, &Capability::READ, &scope).await {
        return resp;
    }

    match services.projects.get(project_id, &scope).await {
        Ok(project) => Json(project).into_response(),
        Err(e) => errors::project_error_to_response(e),
    }
}

pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
    Path(id): Path<String>,
) -> Response {
    let project_id = match parse_project_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = require(&services, &user, project_id, &Capability::SHARE, &scope).await {
        return resp;
    }

    match services.permissions.grants(project_id, &scope).await {
        Ok(grants) => Json(grants).into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
    Path((id, grantee, capability)): Path<(String, String, String)>,
) -> Response {
    let (project_id, grantee, capability) = match parse_grant(&id, &grantee, capability) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };
    if let Err(resp) = require(&services, &user, project_id, &Capability::SHARE, &scope).await {
        return resp;
    }

    match services
        .permissions
        .grant(project_id, grantee, capability, &scope)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Extension(scope): Extension<RequestScope>,
    Path((id, grantee, capability)): Path<(String, String, String)>,
) -> Response {
    let (project_id, grantee, capability) = match parse_grant(&id, &grantee, capability) {
        Ok(parsed) => parsed,
        Err(resp) => return resp,
    };
    if let Err(resp) = require(&services, &user, project_id, &Capability::SHARE, &scope).await {
        return resp;
    }

    match services
        .permissions
        .revoke(project_id, grantee, capability, &scope)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::permission_error_to_response(e),
    }
}

/// Denied and unknown project both answer 404.
async fn require(
    services: &AppServices,
    user: &UserContext,
    project_id: ProjectId,
    capability: &Capability,
    scope: &RequestScope,
) -> Result<(), Response> {
    match services
        .permissions
        .check_access(user.user_id(), project_id, capability, scope)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => Err(errors::project_not_found()),
        Err(e) => Err(errors::permission_error_to_response(e)),
    }
}

fn parse_project_id(id: &str) -> Result<ProjectId, Response> {
    id.parse()
        .map_err(|e: comicverse_core::DomainError| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string())
        })
}

fn parse_grant(
    id: &str,
    grantee: &str,
    capability: String,
) -> Result<(ProjectId, UserId, Capability), Response> {
    let project_id = parse_project_id(id)?;
    let grantee = grantee.parse().map_err(|e: comicverse_core::DomainError| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string())
    })?;
    let capability = Capability::parse(capability).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_capability", e.to_string())
    })?;
    Ok((project_id, grantee, capability))
}
