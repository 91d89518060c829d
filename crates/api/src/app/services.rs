//! Service wiring: picks storage adapters and builds the auth, user and
//! project services.

use std::sync::Arc;

use anyhow::Context;

use comicverse_auth::{
    IdentityContext, PermissionRepository, PermissionService, ProjectLookup, TokenRepository,
    TokenService,
};
use comicverse_infra::{
    InMemoryPermissionRepository, InMemoryProjectRepository, InMemoryTokenRepository,
    InMemoryUserRepository, PostgresPermissionRepository, PostgresProjectRepository,
    PostgresTokenRepository, PostgresUserRepository, db,
};
use comicverse_projects::{ProjectRepository, ProjectService};
use comicverse_users::{UserRepository, UserService};

use crate::config::AppConfig;

pub type DynTokenRepository = Arc<dyn TokenRepository>;
pub type DynPermissionRepository = Arc<dyn PermissionRepository>;
pub type DynProjectLookup = Arc<dyn ProjectLookup>;
pub type DynProjectRepository = Arc<dyn ProjectRepository>;
pub type DynUserRepository = Arc<dyn UserRepository>;

/// Everything the handlers call into. Shared behind an `Arc`.
pub struct AppServices {
    pub tokens: Arc<TokenService<DynTokenRepository>>,
    pub identity: IdentityContext<DynTokenRepository>,
    pub permissions: PermissionService<DynPermissionRepository, DynProjectLookup>,
    pub projects: ProjectService<DynProjectRepository>,
    pub users: UserService<DynUserRepository>,
}

struct Repositories {
    tokens: DynTokenRepository,
    permissions: DynPermissionRepository,
    projects: DynProjectRepository,
    lookup: DynProjectLookup,
    users: DynUserRepository,
}

/// Build services from config: Postgres when a database URL is configured,
/// in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let repos = match &config.database_url {
        Some(url) => postgres_repositories(url).await?,
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory storage");
            in_memory_repositories()
        }
    };

    let tokens = Arc::new(TokenService::new(config.token.clone(), repos.tokens));
    Ok(AppServices {
        identity: IdentityContext::new(tokens.clone()),
        tokens,
        permissions: PermissionService::new(repos.permissions, repos.lookup),
        projects: ProjectService::new(repos.projects),
        users: UserService::new(repos.users),
    })
}

fn in_memory_repositories() -> Repositories {
    let projects = Arc::new(InMemoryProjectRepository::new());
    Repositories {
        tokens: Arc::new(InMemoryTokenRepository::new()),
        permissions: Arc::new(InMemoryPermissionRepository::new()),
        projects: projects.clone(),
        lookup: projects,
        users: Arc::new(InMemoryUserRepository::new()),
    }
}

async fn postgres_repositories(database_url: &str) -> anyhow::Result<Repositories> {
    let pool = db::connect(database_url)
        .await
        .context("failed to initialize Postgres storage")?;

    let projects = Arc::new(PostgresProjectRepository::new(pool.clone()));
    Ok(Repositories {
        tokens: Arc::new(PostgresTokenRepository::new(pool.clone())),
        permissions: Arc::new(PostgresPermissionRepository::new(pool.clone())),
        projects: projects.clone(),
        lookup: projects,
        users: Arc::new(PostgresUserRepository::new(pool)),
    })
}
