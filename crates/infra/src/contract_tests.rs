//! Behaviour every repository implementation must share.
//!
//! Each suite is written once against the trait. The in-memory adapters run
//! it on every `cargo test`; the Postgres adapters run it when
//! `DATABASE_URL` points at a scratch database and skip otherwise.
//! Fixtures use fresh ids, so suites can run repeatedly against one database.

use chrono::{Duration, SubsecRound, Utc};

use comicverse_auth::{
    Capability, Permission, PermissionRepository, ProjectLookup, Token, TokenRepository,
};
use comicverse_core::{ProjectId, RepositoryError, TokenId, UserId};
use comicverse_projects::{Project, ProjectRepository};
use comicverse_users::{User, UserRepository};

fn token(user_id: UserId) -> Token {
    // Both stores keep the millisecond timestamps tokens carry on the wire.
    let now = Utc::now().trunc_subsecs(3);
    Token::from_parts(
        TokenId::new(),
        user_id,
        now,
        now + Duration::minutes(5),
        [7u8; 64],
        false,
    )
}

pub(crate) async fn token_repository_contract(repo: &impl TokenRepository) {
    let user = UserId::new();
    let bystander = UserId::new();

    // Unknown ids fail closed.
    assert_eq!(repo.is_revoked(TokenId::new()).await, Ok(true));

    let first = token(user);
    repo.save(&first).await.unwrap();
    assert_eq!(repo.is_revoked(first.id()).await, Ok(false));

    // Saving an id again keeps the first record, so a replay cannot un-revoke.
    repo.revoke(first.id()).await.unwrap();
    repo.save(&first).await.unwrap();
    assert_eq!(repo.is_revoked(first.id()).await, Ok(true));

    // Revoke is idempotent and ignores unknown ids.
    repo.revoke(first.id()).await.unwrap();
    repo.revoke(TokenId::new()).await.unwrap();
    assert_eq!(repo.is_revoked(first.id()).await, Ok(true));

    // revoke_all counts only tokens that changed state.
    let (second, third, other) = (token(user), token(user), token(bystander));
    for t in [&second, &third, &other] {
        repo.save(t).await.unwrap();
    }
    assert_eq!(repo.revoke_all_for_user(user).await, Ok(2));
    assert_eq!(repo.revoke_all_for_user(user).await, Ok(0));
    assert_eq!(repo.is_revoked(second.id()).await, Ok(true));
    assert_eq!(repo.is_revoked(third.id()).await, Ok(true));
    assert_eq!(repo.is_revoked(other.id()).await, Ok(false));
}

pub(crate) async fn permission_repository_contract(repo: &impl PermissionRepository) {
    let (project, elsewhere) = (ProjectId::new(), ProjectId::new());
    let (alice, bob) = (UserId::new(), UserId::new());
    let read = Permission::new(project, alice, Capability::READ);

    assert_eq!(repo.has(&read).await, Ok(false));
    assert!(repo.list_for_project(project).await.unwrap().is_empty());

    repo.grant(&read).await.unwrap();
    repo.grant(&read).await.unwrap();
    assert_eq!(repo.has(&read).await, Ok(true));
    assert_eq!(
        repo.has(&Permission::new(elsewhere, alice, Capability::READ)).await,
        Ok(false)
    );
    assert_eq!(
        repo.has(&Permission::new(project, alice, Capability::WRITE)).await,
        Ok(false)
    );

    let share = Permission::new(project, alice, Capability::SHARE);
    let bob_read = Permission::new(project, bob, Capability::READ);
    repo.grant(&share).await.unwrap();
    repo.grant(&bob_read).await.unwrap();
    repo.grant(&Permission::new(elsewhere, bob, Capability::WRITE))
        .await
        .unwrap();

    let mut expected = vec![read.clone(), share, bob_read];
    expected.sort_by(|a, b| {
        a.user_id
            .cmp(&b.user_id)
            .then_with(|| a.capability.cmp(&b.capability))
    });
    assert_eq!(repo.list_for_project(project).await.unwrap(), expected);

    repo.revoke(&read).await.unwrap();
    repo.revoke(&read).await.unwrap();
    assert_eq!(repo.has(&read).await, Ok(false));
    assert_eq!(repo.list_for_project(project).await.unwrap().len(), 2);
}

pub(crate) async fn project_repository_contract<R>(repo: &R)
where
    R: ProjectRepository + ProjectLookup,
{
    let owner = UserId::new();
    let unknown = ProjectId::new();
    assert_eq!(repo.get(unknown).await, Err(RepositoryError::NotFound));
    assert_eq!(repo.owner_of(unknown).await, Err(RepositoryError::NotFound));

    let now = Utc::now();
    let old = Project::new("Old Pages", owner, now - Duration::days(2)).unwrap();
    let tie_a = Project::new("Tie A", owner, now).unwrap();
    let tie_b = Project::new("Tie B", owner, now).unwrap();
    let foreign = Project::new("Foreign", UserId::new(), now).unwrap();
    for p in [&old, &tie_a, &tie_b, &foreign] {
        repo.insert(p).await.unwrap();
    }

    assert_eq!(repo.get(old.id).await, Ok(old.clone()));
    assert_eq!(repo.owner_of(old.id).await, Ok(owner));

    // Newest first; equal timestamps fall back to the larger id first.
    let mut ties = vec![tie_a, tie_b];
    ties.sort_by(|a, b| b.id.cmp(&a.id));
    let expected: Vec<Project> = ties.into_iter().chain([old.clone()]).collect();
    assert_eq!(repo.list_owned_by(owner).await.unwrap(), expected);

    // Ids are never reused; a second insert leaves the first row.
    let mut replay = old.clone();
    replay.title = "Rewritten".into();
    repo.insert(&replay).await.unwrap();
    assert_eq!(repo.get(old.id).await.unwrap().title, "Old Pages");
}

pub(crate) async fn user_repository_contract(repo: &impl UserRepository) {
    // Unique per run so the suite can share a database.
    let suffix = UserId::new().as_uuid().simple().to_string();
    let username = format!("u{}", &suffix[16..]);
    let user = User::new(username.clone(), "$argon2id$v=19$stub".into(), Utc::now());

    assert_eq!(repo.find_by_username(&username).await, Ok(None));
    assert_eq!(repo.insert(&user).await, Ok(true));
    assert_eq!(repo.find_by_username(&username).await, Ok(Some(user.clone())));

    // A second account under the same name is refused and changes nothing.
    let rival = User::new(username.clone(), "$argon2id$v=19$other".into(), Utc::now());
    assert_eq!(repo.insert(&rival).await, Ok(false));
    assert_eq!(repo.find_by_username(&username).await, Ok(Some(user)));
}

mod in_memory {
    use super::*;
    use crate::{
        InMemoryPermissionRepository, InMemoryProjectRepository, InMemoryTokenRepository,
        InMemoryUserRepository,
    };

    #[tokio::test]
    async fn tokens() {
        token_repository_contract(&InMemoryTokenRepository::new()).await;
    }

    #[tokio::test]
    async fn permissions() {
        permission_repository_contract(&InMemoryPermissionRepository::new()).await;
    }

    #[tokio::test]
    async fn projects() {
        project_repository_contract(&InMemoryProjectRepository::new()).await;
    }

    #[tokio::test]
    async fn users() {
        user_repository_contract(&InMemoryUserRepository::new()).await;
    }
}

mod postgres {
    use sqlx::PgPool;

    use super::*;
    use crate::{
        PostgresPermissionRepository, PostgresProjectRepository, PostgresTokenRepository,
        PostgresUserRepository, db,
    };

    /// A pool on `DATABASE_URL` with the schema applied, or `None` to skip.
    async fn pool() -> Option<PgPool> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres suite");
            return None;
        };
        Some(db::connect(&url).await.expect("DATABASE_URL is set but unusable"))
    }

    #[tokio::test]
    async fn tokens() {
        let Some(pool) = pool().await else { return };
        let repo = PostgresTokenRepository::new(pool);
        token_repository_contract(&repo).await;

        // Stored rows decode back to the saved token.
        let saved = token(UserId::new());
        repo.save(&saved).await.unwrap();
        assert_eq!(repo.get(saved.id()).await, Ok(Some(saved)));
        assert_eq!(repo.get(TokenId::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn permissions() {
        let Some(pool) = pool().await else { return };
        permission_repository_contract(&PostgresPermissionRepository::new(pool)).await;
    }

    #[tokio::test]
    async fn projects() {
        let Some(pool) = pool().await else { return };
        project_repository_contract(&PostgresProjectRepository::new(pool)).await;
    }

    #[tokio::test]
    async fn users() {
        let Some(pool) = pool().await else { return };
        user_repository_contract(&PostgresUserRepository::new(pool)).await;
    }
}
