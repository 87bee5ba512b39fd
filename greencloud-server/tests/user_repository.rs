#![cfg(feature = "integration")]

use anyhow::Result;
use greencloud_model::{NewUser, Role};
use greencloud_server::users::{
    PostgresUserRepository, RepositoryError, UserRepository,
};
use sqlx::PgPool;

fn new_user(email: &str) -> NewUser {
    NewUser::new("kim", email, "$argon2id$placeholder")
}

#[sqlx::test(migrator = "greencloud_server::MIGRATOR")]
async fn create_then_find(pool: PgPool) -> Result<()> {
    let repo = PostgresUserRepository::new(pool);

    let created = repo.create(new_user("kim@example.com")).await?;
    assert!(created.id > 0);
    assert_eq!(created.role, Role::User);
    assert!(!created.email_confirmed);
    assert!(created.last_login.is_none());

    let by_email = repo.find_by_email("kim@example.com").await?;
    assert_eq!(by_email.as_ref().map(|u| u.id), Some(created.id));

    let by_id = repo.find_by_id(created.id).await?;
    assert_eq!(by_id.map(|u| u.email), Some("kim@example.com".to_string()));

    assert!(repo.exists_by_email("kim@example.com").await?);
    assert!(!repo.exists_by_email("lee@example.com").await?);
    Ok(())
}

#[sqlx::test(migrator = "greencloud_server::MIGRATOR")]
async fn duplicate_email_is_reported(pool: PgPool) -> Result<()> {
    let repo = PostgresUserRepository::new(pool);

    repo.create(new_user("kim@example.com")).await?;
    let err = repo.create(new_user("kim@example.com")).await.unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateEmail));
    Ok(())
}

#[sqlx::test(migrator = "greencloud_server::MIGRATOR")]
async fn record_login_sets_timestamp(pool: PgPool) -> Result<()> {
    let repo = PostgresUserRepository::new(pool);
    let user = repo.create(new_user("kim@example.com")).await?;

    repo.record_login(user.id).await?;

    let reloaded = repo.find_by_id(user.id).await?.expect("user exists");
    assert!(reloaded.last_login.is_some());
    Ok(())
}

#[sqlx::test(migrator = "greencloud_server::MIGRATOR")]
async fn soft_deleted_users_keep_their_email(pool: PgPool) -> Result<()> {
    let repo = PostgresUserRepository::new(pool.clone());
    let user = repo.create(new_user("kim@example.com")).await?;

    sqlx::query("UPDATE users SET deleted_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    assert!(repo.find_by_email("kim@example.com").await?.is_none());
    assert!(repo.find_by_id(user.id).await?.is_none());
    assert!(repo.exists_by_email("kim@example.com").await?);
    Ok(())
}

#[sqlx::test(migrator = "greencloud_server::MIGRATOR")]
async fn ping_succeeds_on_live_pool(pool: PgPool) -> Result<()> {
    PostgresUserRepository::new(pool).ping().await?;
    Ok(())
}
