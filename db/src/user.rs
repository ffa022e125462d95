use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{dtos::user::UserCreateRequest, models::user::User};

pub async fn get_user_by_username<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    username: &str,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
) -> Res<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} does not exist", user_id)))
}

/// Plain insert, a taken username surfaces as `Conflict`.
pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, roles)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(data.username)
    .bind(data.password_hash)
    .bind(data.roles)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Get-or-create by username in one statement.
///
/// On conflict the existing row is returned with `data.roles` merged into its
/// role set; the password hash of an existing row is never touched.
pub async fn upsert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: UserCreateRequest,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, roles)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO UPDATE
        SET roles = ARRAY(
                SELECT DISTINCT r FROM unnest(users.roles || EXCLUDED.roles) AS r ORDER BY r
            ),
            updated_at = CASE
                WHEN users.roles @> EXCLUDED.roles THEN users.updated_at
                ELSE NOW()
            END
        RETURNING *
        "#,
    )
    .bind(data.username)
    .bind(data.password_hash)
    .bind(data.roles)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
