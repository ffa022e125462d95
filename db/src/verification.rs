use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::models::verification::VerificationCode;

pub async fn insert_code<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: &str,
    code: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Res<VerificationCode> {
    sqlx::query_as::<_, VerificationCode>(
        r#"
        INSERT INTO verification_codes (phone_number, code, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(phone_number)
    .bind(code)
    .bind(created_at)
    .bind(expires_at)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// The newest code of a phone number; ties on `created_at` go to the higher id.
pub async fn get_latest_code<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: &str,
) -> Res<Option<VerificationCode>> {
    sqlx::query_as::<_, VerificationCode>(
        r#"
        SELECT * FROM verification_codes
        WHERE phone_number = $1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(phone_number)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn delete_code<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    code_id: i64,
) -> Res<u64> {
    sqlx::query("DELETE FROM verification_codes WHERE id = $1")
        .bind(code_id)
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(AppError::from)
}

pub async fn delete_codes<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: &str,
) -> Res<u64> {
    sqlx::query("DELETE FROM verification_codes WHERE phone_number = $1")
        .bind(phone_number)
        .execute(executor)
        .await
        .map(|result| result.rows_affected())
        .map_err(AppError::from)
}

/// Deletes codes that expired at or before `now`. Limited to one phone number when given.
pub async fn delete_expired_codes<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: Option<&str>,
    now: DateTime<Utc>,
) -> Res<u64> {
    sqlx::query(
        r#"
        DELETE FROM verification_codes
        WHERE expires_at <= $1
          AND ($2::TEXT IS NULL OR phone_number = $2)
        "#,
    )
    .bind(now)
    .bind(phone_number)
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(AppError::from)
}
