use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{
    dtos::supplier::{SupplierCreateRequest, SupplierUpdateRequest},
    models::supplier::Supplier,
};

pub async fn get_supplier_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
) -> Res<Option<Supplier>> {
    sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_supplier_by_phone<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: &str,
) -> Res<Option<Supplier>> {
    sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE phone_number = $1")
        .bind(phone_number)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts the supplier unless this user already has one.
///
/// Returns the stored row in both cases. A phone number owned by another
/// user violates `suppliers.phone_number` and surfaces as `Conflict`.
pub async fn insert_supplier<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SupplierCreateRequest,
) -> Res<Supplier> {
    sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (user_id, phone_number, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.phone_number)
    .bind(data.name)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Sets `is_verified`; returns the number of matched rows.
///
/// Already verified rows still match, so repeating the call is harmless.
pub async fn mark_phone_verified<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    phone_number: &str,
) -> Res<u64> {
    sqlx::query(
        r#"
        UPDATE suppliers
        SET is_verified = TRUE,
            updated_at = CASE WHEN is_verified THEN updated_at ELSE NOW() END
        WHERE phone_number = $1
        "#,
    )
    .bind(phone_number)
    .execute(executor)
    .await
    .map(|result| result.rows_affected())
    .map_err(AppError::from)
}

pub async fn update_supplier_details<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
    data: SupplierUpdateRequest,
) -> Res<Option<Supplier>> {
    sqlx::query_as::<_, Supplier>(
        r#"
        UPDATE suppliers
        SET market_id = COALESCE($2, market_id),
            place = COALESCE($3, place),
            row_name = COALESCE($4, row_name),
            categories = COALESCE($5, categories),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(data.market_id)
    .bind(data.place)
    .bind(data.row_name)
    .bind(data.categories)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
