use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{dtos::category::CategoryInsert, models::category::Category};

pub async fn get_all_categories<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM category ORDER BY id")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_category_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    category_id: i64,
) -> Res<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM category WHERE id = $1")
        .bind(category_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// A duplicate `path` surfaces as `Conflict`.
pub async fn insert_category<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: CategoryInsert,
) -> Res<Category> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO category (name, path, image_url, parent_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(data.name)
    .bind(data.path)
    .bind(data.image_url)
    .bind(data.parent_id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}
