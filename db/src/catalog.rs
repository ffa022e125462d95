use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{
    dtos::product::{ProductInsert, VariationInsert},
    models::product::{ImageSet, Product, ProductVariation, VariationAttribute},
};

// === WRITES (run inside the ingestion transaction) ===

pub async fn insert_product<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: ProductInsert,
) -> Res<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO product (name, category_id, market_id, status_id, supplier_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(data.name)
    .bind(data.category_id)
    .bind(data.market_id)
    .bind(data.status_id)
    .bind(data.supplier_id)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_product_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
    urls: &[String],
) -> Res<()> {
    sqlx::query("INSERT INTO product_image (product_id, urls) VALUES ($1, $2)")
        .bind(product_id)
        .bind(urls)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn insert_variation<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: VariationInsert,
) -> Res<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO product_variation (product_id, position, price, quantity)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(data.product_id)
    .bind(data.position)
    .bind(data.price)
    .bind(data.quantity)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_variation_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    variation_id: i64,
    urls: &[String],
) -> Res<()> {
    sqlx::query("INSERT INTO product_variation_image (variation_id, urls) VALUES ($1, $2)")
        .bind(variation_id)
        .bind(urls)
        .execute(executor)
        .await?;
    Ok(())
}

/// Get-or-create an attribute by name. The no-op update makes `RETURNING`
/// yield the existing id when the name is already taken.
pub async fn upsert_attribute<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    name: &str,
) -> Res<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO attribute (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

/// Get-or-create an attribute value by `(attribute_id, value)`.
pub async fn upsert_attribute_value<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    attribute_id: i64,
    value: &str,
) -> Res<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO attribute_value (attribute_id, value)
        VALUES ($1, $2)
        ON CONFLICT (attribute_id, value) DO UPDATE SET value = EXCLUDED.value
        RETURNING id
        "#,
    )
    .bind(attribute_id)
    .bind(value)
    .fetch_one(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_variation_attribute_value<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    variation_id: i64,
    attribute_value_id: i64,
) -> Res<()> {
    sqlx::query(
        "INSERT INTO variation_attribute_value (variation_id, attribute_value_id) VALUES ($1, $2)",
    )
    .bind(variation_id)
    .bind(attribute_value_id)
    .execute(executor)
    .await?;
    Ok(())
}

// === READS ===

pub async fn get_products_by_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    status_id: i64,
    limit: i64,
    offset: i64,
) -> Res<Vec<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT * FROM product
        WHERE status_id = $1
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(status_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_product_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
) -> Res<Option<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM product WHERE id = $1")
        .bind(product_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn get_product_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
) -> Res<Option<ImageSet>> {
    sqlx::query_as::<_, ImageSet>(
        "SELECT product_id AS owner_id, urls FROM product_image WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_variations<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
) -> Res<Vec<ProductVariation>> {
    sqlx::query_as::<_, ProductVariation>(
        "SELECT * FROM product_variation WHERE product_id = $1 ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_variation_images<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
) -> Res<Vec<ImageSet>> {
    sqlx::query_as::<_, ImageSet>(
        r#"
        SELECT vi.variation_id AS owner_id, vi.urls
        FROM product_variation_image vi
        JOIN product_variation v ON v.id = vi.variation_id
        WHERE v.product_id = $1
        "#,
    )
    .bind(product_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_variation_attributes<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    product_id: i64,
) -> Res<Vec<VariationAttribute>> {
    sqlx::query_as::<_, VariationAttribute>(
        r#"
        SELECT vav.variation_id, a.name, av.value
        FROM variation_attribute_value vav
        JOIN product_variation v ON v.id = vav.variation_id
        JOIN attribute_value av ON av.id = vav.attribute_value_id
        JOIN attribute a ON a.id = av.attribute_id
        WHERE v.product_id = $1
        ORDER BY vav.variation_id, a.name
        "#,
    )
    .bind(product_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}
