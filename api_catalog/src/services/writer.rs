use std::time::Duration;

use async_trait::async_trait;
use common::error::{AppError, Res, ResultExt};
use db::{
    dtos::product::{ProductInsert, VariationInsert},
    models::supplier::Supplier,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::dtos::product::ProductAggregate;

/// The statements of one product ingestion, all inside a single transaction.
#[async_trait]
pub trait CatalogTx: Send {
    async fn insert_product(&mut self, data: ProductInsert) -> Res<i64>;
    async fn insert_product_images(&mut self, product_id: i64, urls: &[String]) -> Res<()>;
    async fn insert_variation(&mut self, data: VariationInsert) -> Res<i64>;
    async fn insert_variation_images(&mut self, variation_id: i64, urls: &[String]) -> Res<()>;
    /// Get-or-create by name, returns the attribute id.
    async fn upsert_attribute(&mut self, name: &str) -> Res<i64>;
    /// Get-or-create by `(attribute_id, value)`, returns the value id.
    async fn upsert_attribute_value(&mut self, attribute_id: i64, value: &str) -> Res<i64>;
    async fn link_attribute_value(&mut self, variation_id: i64, attribute_value_id: i64)
    -> Res<()>;
    async fn commit(self: Box<Self>) -> Res<()>;
    async fn rollback(self: Box<Self>) -> Res<()>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn begin(&self) -> Res<Box<dyn CatalogTx>>;
}

#[async_trait]
impl CatalogStore for PgPool {
    async fn begin(&self) -> Res<Box<dyn CatalogTx>> {
        let tx = sqlx::Pool::begin(self).await?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl CatalogTx for Transaction<'static, Postgres> {
    async fn insert_product(&mut self, data: ProductInsert) -> Res<i64> {
        db::catalog::insert_product(&mut **self, data).await
    }

    async fn insert_product_images(&mut self, product_id: i64, urls: &[String]) -> Res<()> {
        db::catalog::insert_product_images(&mut **self, product_id, urls).await
    }

    async fn insert_variation(&mut self, data: VariationInsert) -> Res<i64> {
        db::catalog::insert_variation(&mut **self, data).await
    }

    async fn insert_variation_images(&mut self, variation_id: i64, urls: &[String]) -> Res<()> {
        db::catalog::insert_variation_images(&mut **self, variation_id, urls).await
    }

    async fn upsert_attribute(&mut self, name: &str) -> Res<i64> {
        db::catalog::upsert_attribute(&mut **self, name).await
    }

    async fn upsert_attribute_value(&mut self, attribute_id: i64, value: &str) -> Res<i64> {
        db::catalog::upsert_attribute_value(&mut **self, attribute_id, value).await
    }

    async fn link_attribute_value(
        &mut self,
        variation_id: i64,
        attribute_value_id: i64,
    ) -> Res<()> {
        db::catalog::insert_variation_attribute_value(&mut **self, variation_id, attribute_value_id)
            .await
    }

    async fn commit(self: Box<Self>) -> Res<()> {
        Transaction::commit(*self).await.map_err(AppError::from)
    }

    async fn rollback(self: Box<Self>) -> Res<()> {
        Transaction::rollback(*self).await.map_err(AppError::from)
    }
}

/// Only a verified supplier may publish products; returns its supplier id.
pub fn publishing_supplier(supplier: Option<Supplier>) -> Res<i64> {
    match supplier {
        None => Err(AppError::Forbidden(
            "Only suppliers can create products".to_string(),
        )),
        Some(s) if !s.is_verified => Err(AppError::Forbidden(
            "Verify the supplier phone number before creating products".to_string(),
        )),
        Some(s) => Ok(s.id),
    }
}

pub async fn supplier_for_user(pool: &PgPool, user_id: i64) -> Res<i64> {
    publishing_supplier(db::supplier::get_supplier_by_user_id(pool, user_id).await?)
}

/// Writes the whole aggregate or nothing.
///
/// The statements run under `timeout`. Any failure (or the timeout) rolls the
/// transaction back and returns the first error; a product id is only
/// returned after a successful commit.
pub async fn create_product(
    store: &dyn CatalogStore,
    supplier_id: i64,
    aggregate: &ProductAggregate,
    timeout: Duration,
) -> Res<i64> {
    aggregate.validate()?;

    let mut tx = store.begin().await.context("begin product transaction")?;
    let outcome =
        match tokio::time::timeout(timeout, write_aggregate(tx.as_mut(), supplier_id, aggregate))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(AppError::Internal(format!(
                "product ingestion exceeded {}ms",
                timeout.as_millis()
            ))),
        };

    match outcome {
        Ok(product_id) => {
            tx.commit().await.context("commit product")?;
            log::info!(
                "Product {} created by supplier {} with {} variations",
                product_id,
                supplier_id,
                aggregate.variations.len()
            );
            Ok(product_id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Rollback of product ingestion failed: {}", rollback_err);
            }
            log::warn!("Product ingestion rolled back: {}", e);
            Err(e)
        }
    }
}

async fn write_aggregate(
    tx: &mut dyn CatalogTx,
    supplier_id: i64,
    aggregate: &ProductAggregate,
) -> Res<i64> {
    let product_id = tx
        .insert_product(ProductInsert {
            name: aggregate.name.trim().to_string(),
            category_id: aggregate.category_id,
            market_id: aggregate.market_id,
            status_id: aggregate.status_id,
            supplier_id,
        })
        .await
        .context("insert product")?;

    if !aggregate.images.is_empty() {
        tx.insert_product_images(product_id, &aggregate.images)
            .await
            .context("insert product images")?;
    }

    for (position, variation) in aggregate.variations.iter().enumerate() {
        let variation_id = tx
            .insert_variation(VariationInsert {
                product_id,
                position: position as i32,
                price: variation.price,
                quantity: variation.quantity,
            })
            .await
            .context("insert variation")?;

        if !variation.images.is_empty() {
            tx.insert_variation_images(variation_id, &variation.images)
                .await
                .context("insert variation images")?;
        }

        for attribute in &variation.attributes {
            let attribute_id = tx
                .upsert_attribute(attribute.name.trim())
                .await
                .context("get or create attribute")?;
            let value_id = tx
                .upsert_attribute_value(attribute_id, attribute.value.trim())
                .await
                .context("get or create attribute value")?;
            tx.link_attribute_value(variation_id, value_id)
                .await
                .context("link attribute value")?;
        }
    }

    Ok(product_id)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::dtos::product::{AttributeInput, VariationInput};

    #[derive(Debug, Clone, Default)]
    struct Tables {
        next_id: i64,
        products: Vec<(i64, String, i64)>,
        product_images: Vec<(i64, Vec<String>)>,
        variations: Vec<(i64, i64, i32)>,
        variation_images: Vec<(i64, Vec<String>)>,
        attributes: Vec<(i64, String)>,
        attribute_values: Vec<(i64, i64, String)>,
        links: Vec<(i64, i64)>,
    }

    impl Tables {
        fn id(&mut self) -> i64 {
            self.next_id += 1;
            self.next_id
        }

        fn row_count(&self) -> usize {
            self.products.len()
                + self.product_images.len()
                + self.variations.len()
                + self.variation_images.len()
                + self.attributes.len()
                + self.attribute_values.len()
                + self.links.len()
        }
    }

    /// Steps at which a transaction can be told to fail or stall.
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Product,
        Link,
    }

    #[derive(Default)]
    struct MemoryCatalog {
        committed: Arc<Mutex<Tables>>,
        rollbacks: Arc<Mutex<usize>>,
        fail_at: Option<Step>,
        stall_at: Option<Step>,
    }

    struct MemoryTx {
        staged: Tables,
        committed: Arc<Mutex<Tables>>,
        rollbacks: Arc<Mutex<usize>>,
        fail_at: Option<Step>,
        stall_at: Option<Step>,
    }

    impl MemoryTx {
        async fn step(&self, step: Step) -> Res<()> {
            if self.stall_at == Some(step) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.fail_at == Some(step) {
                return Err(AppError::Internal(format!("injected failure at {:?}", step)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CatalogStore for MemoryCatalog {
        async fn begin(&self) -> Res<Box<dyn CatalogTx>> {
            let staged = self.committed.lock().unwrap().clone();
            Ok(Box::new(MemoryTx {
                staged,
                committed: Arc::clone(&self.committed),
                rollbacks: Arc::clone(&self.rollbacks),
                fail_at: self.fail_at,
                stall_at: self.stall_at,
            }))
        }
    }

    #[async_trait]
    impl CatalogTx for MemoryTx {
        async fn insert_product(&mut self, data: ProductInsert) -> Res<i64> {
            self.step(Step::Product).await?;
            let id = self.staged.id();
            self.staged.products.push((id, data.name, data.supplier_id));
            Ok(id)
        }

        async fn insert_product_images(&mut self, product_id: i64, urls: &[String]) -> Res<()> {
            self.staged.product_images.push((product_id, urls.to_vec()));
            Ok(())
        }

        async fn insert_variation(&mut self, data: VariationInsert) -> Res<i64> {
            let id = self.staged.id();
            self.staged
                .variations
                .push((id, data.product_id, data.position));
            Ok(id)
        }

        async fn insert_variation_images(&mut self, variation_id: i64, urls: &[String]) -> Res<()> {
            self.staged.variation_images.push((variation_id, urls.to_vec()));
            Ok(())
        }

        async fn upsert_attribute(&mut self, name: &str) -> Res<i64> {
            if let Some((id, _)) = self.staged.attributes.iter().find(|(_, n)| n == name) {
                return Ok(*id);
            }
            let id = self.staged.id();
            self.staged.attributes.push((id, name.to_string()));
            Ok(id)
        }

        async fn upsert_attribute_value(&mut self, attribute_id: i64, value: &str) -> Res<i64> {
            if let Some((id, _, _)) = self
                .staged
                .attribute_values
                .iter()
                .find(|(_, a, v)| *a == attribute_id && v == value)
            {
                return Ok(*id);
            }
            let id = self.staged.id();
            self.staged
                .attribute_values
                .push((id, attribute_id, value.to_string()));
            Ok(id)
        }

        async fn link_attribute_value(
            &mut self,
            variation_id: i64,
            attribute_value_id: i64,
        ) -> Res<()> {
            self.step(Step::Link).await?;
            self.staged.links.push((variation_id, attribute_value_id));
            Ok(())
        }

        async fn commit(self: Box<Self>) -> Res<()> {
            let MemoryTx {
                staged, committed, ..
            } = *self;
            *committed.lock().unwrap() = staged;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Res<()> {
            *self.rollbacks.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn variation(price: i64, attributes: &[(&str, &str)]) -> VariationInput {
        VariationInput {
            price,
            quantity: 5,
            images: vec![],
            attributes: attributes
                .iter()
                .map(|(name, value)| AttributeInput {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    fn aggregate(variations: Vec<VariationInput>) -> ProductAggregate {
        ProductAggregate {
            name: "Tomatoes".to_string(),
            category_id: 3,
            market_id: 1,
            status_id: 1,
            images: vec!["https://cdn.test/products/a.jpg".to_string()],
            variations,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn shared_attribute_value_is_stored_once() {
        let store = MemoryCatalog::default();
        let agg = aggregate(vec![
            variation(100, &[("Color", "Red"), ("Size", "L")]),
            variation(120, &[("Color", "Red")]),
        ]);

        let product_id = create_product(&store, 9, &agg, TIMEOUT).await.unwrap();

        let tables = store.committed.lock().unwrap().clone();
        assert_eq!(tables.products, vec![(product_id, "Tomatoes".to_string(), 9)]);
        assert_eq!(tables.product_images.len(), 1);
        assert_eq!(tables.attributes.len(), 2);
        let red: Vec<_> = tables
            .attribute_values
            .iter()
            .filter(|(_, _, v)| v == "Red")
            .collect();
        assert_eq!(red.len(), 1);
        assert_eq!(tables.links.iter().filter(|(_, v)| *v == red[0].0).count(), 2);
        assert_eq!(tables.links.len(), 3);
    }

    #[tokio::test]
    async fn variations_keep_request_order() {
        let store = MemoryCatalog::default();
        let agg = aggregate(vec![variation(1, &[]), variation(2, &[]), variation(3, &[])]);

        create_product(&store, 1, &agg, TIMEOUT).await.unwrap();

        let tables = store.committed.lock().unwrap().clone();
        let positions: Vec<i32> = tables.variations.iter().map(|(_, _, p)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        // ids follow insertion order as well
        assert!(tables.variations.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[tokio::test]
    async fn failure_while_linking_leaves_no_rows() {
        let store = MemoryCatalog {
            fail_at: Some(Step::Link),
            ..Default::default()
        };
        let agg = aggregate(vec![variation(100, &[("Color", "Red")])]);

        let err = create_product(&store, 1, &agg, TIMEOUT).await.unwrap_err();

        assert!(matches!(err, AppError::Context { ref context, .. } if context == "link attribute value"));
        assert_eq!(store.committed.lock().unwrap().row_count(), 0);
        assert_eq!(*store.rollbacks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_earlier_products_intact() {
        let store = MemoryCatalog::default();
        create_product(&store, 1, &aggregate(vec![variation(1, &[("Color", "Red")])]), TIMEOUT)
            .await
            .unwrap();
        let before = store.committed.lock().unwrap().row_count();

        let failing = MemoryCatalog {
            committed: Arc::clone(&store.committed),
            fail_at: Some(Step::Link),
            ..Default::default()
        };
        assert!(
            create_product(&failing, 1, &aggregate(vec![variation(2, &[("Color", "Blue")])]), TIMEOUT)
                .await
                .is_err()
        );

        assert_eq!(store.committed.lock().unwrap().row_count(), before);
    }

    #[tokio::test]
    async fn stalled_transaction_times_out_and_rolls_back() {
        let store = MemoryCatalog {
            stall_at: Some(Step::Product),
            ..Default::default()
        };
        let agg = aggregate(vec![variation(100, &[])]);

        let err = create_product(&store, 1, &agg, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(*store.rollbacks.lock().unwrap(), 1);
        assert_eq!(store.committed.lock().unwrap().row_count(), 0);
    }

    #[test]
    fn unverified_or_missing_supplier_cannot_publish() {
        let supplier = |is_verified| Supplier {
            id: 4,
            user_id: 8,
            phone_number: "+380501112233".to_string(),
            is_verified,
            name: "Green Farm".to_string(),
            market_id: None,
            place: None,
            row_name: None,
            categories: None,
            created_at: chrono::NaiveDateTime::default(),
            updated_at: chrono::NaiveDateTime::default(),
        };

        assert!(matches!(publishing_supplier(None), Err(AppError::Forbidden(_))));
        assert!(matches!(
            publishing_supplier(Some(supplier(false))),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(publishing_supplier(Some(supplier(true))).unwrap(), 4);
    }

    #[tokio::test]
    async fn invalid_aggregate_never_opens_a_transaction() {
        let store = MemoryCatalog::default();
        let mut agg = aggregate(vec![variation(-1, &[])]);
        agg.name = "Pears".to_string();

        let err = create_product(&store, 1, &agg, TIMEOUT).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(*store.rollbacks.lock().unwrap(), 0);
    }
}
