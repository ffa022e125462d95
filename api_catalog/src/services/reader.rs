use std::collections::{HashMap, HashSet};

use common::{
    error::{AppError, Res},
    misc::Pagination,
};
use db::{
    dtos::category::CategoryInsert,
    models::{
        category::Category,
        product::{ImageSet, Product, ProductVariation, VariationAttribute},
    },
};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Serialize)]
pub struct AttributePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct VariationDetails {
    #[serde(flatten)]
    pub variation: ProductVariation,
    pub images: Vec<String>,
    pub attributes: Vec<AttributePair>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<String>,
    pub variations: Vec<VariationDetails>,
}

fn is_root(category: &Category) -> bool {
    matches!(category.parent_id, None | Some(0))
}

/// Builds the category forest in one pass over the rows.
///
/// Roots have no parent (or parent 0), siblings are ordered by id. Rows whose
/// parent is missing, and everything below them, are left out of the tree.
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let known: HashSet<i64> = categories.iter().map(|c| c.id).collect();
    let mut roots = Vec::new();
    let mut by_parent: HashMap<i64, Vec<Category>> = HashMap::new();

    for category in categories {
        match category.parent_id {
            _ if is_root(&category) => roots.push(category),
            Some(parent_id) if known.contains(&parent_id) => {
                by_parent.entry(parent_id).or_default().push(category)
            }
            parent_id => log::warn!(
                "Category {} points to missing parent {:?}, left out of the tree",
                category.id,
                parent_id
            ),
        }
    }

    roots.sort_by_key(|c| c.id);
    let tree: Vec<CategoryNode> = roots
        .into_iter()
        .map(|root| attach_children(root, &mut by_parent))
        .collect();

    // whatever is left hangs below a dropped category or forms a cycle
    for (parent_id, children) in &by_parent {
        log::warn!(
            "{} categories under {} are unreachable from any root",
            children.len(),
            parent_id
        );
    }
    tree
}

fn attach_children(category: Category, by_parent: &mut HashMap<i64, Vec<Category>>) -> CategoryNode {
    let mut children = by_parent.remove(&category.id).unwrap_or_default();
    children.sort_by_key(|c| c.id);
    let children = children
        .into_iter()
        .map(|child| attach_children(child, by_parent))
        .collect();
    CategoryNode { category, children }
}

pub async fn category_tree(pool: &PgPool) -> Res<Vec<CategoryNode>> {
    let categories = db::category::get_all_categories(pool).await?;
    Ok(build_category_tree(categories))
}

/// Newest first. Bounds are checked before the database is touched.
pub async fn list_by_status(
    pool: &PgPool,
    status_id: i64,
    pagination: &Pagination,
) -> Res<Vec<Product>> {
    if status_id <= 0 {
        return Err(AppError::BadRequest("status_id must be positive".to_string()));
    }
    let (limit, offset) = pagination.limit_offset()?;
    db::catalog::get_products_by_status(pool, status_id, limit, offset).await
}

pub async fn get_product(pool: &PgPool, product_id: i64) -> Res<ProductDetails> {
    let product = db::catalog::get_product_by_id(pool, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} does not exist", product_id)))?;
    let images = db::catalog::get_product_images(pool, product_id).await?;
    let variations = db::catalog::get_variations(pool, product_id).await?;
    let variation_images = db::catalog::get_variation_images(pool, product_id).await?;
    let attributes = db::catalog::get_variation_attributes(pool, product_id).await?;

    Ok(assemble_details(
        product,
        images,
        variations,
        variation_images,
        attributes,
    ))
}

pub fn assemble_details(
    product: Product,
    images: Option<ImageSet>,
    variations: Vec<ProductVariation>,
    variation_images: Vec<ImageSet>,
    attributes: Vec<VariationAttribute>,
) -> ProductDetails {
    let mut images_by_variation: HashMap<i64, Vec<String>> = variation_images
        .into_iter()
        .map(|set| (set.owner_id, set.urls))
        .collect();
    let mut attributes_by_variation: HashMap<i64, Vec<AttributePair>> = HashMap::new();
    for attr in attributes {
        attributes_by_variation
            .entry(attr.variation_id)
            .or_default()
            .push(AttributePair {
                name: attr.name,
                value: attr.value,
            });
    }

    let variations = variations
        .into_iter()
        .map(|variation| VariationDetails {
            images: images_by_variation.remove(&variation.id).unwrap_or_default(),
            attributes: attributes_by_variation
                .remove(&variation.id)
                .unwrap_or_default(),
            variation,
        })
        .collect();

    ProductDetails {
        product,
        images: images.map(|set| set.urls).unwrap_or_default(),
        variations,
    }
}

/// Lowercase, alphanumerics kept, every other run of characters becomes `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn child_path(parent: Option<&Category>, name: &str) -> Res<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "category name must contain letters or digits".to_string(),
        ));
    }
    Ok(match parent {
        Some(parent) => format!("{}/{}", parent.path.trim_end_matches('/'), slug),
        None => format!("/{}", slug),
    })
}

/// The path is derived from the parent's path, so the parent must exist.
pub async fn create_category(
    pool: &PgPool,
    name: &str,
    parent_id: Option<i64>,
    image_url: Option<String>,
) -> Res<Category> {
    let parent = match parent_id.filter(|id| *id != 0) {
        Some(id) => Some(
            db::category::get_category_by_id(pool, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Parent category {} does not exist", id)))?,
        ),
        None => None,
    };
    let path = child_path(parent.as_ref(), name)?;

    let category = db::category::insert_category(
        pool,
        CategoryInsert {
            name: name.trim().to_string(),
            path: path.clone(),
            image_url,
            parent_id: parent.as_ref().map(|p| p.id),
        },
    )
    .await
    .map_err(|e| match e {
        AppError::Conflict(_) => AppError::Conflict(format!("Category {} already exists", path)),
        other => other,
    })?;
    log::info!("Category {} created at {}", category.id, category.path);
    Ok(category)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn category(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: format!("c{}", id),
            path: format!("/c{}", id),
            image_url: None,
            parent_id,
            created_at: NaiveDateTime::default(),
        }
    }

    fn ids(nodes: &[CategoryNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.category.id).collect()
    }

    #[test]
    fn tree_nests_children_under_their_parents() {
        let tree = build_category_tree(vec![
            category(1, None),
            category(2, Some(1)),
            category(3, Some(1)),
            category(4, Some(2)),
        ]);

        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(ids(&tree[0].children), vec![2, 3]);
        assert_eq!(ids(&tree[0].children[0].children), vec![4]);
        assert!(tree[0].children[1].children.is_empty());
    }

    #[test]
    fn zero_parent_is_a_root_and_orphans_are_dropped() {
        let tree = build_category_tree(vec![
            category(5, Some(99)),
            category(6, Some(5)),
            category(3, Some(0)),
            category(1, None),
        ]);

        assert_eq!(ids(&tree), vec![1, 3]);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn siblings_are_ordered_by_id_regardless_of_input_order() {
        let tree = build_category_tree(vec![
            category(9, Some(1)),
            category(1, None),
            category(4, Some(1)),
            category(7, Some(1)),
        ]);
        assert_eq!(ids(&tree[0].children), vec![4, 7, 9]);
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert!(build_category_tree(vec![]).is_empty());
    }

    #[test]
    fn tree_serializes_category_fields_inline() {
        let tree = build_category_tree(vec![category(1, None), category(2, Some(1))]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["id"], 1);
        assert_eq!(json[0]["children"][0]["path"], "/c2");
    }

    #[test]
    fn slugs_and_paths() {
        assert_eq!(slugify("  Fresh Fruit & Veg "), "fresh-fruit-veg");
        assert_eq!(slugify("Овочі"), "овочі");

        let parent = category(1, None);
        assert_eq!(child_path(None, "Dairy").unwrap(), "/dairy");
        assert_eq!(child_path(Some(&parent), "Hard Cheese").unwrap(), "/c1/hard-cheese");
        assert!(matches!(child_path(None, "!!"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn details_group_images_and_attributes_per_variation() {
        let product = Product {
            id: 10,
            name: "Tomatoes".to_string(),
            category_id: 1,
            market_id: 1,
            status_id: 1,
            supplier_id: 2,
            created_at: NaiveDateTime::default(),
        };
        let variation = |id, position| ProductVariation {
            id,
            product_id: 10,
            position,
            price: 100,
            quantity: 1,
        };
        let details = assemble_details(
            product,
            None,
            vec![variation(20, 0), variation(21, 1)],
            vec![ImageSet {
                owner_id: 21,
                urls: vec!["https://cdn.test/v21.jpg".to_string()],
            }],
            vec![VariationAttribute {
                variation_id: 20,
                name: "Color".to_string(),
                value: "Red".to_string(),
            }],
        );

        assert!(details.images.is_empty());
        assert_eq!(details.variations[0].attributes[0].value, "Red");
        assert!(details.variations[0].images.is_empty());
        assert_eq!(details.variations[1].images.len(), 1);
        assert!(details.variations[1].attributes.is_empty());
    }
}
