use common::error::{AppError, Res};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeInput {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariationInput {
    pub price: i64,
    pub quantity: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeInput>,
}

/// Everything written by one product ingestion. Variations keep the order
/// they were sent in, their index becomes the stored position.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductAggregate {
    pub name: String,
    pub category_id: i64,
    pub market_id: i64,
    pub status_id: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variations: Vec<VariationInput>,
}

impl ProductAggregate {
    pub fn validate(&self) -> Res<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("product name is required".to_string()));
        }
        for (field, id) in [
            ("category_id", self.category_id),
            ("market_id", self.market_id),
            ("status_id", self.status_id),
        ] {
            if id <= 0 {
                return Err(AppError::BadRequest(format!("{} must be positive", field)));
            }
        }
        if self.images.iter().any(|url| url.trim().is_empty()) {
            return Err(AppError::BadRequest("product image urls must not be empty".to_string()));
        }

        for (position, variation) in self.variations.iter().enumerate() {
            variation
                .validate()
                .map_err(|msg| AppError::BadRequest(format!("variation {}: {}", position, msg)))?;
        }
        Ok(())
    }
}

impl VariationInput {
    fn validate(&self) -> Result<(), String> {
        if self.price < 0 {
            return Err("price must not be negative".to_string());
        }
        if self.quantity < 0 {
            return Err("quantity must not be negative".to_string());
        }
        if self.images.iter().any(|url| url.trim().is_empty()) {
            return Err("image urls must not be empty".to_string());
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.attributes.len());
        for attribute in &self.attributes {
            let name = attribute.name.trim();
            if name.is_empty() || attribute.value.trim().is_empty() {
                return Err("attribute name and value are required".to_string());
            }
            if seen.contains(&name) {
                return Err(format!("attribute '{}' is repeated", name));
            }
            seen.push(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate() -> ProductAggregate {
        serde_json::from_value(serde_json::json!({
            "name": "Tomatoes",
            "category_id": 3,
            "market_id": 1,
            "status_id": 1,
            "variations": [
                { "price": 4500, "quantity": 10,
                  "attributes": [{ "name": "Color", "value": "Red" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn omitted_lists_default_to_empty() {
        let agg = aggregate();
        assert!(agg.images.is_empty());
        assert!(agg.variations[0].images.is_empty());
        assert!(agg.validate().is_ok());
    }

    #[test]
    fn repeated_attribute_in_one_variation_is_rejected() {
        let mut agg = aggregate();
        agg.variations[0].attributes.push(AttributeInput {
            name: "Color".to_string(),
            value: "Green".to_string(),
        });
        assert!(matches!(agg.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        let mut agg = aggregate();
        agg.category_id = 0;
        assert!(agg.validate().is_err());
    }

    #[test]
    fn blank_attribute_value_is_rejected() {
        let mut agg = aggregate();
        agg.variations[0].attributes[0].value = " ".to_string();
        assert!(agg.validate().is_err());
    }
}
