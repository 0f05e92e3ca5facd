//! Data model definitions for database storage.
//!
//! [`MenuItem`] is a row of the `menu_items` table, [`NewMenuItem`] is the
//! id-less shape handed to bulk insertion, and [`LocalDbModel`] is the
//! envelope used by the key-value table (user profile and friends).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;

/// A single orderable item as persisted in the local store.
///
/// `id` is assigned by the store on insert and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub image: String,
    pub category: String,
}

/// A menu record before the store has assigned it an id.
///
/// This is the shape produced by a [`crate::menu_source::MenuSource`].
/// `price` accepts either a JSON number or a numeric string, since remote
/// payloads are not consistent about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(deserialize_with = "price_from_number_or_string")]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
}

impl NewMenuItem {
    pub fn new(
        name: impl Into<String>,
        price: f64,
        description: impl Into<String>,
        image: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
            image: image.into(),
            category: category.into(),
        }
    }

    /// Checks the record-level invariants: non-empty name, finite
    /// non-negative price, non-empty category.
    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.name.trim().is_empty() {
            return Err(AppResponse::ValidationError("Menu item name must not be empty".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppResponse::ValidationError(format!(
                "Menu item '{}' has invalid price {}",
                self.name, self.price
            )));
        }
        if self.category.trim().is_empty() {
            return Err(AppResponse::ValidationError(format!(
                "Menu item '{}' has no category",
                self.name
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: u64) -> MenuItem {
        MenuItem {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
            image: self.image,
            category: self.category,
        }
    }
}

fn price_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(f64),
        Text(String),
    }

    match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => Ok(n),
        RawPrice::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid price '{s}': {e}"))),
    }
}

/// A flexible envelope for the key-value table.
///
/// - **id**: key the envelope is stored under
/// - **hash**: revision tag, replaced on every write
/// - **data**: arbitrary JSON payload
///
/// ```rust
/// use little_lemon_core::local_db_model::LocalDbModel;
/// use serde_json::json;
///
/// let model = LocalDbModel {
///     id: "user".to_string(),
///     hash: "rev-1".to_string(),
///     data: json!({"firstName": "Tilly", "email": "tilly@example.com"}),
/// };
/// let text = serde_json::to_string(&model)?;
/// let back: LocalDbModel = serde_json::from_str(&text)?;
/// assert_eq!(back.id, "user");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocalDbModel {
    pub id: String,
    pub hash: String,
    pub data: JsonValue,
}
