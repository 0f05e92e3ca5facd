//! Runtime configuration for a menu cache handle.
//!
//! The host passes this as JSON to [`crate::create_menu_cache`]; every field
//! has a default so `{}` is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

pub const DEFAULT_DB_NAME: &str = "little_lemon";
pub const DEFAULT_MAP_SIZE_MB: usize = 16;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_IMAGE_URL_TEMPLATE: &str =
    "https://github.com/Meta-Mobile-Developer-PC/Working-With-Data-API/blob/main/images/{image}?raw=true";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Database name; the environment lives in `<db_name>.lmdb`.
    pub db_name: String,
    pub map_size_mb: usize,
    /// Ordered category vocabulary shown as filter chips.
    pub categories: Vec<String>,
    pub search_debounce_ms: u64,
    /// Template used to turn remote image file names into URIs.
    /// `{image}` is replaced with the file name.
    pub image_url_template: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            map_size_mb: DEFAULT_MAP_SIZE_MB,
            categories: ["starters", "mains", "desserts", "drinks"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            image_url_template: DEFAULT_IMAGE_URL_TEMPLATE.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.db_name.trim().is_empty() {
            return Err(AppResponse::ValidationError("db_name must not be empty".to_string()));
        }
        if self.map_size_mb == 0 {
            return Err(AppResponse::ValidationError("map_size_mb must be positive".to_string()));
        }
        if let Some(blank) = self.categories.iter().position(|c| c.trim().is_empty()) {
            return Err(AppResponse::ValidationError(format!(
                "category at position {blank} is blank"
            )));
        }
        Ok(())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = CacheConfig::from_json("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(config.categories, vec!["starters", "mains", "desserts", "drinks"]);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = CacheConfig::from_json(r#"{"db_name":"menu_test","categories":["mains"]}"#).unwrap();
        assert_eq!(config.db_name, "menu_test");
        assert_eq!(config.categories, vec!["mains"]);
        assert_eq!(config.map_size_mb, DEFAULT_MAP_SIZE_MB);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            CacheConfig::from_json(r#"{"db_name":"  "}"#),
            Err(AppResponse::ValidationError(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{"map_size_mb":0}"#),
            Err(AppResponse::ValidationError(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{"categories":["mains",""]}"#),
            Err(AppResponse::ValidationError(_))
        ));
        assert!(matches!(
            CacheConfig::from_json("not json"),
            Err(AppResponse::SerializationError(_))
        ));
    }
}
