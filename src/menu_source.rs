//! Providers of the remote menu.
//!
//! The network call itself belongs to the host; the crate only needs
//! something that hands over a complete list or fails as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::app_response::AppResponse;
use crate::config::DEFAULT_IMAGE_URL_TEMPLATE;
use crate::local_db_model::NewMenuItem;

pub trait MenuSource {
    /// Returns the full menu. Any error means nothing was obtained.
    fn fetch_menu(&self) -> Result<Vec<NewMenuItem>, AppResponse>;
}

/// Already-fetched records held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticMenuSource {
    items: Vec<NewMenuItem>,
}

impl StaticMenuSource {
    pub fn new(items: Vec<NewMenuItem>) -> Self {
        Self { items }
    }
}

impl MenuSource for StaticMenuSource {
    fn fetch_menu(&self) -> Result<Vec<NewMenuItem>, AppResponse> {
        Ok(self.items.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MenuPayload {
    menu: Vec<NewMenuItem>,
}

#[derive(Debug, Clone)]
enum Payload {
    Text(String),
    File(PathBuf),
}

/// Parses the remote payload `{"menu": [...]}` and resolves image file names
/// into URIs.
#[derive(Debug, Clone)]
pub struct JsonMenuSource {
    payload: Payload,
    image_url_template: String,
}

impl JsonMenuSource {
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            payload: Payload::Text(json.into()),
            image_url_template: DEFAULT_IMAGE_URL_TEMPLATE.to_string(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            payload: Payload::File(path.as_ref().to_path_buf()),
            image_url_template: DEFAULT_IMAGE_URL_TEMPLATE.to_string(),
        }
    }

    pub fn with_image_url_template(mut self, template: impl Into<String>) -> Self {
        self.image_url_template = template.into();
        self
    }

    fn read_payload(&self) -> Result<String, AppResponse> {
        match &self.payload {
            Payload::Text(text) => Ok(text.clone()),
            Payload::File(path) => fs::read_to_string(path).map_err(|e| {
                AppResponse::DataUnavailable(format!("Cannot read menu payload {}: {e}", path.display()))
            }),
        }
    }
}

impl MenuSource for JsonMenuSource {
    fn fetch_menu(&self) -> Result<Vec<NewMenuItem>, AppResponse> {
        let text = self.read_payload()?;
        let payload: MenuPayload = serde_json::from_str(&text)?;
        Ok(payload
            .menu
            .into_iter()
            .map(|mut item| {
                item.image = resolve_image_url(&self.image_url_template, &item.image);
                item
            })
            .collect())
    }
}

/// Expands an image file name through `template`. Values that are already
/// URIs, and empty values, pass through untouched.
pub fn resolve_image_url(template: &str, image: &str) -> String {
    if image.is_empty() || image.contains("://") {
        return image.to_string();
    }
    if template.contains("{image}") {
        template.replace("{image}", image)
    } else {
        format!("{}/{image}", template.trim_end_matches('/'))
    }
}
