use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-size stock slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeStock {
    pub name: String,
    pub stock: i32,
}

/// Color grouping with its own size slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorVariant {
    pub name: String,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
}

/// Catalog product snapshot.
///
/// Owned by catalog management; the order path only reads it and decrements
/// the stock fields. Prices are minor units in the base currency (USD).
/// `version` is bumped on every persisted write and guards the commit-time
/// optimistic conflict check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price_minor: i64,
    pub stock: i32,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub colors: Vec<ColorVariant>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub version: i64,
}

impl Product {
    /// Whether any size arrays are configured, flat or nested under a color.
    pub fn has_size_arrays(&self) -> bool {
        !self.sizes.is_empty() || self.colors.iter().any(|c| !c.sizes.is_empty())
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}
