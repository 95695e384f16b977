use serde::{Deserialize, Serialize};

/// A product that can be recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueItem {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub category: String,
}

impl CatalogueItem {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            category: category.into(),
        }
    }
}

pub(super) fn default_catalogue() -> Vec<CatalogueItem> {
    vec![
        CatalogueItem::new(1, "Laptop", "Powerful laptop for work and gaming.", "electronics"),
        CatalogueItem::new(2, "Smartphone", "Latest smartphone with advanced camera.", "electronics"),
        CatalogueItem::new(3, "Headphones", "Noise-cancelling headphones for immersive audio.", "accessories"),
        CatalogueItem::new(4, "Desk Chair", "Ergonomic chair for comfortable working.", "furniture"),
        CatalogueItem::new(5, "Monitor", "High-resolution monitor for productivity.", "electronics"),
    ]
}
