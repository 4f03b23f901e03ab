use chrono::{DateTime, Utc};
use common::Money;
use record_store::{Collection, Record, RecordId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Category name is required and must be at most 100 characters"
    ))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Category name is required and must be at most 100 characters"
    ))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record for Category {
    const COLLECTION: Collection = Collection::Categories;
    type Patch = CategoryPatch;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name is required and must be at most 255 characters"
    ))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Money,

    pub category_id: RecordId,

    pub stock_quantity: u32,

    #[serde(default)]
    pub emoji: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Highest accepted product price, in so'm.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

fn validate_price(price: &Money) -> Result<(), validator::ValidationError> {
    if !price.is_positive() {
        Err(validator::ValidationError::new("price")
            .with_message("Product price must be greater than zero".into()))
    } else if price.amount() > MAX_PRICE {
        Err(validator::ValidationError::new("price")
            .with_message(format!("Product price must be at most {}", Money::new(MAX_PRICE)).into()))
    } else {
        Ok(())
    }
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: Money,
        category_id: RecordId,
        stock_quantity: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            description: None,
            price,
            category_id,
            stock_quantity,
            emoji: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Returns the persisted id, or 0 for an unsaved product.
    pub fn record_id(&self) -> RecordId {
        self.id.unwrap_or(RecordId::new(0))
    }

    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Case-insensitive match against name and description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Partial update of a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name is required and must be at most 255 characters"
    ))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Money>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// A patch that only sets the stock quantity.
    pub fn stock(stock_quantity: u32) -> Self {
        Self {
            stock_quantity: Some(stock_quantity),
            ..Default::default()
        }
    }
}

impl Record for Product {
    const COLLECTION: Collection = Collection::Products;
    type Patch = ProductPatch;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn stamp_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Filters for listing products. Every set filter must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(default, alias = "category")]
    pub category_id: Option<RecordId>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub min_price: Option<Money>,
    #[serde(default)]
    pub max_price: Option<Money>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category_id) = self.category_id
            && product.category_id != category_id
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
            && !product.matches_search(search)
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        true
    }
}
