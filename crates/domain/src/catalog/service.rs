//! Catalog administration.

use std::collections::HashMap;

use record_store::{RecordId, RecordStore, Records};
use validator::Validate;

use super::{
    Category, CategoryPatch, CategoryWithCount, Product, ProductFilter, ProductPatch, seed,
};
use crate::error::{DomainError, Result};
use crate::order::OrderItem;

/// Service for managing categories and products.
pub struct CatalogService<S> {
    records: Records<S>,
}

impl<S: RecordStore> CatalogService<S> {
    pub fn new(records: Records<S>) -> Self {
        Self { records }
    }

    /// Lists categories ordered by name.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.records.get_all().await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    pub async fn category(&self, id: RecordId) -> Result<Category> {
        Ok(self.records.get_by_id(id).await?)
    }

    /// Lists categories ordered by name, with their product counts.
    pub async fn categories_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        let products: Vec<Product> = self.records.get_all().await?;
        let mut counts: HashMap<RecordId, usize> = HashMap::new();
        for product in &products {
            *counts.entry(product.category_id).or_default() += 1;
        }

        Ok(self
            .categories()
            .await?
            .into_iter()
            .map(|category| {
                let product_count = category
                    .id
                    .and_then(|id| counts.get(&id).copied())
                    .unwrap_or(0);
                CategoryWithCount {
                    category,
                    product_count,
                }
            })
            .collect())
    }

    #[tracing::instrument(skip(self, category), fields(name = %category.name))]
    pub async fn create_category(&self, mut category: Category) -> Result<Category> {
        category.id = None;
        category.name = category.name.trim().to_string();
        category.validate()?;

        let _guard = self.records.write_lock().await;
        self.ensure_unique_name(&category.name, None).await?;
        Ok(self.records.insert(category).await?)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_category(&self, id: RecordId, mut patch: CategoryPatch) -> Result<Category> {
        patch.name = patch.name.map(|n| n.trim().to_string());
        patch.validate()?;

        let _guard = self.records.write_lock().await;
        self.records.get_by_id::<Category>(id).await?;
        if let Some(name) = &patch.name {
            self.ensure_unique_name(name, Some(id)).await?;
        }
        Ok(self.records.update(id, &patch).await?)
    }

    /// Deletes a category that no product references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: RecordId) -> Result<Category> {
        let _guard = self.records.write_lock().await;
        self.records.get_by_id::<Category>(id).await?;

        let products: Vec<Product> = self.records.get_all().await?;
        let in_use = products.iter().filter(|p| p.category_id == id).count();
        if in_use > 0 {
            return Err(DomainError::Conflict(format!(
                "category {id} still has {in_use} products"
            )));
        }
        Ok(self.records.delete(id).await?)
    }

    async fn ensure_unique_name(&self, name: &str, except: Option<RecordId>) -> Result<()> {
        let categories: Vec<Category> = self.records.get_all().await?;
        let taken = categories
            .iter()
            .any(|c| c.id != except && c.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(DomainError::Conflict(format!(
                "category name '{name}' is already taken"
            )));
        }
        Ok(())
    }

    /// Lists products matching `filter`, ordered by name.
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self
            .records
            .get_all::<Product>()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    pub async fn product(&self, id: RecordId) -> Result<Product> {
        Ok(self.records.get_by_id(id).await?)
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, mut product: Product) -> Result<Product> {
        product.id = None;
        product.name = product.name.trim().to_string();
        product.validate()?;

        let _guard = self.records.write_lock().await;
        self.ensure_category_exists(product.category_id).await?;
        Ok(self.records.insert(product).await?)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(&self, id: RecordId, mut patch: ProductPatch) -> Result<Product> {
        patch.name = patch.name.map(|n| n.trim().to_string());
        patch.validate()?;

        let _guard = self.records.write_lock().await;
        self.records.get_by_id::<Product>(id).await?;
        if let Some(category_id) = patch.category_id {
            self.ensure_category_exists(category_id).await?;
        }
        Ok(self.records.update(id, &patch).await?)
    }

    /// Deletes a product that no order item references.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: RecordId) -> Result<Product> {
        let _guard = self.records.write_lock().await;
        self.records.get_by_id::<Product>(id).await?;

        let items: Vec<OrderItem> = self.records.get_all().await?;
        if items.iter().any(|item| item.product_id == id) {
            return Err(DomainError::Conflict(format!(
                "product {id} is referenced by existing orders"
            )));
        }
        Ok(self.records.delete(id).await?)
    }

    async fn ensure_category_exists(&self, id: RecordId) -> Result<()> {
        if self.records.find::<Category>(id).await?.is_none() {
            return Err(DomainError::validation(format!(
                "category {id} does not exist"
            )));
        }
        Ok(())
    }

    /// Loads the default categories and products into an empty catalog.
    ///
    /// Returns false without writing when any category or product exists.
    #[tracing::instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<bool> {
        let _guard = self.records.write_lock().await;
        let categories: Vec<Category> = self.records.get_all().await?;
        let products: Vec<Product> = self.records.get_all().await?;
        if !categories.is_empty() || !products.is_empty() {
            return Ok(false);
        }

        let mut category_ids = Vec::new();
        for category in seed::default_categories() {
            let inserted = self.records.insert(category).await?;
            category_ids.extend(inserted.id);
        }
        for product in seed::default_products(&category_ids) {
            self.records.insert(product).await?;
        }

        tracing::info!(
            categories = category_ids.len(),
            "seeded default catalog"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use record_store::InMemoryRecordStore;

    fn service() -> CatalogService<InMemoryRecordStore> {
        CatalogService::new(Records::new(InMemoryRecordStore::new()))
    }

    #[tokio::test]
    async fn seed_defaults_once() {
        let catalog = service();
        assert!(catalog.seed_defaults().await.unwrap());
        assert!(!catalog.seed_defaults().await.unwrap());

        assert_eq!(catalog.categories().await.unwrap().len(), 8);
        let products = catalog.products(&ProductFilter::default()).await.unwrap();
        assert_eq!(products.len(), 12);
    }

    #[tokio::test]
    async fn category_names_are_unique() {
        let catalog = service();
        catalog.create_category(Category::new("Креатин")).await.unwrap();

        let result = catalog.create_category(Category::new(" Креатин ")).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn renaming_to_taken_name_is_rejected() {
        let catalog = service();
        catalog.create_category(Category::new("Gainers")).await.unwrap();
        let other = catalog.create_category(Category::new("Bars")).await.unwrap();

        let result = catalog
            .update_category(
                other.id.unwrap(),
                CategoryPatch {
                    name: Some("gainers".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));

        let kept = catalog
            .update_category(
                other.id.unwrap(),
                CategoryPatch {
                    name: Some("Bars".into()),
                    description: Some("Snacks".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.description.as_deref(), Some("Snacks"));
    }

    #[tokio::test]
    async fn category_with_products_cannot_be_deleted() {
        let catalog = service();
        let category = catalog.create_category(Category::new("Vitamins")).await.unwrap();
        let id = category.id.unwrap();
        let product = catalog
            .create_product(Product::new("Omega 3", Money::new(90_000), id, 10))
            .await
            .unwrap();

        let result = catalog.delete_category(id).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));

        catalog.delete_product(product.id.unwrap()).await.unwrap();
        catalog.delete_category(id).await.unwrap();
        assert!(catalog.categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_requires_existing_category() {
        let catalog = service();
        let result = catalog
            .create_product(Product::new("Orphan", Money::new(1_000), RecordId::new(99), 1))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_product_is_rejected() {
        let catalog = service();
        let category = catalog.create_category(Category::new("Bars")).await.unwrap();
        let result = catalog
            .create_product(Product::new("", Money::new(-5), category.id.unwrap(), 1))
            .await;
        match result {
            Err(DomainError::Validation(messages)) => assert_eq!(messages.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn product_referenced_by_order_cannot_be_deleted() {
        let catalog = service();
        catalog.seed_defaults().await.unwrap();
        catalog
            .records
            .insert(OrderItem::new(
                RecordId::new(1),
                RecordId::new(4),
                "BCAA 2:1:1 500g",
                1,
                Money::new(280_000),
            ))
            .await
            .unwrap();

        let result = catalog.delete_product(RecordId::new(4)).await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn products_filter_and_counts() {
        let catalog = service();
        catalog.seed_defaults().await.unwrap();

        let bars = catalog
            .products(&ProductFilter {
                category_id: Some(RecordId::new(8)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);

        let proteins = catalog
            .products(&ProductFilter {
                search: Some("protein".into()),
                min_price: Some(Money::new(500_000)),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = proteins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Casein Protein 1.8kg", "Isolate Protein 2kg"]);

        let counts = catalog.categories_with_counts().await.unwrap();
        let proteins_count = counts
            .iter()
            .find(|c| c.category.name == "Протеины")
            .map(|c| c.product_count);
        assert_eq!(proteins_count, Some(3));
    }

    #[tokio::test]
    async fn update_product_merges_patch() {
        let catalog = service();
        catalog.seed_defaults().await.unwrap();

        let updated = catalog
            .update_product(
                RecordId::new(1),
                ProductPatch {
                    price: Some(Money::new(470_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::new(470_000));
        assert_eq!(updated.name, "Whey Protein 2kg");
        assert_eq!(updated.stock_quantity, 50);

        let missing = catalog
            .update_product(RecordId::new(404), ProductPatch::stock(1))
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }
}
