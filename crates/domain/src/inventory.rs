//! Inventory ledger over the `products` collection.

use record_store::{RecordId, RecordStore, Records, WriteGuard};

use crate::catalog::{Product, ProductPatch};
use crate::error::{DomainError, Result};

/// Stock level at or below which a product counts as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Stock reservations and restocks.
///
/// Each operation is a single record update on the product row. The
/// `*_locked` variants are for callers that already hold the store write
/// lock as part of a larger sequence.
pub struct InventoryLedger<S> {
    records: Records<S>,
}

impl<S: RecordStore> InventoryLedger<S> {
    pub fn new(records: Records<S>) -> Self {
        Self { records }
    }

    /// Returns the current stock of a product.
    pub async fn stock(&self, product_id: RecordId) -> Result<u32> {
        let product: Product = self.records.get_by_id(product_id).await?;
        Ok(product.stock_quantity)
    }

    /// Decrements stock by `quantity`.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, product_id: RecordId, quantity: u32) -> Result<Product> {
        let guard = self.records.write_lock().await;
        self.reserve_locked(&guard, product_id, quantity).await
    }

    /// Decrements stock by `quantity` under a held write lock.
    ///
    /// Fails with `InsufficientStock` and leaves stock untouched when
    /// `quantity` exceeds the current stock.
    pub async fn reserve_locked(
        &self,
        _guard: &WriteGuard,
        product_id: RecordId,
        quantity: u32,
    ) -> Result<Product> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        let product: Product = self.records.get_by_id(product_id).await?;
        if quantity > product.stock_quantity {
            return Err(DomainError::InsufficientStock {
                product_id,
                product_name: product.name,
                requested: quantity,
                available: product.stock_quantity,
            });
        }

        let remaining = product.stock_quantity - quantity;
        let updated = self
            .records
            .update::<Product>(product_id, &ProductPatch::stock(remaining))
            .await?;
        tracing::debug!(%product_id, quantity, remaining, "stock reserved");
        Ok(updated)
    }

    /// Increments stock by `quantity`. Restocking is always accepted.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, product_id: RecordId, quantity: u32) -> Result<Product> {
        let guard = self.records.write_lock().await;
        self.release_locked(&guard, product_id, quantity).await
    }

    /// Increments stock by `quantity` under a held write lock.
    pub async fn release_locked(
        &self,
        _guard: &WriteGuard,
        product_id: RecordId,
        quantity: u32,
    ) -> Result<Product> {
        let product: Product = self.records.get_by_id(product_id).await?;
        let restocked = product
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;

        let updated = self
            .records
            .update::<Product>(product_id, &ProductPatch::stock(restocked))
            .await?;
        tracing::debug!(%product_id, quantity, restocked, "stock released");
        Ok(updated)
    }

    /// Overwrites the stock of a product.
    #[tracing::instrument(skip(self))]
    pub async fn set_stock(&self, product_id: RecordId, quantity: u32) -> Result<Product> {
        let _guard = self.records.write_lock().await;
        Ok(self
            .records
            .update::<Product>(product_id, &ProductPatch::stock(quantity))
            .await?)
    }

    /// Products with stock at or below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: u32) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self
            .records
            .get_all::<Product>()
            .await?
            .into_iter()
            .filter(|p| p.stock_quantity <= threshold)
            .collect();
        products.sort_by_key(|p| (p.stock_quantity, p.id));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use record_store::InMemoryRecordStore;

    async fn ledger_with(stock: &[u32]) -> InventoryLedger<InMemoryRecordStore> {
        let records = Records::new(InMemoryRecordStore::new());
        for (i, &qty) in stock.iter().enumerate() {
            records
                .insert(Product::new(
                    format!("Product {i}"),
                    Money::new(10_000),
                    RecordId::new(1),
                    qty,
                ))
                .await
                .unwrap();
        }
        InventoryLedger::new(records)
    }

    #[tokio::test]
    async fn reserve_decrements_stock() {
        let ledger = ledger_with(&[80]).await;
        let product = ledger.reserve(RecordId::new(1), 2).await.unwrap();
        assert_eq!(product.stock_quantity, 78);
        assert_eq!(ledger.stock(RecordId::new(1)).await.unwrap(), 78);
    }

    #[tokio::test]
    async fn reserve_entire_stock_reaches_zero() {
        let ledger = ledger_with(&[3]).await;
        ledger.reserve(RecordId::new(1), 3).await.unwrap();
        assert_eq!(ledger.stock(RecordId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reserve_beyond_stock_is_rejected() {
        let ledger = ledger_with(&[3]).await;
        let result = ledger.reserve(RecordId::new(1), 5).await;
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            })
        ));
        assert_eq!(ledger.stock(RecordId::new(1)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reserve_zero_is_rejected() {
        let ledger = ledger_with(&[3]).await;
        let result = ledger.reserve(RecordId::new(1), 0).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn reserve_missing_product_is_not_found() {
        let ledger = ledger_with(&[]).await;
        let result = ledger.reserve(RecordId::new(7), 1).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn release_is_unbounded() {
        let ledger = ledger_with(&[5]).await;
        let product = ledger.release(RecordId::new(1), 1_000).await.unwrap();
        assert_eq!(product.stock_quantity, 1_005);
    }

    #[tokio::test]
    async fn reserve_then_release_is_identity() {
        let ledger = ledger_with(&[40]).await;
        ledger.reserve(RecordId::new(1), 15).await.unwrap();
        ledger.release(RecordId::new(1), 15).await.unwrap();
        assert_eq!(ledger.stock(RecordId::new(1)).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn low_stock_lists_lowest_first() {
        let ledger = ledger_with(&[50, 4, 10, 0, 11]).await;
        let low = ledger.low_stock(LOW_STOCK_THRESHOLD).await.unwrap();
        let stock: Vec<u32> = low.iter().map(|p| p.stock_quantity).collect();
        assert_eq!(stock, vec![0, 4, 10]);
    }

    #[tokio::test]
    async fn set_stock_overwrites() {
        let ledger = ledger_with(&[2]).await;
        ledger.set_stock(RecordId::new(1), 60).await.unwrap();
        assert_eq!(ledger.stock(RecordId::new(1)).await.unwrap(), 60);
    }
}
