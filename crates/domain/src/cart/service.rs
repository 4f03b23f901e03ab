//! Per-session cart operations.

use std::collections::HashMap;

use common::SessionId;
use record_store::{RecordId, RecordStore, Records, WriteGuard};

use super::{CartEntry, CartLine, CartLinePatch, CartSnapshot, UnavailableLine};
use crate::catalog::Product;
use crate::error::{DomainError, Result};

/// Service for managing shopping carts.
pub struct CartService<S> {
    records: Records<S>,
}

impl<S: RecordStore> CartService<S> {
    pub fn new(records: Records<S>) -> Self {
        Self { records }
    }

    /// Returns the raw lines of a session's cart.
    pub async fn lines(&self, session: &SessionId) -> Result<Vec<CartLine>> {
        Ok(self
            .records
            .get_all::<CartLine>()
            .await?
            .into_iter()
            .filter(|line| line.belongs_to(session))
            .collect())
    }

    async fn line_for(&self, session: &SessionId, product_id: RecordId) -> Result<Option<CartLine>> {
        Ok(self
            .lines(session)
            .await?
            .into_iter()
            .find(|line| line.product_id == product_id))
    }

    fn check_available(product: &Product, requested: u32) -> Result<()> {
        if requested > product.stock_quantity {
            return Err(DomainError::InsufficientStock {
                product_id: product.record_id(),
                product_name: product.name.clone(),
                requested,
                available: product.stock_quantity,
            });
        }
        Ok(())
    }

    /// Adds `quantity` of a product, merging with an existing line.
    #[tracing::instrument(skip(self, session), fields(session = %session))]
    pub async fn add(
        &self,
        session: &SessionId,
        product_id: RecordId,
        quantity: u32,
    ) -> Result<CartLine> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        let _guard = self.records.write_lock().await;
        let product: Product = self.records.get_by_id(product_id).await?;

        match self.line_for(session, product_id).await? {
            Some(line) => {
                let requested = line.quantity.saturating_add(quantity);
                Self::check_available(&product, requested)?;
                let id = line.id.ok_or_else(|| {
                    DomainError::validation("stored cart line has no id")
                })?;
                Ok(self
                    .records
                    .update::<CartLine>(
                        id,
                        &CartLinePatch {
                            quantity: Some(requested),
                        },
                    )
                    .await?)
            }
            None => {
                Self::check_available(&product, quantity)?;
                Ok(self
                    .records
                    .insert(CartLine::new(session.clone(), product_id, quantity))
                    .await?)
            }
        }
    }

    /// Sets the quantity of a product's line. Zero removes the line.
    ///
    /// Returns the resulting line, or `None` when it was removed.
    #[tracing::instrument(skip(self, session), fields(session = %session))]
    pub async fn set_quantity(
        &self,
        session: &SessionId,
        product_id: RecordId,
        quantity: u32,
    ) -> Result<Option<CartLine>> {
        if quantity == 0 {
            self.remove(session, product_id).await?;
            return Ok(None);
        }

        let _guard = self.records.write_lock().await;
        let product: Product = self.records.get_by_id(product_id).await?;
        Self::check_available(&product, quantity)?;

        let line = match self.line_for(session, product_id).await? {
            Some(CartLine { id: Some(id), .. }) => {
                self.records
                    .update::<CartLine>(
                        id,
                        &CartLinePatch {
                            quantity: Some(quantity),
                        },
                    )
                    .await?
            }
            _ => {
                self.records
                    .insert(CartLine::new(session.clone(), product_id, quantity))
                    .await?
            }
        };
        Ok(Some(line))
    }

    /// Removes a product's line. Removing an absent line is not an error.
    ///
    /// Returns true if a line was removed.
    #[tracing::instrument(skip(self, session), fields(session = %session))]
    pub async fn remove(&self, session: &SessionId, product_id: RecordId) -> Result<bool> {
        let _guard = self.records.write_lock().await;
        let removed = self
            .records
            .delete_where::<CartLine, _>(|line| {
                line.belongs_to(session) && line.product_id == product_id
            })
            .await?;
        Ok(!removed.is_empty())
    }

    /// Removes every line of a session's cart. Returns the number removed.
    #[tracing::instrument(skip(self, session), fields(session = %session))]
    pub async fn clear(&self, session: &SessionId) -> Result<usize> {
        let guard = self.records.write_lock().await;
        self.clear_locked(&guard, session).await
    }

    /// Removes every line of a session's cart under a held write lock.
    pub async fn clear_locked(&self, _guard: &WriteGuard, session: &SessionId) -> Result<usize> {
        let removed = self
            .records
            .delete_where::<CartLine, _>(|line| line.belongs_to(session))
            .await?;
        Ok(removed.len())
    }

    /// Prices a session's cart at current product prices.
    ///
    /// Lines whose product no longer exists are left out. A cart whose
    /// total does not fit in [`Money`] is a validation error.
    pub async fn snapshot(&self, session: &SessionId) -> Result<CartSnapshot> {
        let products = self.products_by_id().await?;
        let mut entries = Vec::new();
        for line in self.lines(session).await? {
            let Some(product) = products.get(&line.product_id) else {
                continue;
            };
            let subtotal = product
                .price
                .checked_multiply(line.quantity)
                .ok_or_else(cart_total_too_large)?;
            entries.push(CartEntry {
                line_id: line.id,
                subtotal,
                quantity: line.quantity,
                product: product.clone(),
            });
        }

        CartSnapshot::from_entries(session.clone(), entries).ok_or_else(cart_total_too_large)
    }

    /// Lines asking for more than the current stock.
    pub async fn unavailable_lines(&self, session: &SessionId) -> Result<Vec<UnavailableLine>> {
        let products = self.products_by_id().await?;
        Ok(self
            .lines(session)
            .await?
            .into_iter()
            .filter_map(|line| {
                let (name, available) = match products.get(&line.product_id) {
                    Some(product) => (product.name.clone(), product.stock_quantity),
                    None => (String::new(), 0),
                };
                (line.quantity > available).then(|| UnavailableLine {
                    product_id: line.product_id,
                    product_name: name,
                    requested: line.quantity,
                    available,
                })
            })
            .collect())
    }

    async fn products_by_id(&self) -> Result<HashMap<RecordId, Product>> {
        Ok(self
            .records
            .get_all::<Product>()
            .await?
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect())
    }
}

fn cart_total_too_large() -> DomainError {
    DomainError::validation("Cart total exceeds the largest supported amount")
}
