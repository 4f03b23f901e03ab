//! Order queries, status changes and deletion.

use std::collections::BTreeMap;

use common::Money;
use record_store::{Collection, RecordId, RecordStore, Records, WriteGuard};

use super::{Order, OrderDetails, OrderItem, OrderPatch, OrderStatistics, OrderStatus};
use crate::error::{DomainError, Result};
use crate::inventory::InventoryLedger;

/// Collections written when an order is deleted.
const DELETE_COLLECTIONS: [Collection; 3] =
    [Collection::Products, Collection::OrderItems, Collection::Orders];

/// Service for reading and administering placed orders.
///
/// Orders are created by the checkout transaction; this service only
/// moves them along the status graph and removes them.
pub struct OrderService<S> {
    records: Records<S>,
}

impl<S: RecordStore> OrderService<S> {
    pub fn new(records: Records<S>) -> Self {
        Self { records }
    }

    /// Moves an order to `status`.
    ///
    /// Inventory is never touched here, including on cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: RecordId, status: OrderStatus) -> Result<Order> {
        let _guard = self.records.write_lock().await;
        let order: Order = self.records.get_by_id(order_id).await?;

        if !order.status.can_transition_to(status) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }

        let updated = self
            .records
            .update::<Order>(
                order_id,
                &OrderPatch {
                    status: Some(status),
                },
            )
            .await?;

        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(%order_id, from = %order.status, to = %status, "order status changed");
        Ok(updated)
    }

    /// Returns an order with its items.
    pub async fn get(&self, order_id: RecordId) -> Result<OrderDetails> {
        let order: Order = self.records.get_by_id(order_id).await?;
        let items = self.items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Returns the items of an order, in insertion order.
    pub async fn items(&self, order_id: RecordId) -> Result<Vec<OrderItem>> {
        Ok(self
            .records
            .get_all::<OrderItem>()
            .await?
            .into_iter()
            .filter(|item| item.order_id == order_id)
            .collect())
    }

    /// Lists orders newest first.
    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.records.get_all().await?;
        sort_newest_first(&mut orders);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    /// Lists orders in one status, newest first.
    pub async fn by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .records
            .get_all::<Order>()
            .await?
            .into_iter()
            .filter(|order| order.status == status)
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// Counts per status, total revenue and average order value.
    pub async fn statistics(&self) -> Result<OrderStatistics> {
        let orders: Vec<Order> = self.records.get_all().await?;

        let mut by_status: BTreeMap<String, usize> = OrderStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for order in &orders {
            *by_status.entry(order.status.as_str().to_string()).or_default() += 1;
        }

        let total_revenue: Money = orders.iter().map(|o| o.total_amount).sum();
        let average_order_value = match i64::try_from(orders.len()) {
            Ok(count) if count > 0 => Money::new(total_revenue.amount() / count),
            _ => Money::zero(),
        };

        Ok(OrderStatistics {
            total_orders: orders.len(),
            by_status,
            total_revenue,
            average_order_value,
        })
    }

    /// Deletes an order and its items, returning their stock.
    ///
    /// Delivered orders cannot be deleted. The restock and both deletes
    /// apply together: if any write fails, products, items and orders are
    /// restored to their state before the call.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: RecordId) -> Result<OrderDetails> {
        let guard = self.records.write_lock().await;
        let order: Order = self.records.get_by_id(order_id).await?;
        if order.status == OrderStatus::Delivered {
            return Err(DomainError::Conflict(format!(
                "order {order_id} has been delivered and cannot be deleted"
            )));
        }

        let snapshot = self.records.snapshot(&DELETE_COLLECTIONS).await?;
        match self.delete_locked(&guard, order_id).await {
            Ok(details) => {
                tracing::info!(%order_id, items = details.items.len(), "order deleted");
                Ok(details)
            }
            Err(error) => {
                if let Err(e) = self.records.restore(&snapshot).await {
                    tracing::error!(%order_id, error = %e, "order deletion left the store partially restored");
                }
                metrics::counter!("order_deletions_rolled_back").increment(1);
                tracing::warn!(%order_id, error = %error, "order deletion rolled back");
                Err(error)
            }
        }
    }

    async fn delete_locked(&self, guard: &WriteGuard, order_id: RecordId) -> Result<OrderDetails> {
        let ledger = InventoryLedger::new(self.records.clone());
        let items = self.items(order_id).await?;
        for item in &items {
            match ledger.release_locked(guard, item.product_id, item.quantity).await {
                Ok(_) => {}
                Err(DomainError::NotFound { .. }) => {
                    tracing::warn!(product_id = %item.product_id, "restock skipped for deleted product");
                }
                Err(e) => return Err(e),
            }
        }

        self.records
            .delete_where::<OrderItem, _>(|item| item.order_id == order_id)
            .await?;
        let order = self.records.delete::<Order>(order_id).await?;
        Ok(OrderDetails { order, items })
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}
