//! Checkout coordinator.

use std::time::Instant;

use common::SessionId;
use domain::{
    CartService, CartSnapshot, CustomerDetails, DomainError, InventoryLedger, Order, OrderItem,
    Result,
};
use record_store::{
    Collection, CollectionSnapshot, OperationKind, RecordId, RecordStore, RecordStoreError,
    Records, WriteGuard,
};
use serde_json::json;

use crate::step::CheckoutStep;

/// Collections captured before the first write and restored on failure.
pub const TRANSACTION_COLLECTIONS: [Collection; 4] = [
    Collection::Orders,
    Collection::OrderItems,
    Collection::Products,
    Collection::CartItems,
];

/// Tracks the step a single checkout run is in.
struct CheckoutRun {
    step: CheckoutStep,
    started: Instant,
}

impl CheckoutRun {
    fn start() -> Self {
        Self {
            step: CheckoutStep::NotStarted,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, to: CheckoutStep) {
        debug_assert!(self.step.can_advance_to(to), "{} -> {}", self.step, to);
        tracing::debug!(from = %self.step, step = %to, "checkout step started");
        metrics::counter!("checkout_steps_total", "step" => to.as_str()).increment(1);
        self.step = to;
    }

    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Places orders from session carts.
///
/// The whole of [`place_order`](Self::place_order) runs under the store
/// write lock, so no other cart, inventory or order write interleaves
/// with it in this process.
pub struct CheckoutCoordinator<S> {
    records: Records<S>,
    cart: CartService<S>,
    ledger: InventoryLedger<S>,
}

impl<S: RecordStore> CheckoutCoordinator<S> {
    pub fn new(records: Records<S>) -> Self {
        Self {
            cart: CartService::new(records.clone()),
            ledger: InventoryLedger::new(records.clone()),
            records,
        }
    }

    /// Turns the session's cart into a pending order.
    ///
    /// Returns the new order id. On success the order and one item per
    /// cart line exist with prices frozen, each product's stock is
    /// decremented by its line quantity and the cart is empty. On any
    /// failure none of that has happened.
    ///
    /// Domain errors raised while writing (stock that vanished, a
    /// missing product) are returned as-is after rollback. Storage
    /// failures are returned as [`DomainError::TransactionFailed`]
    /// naming the step that failed.
    #[tracing::instrument(skip(self, session, customer), fields(session = %session))]
    pub async fn place_order(
        &self,
        session: &SessionId,
        customer: CustomerDetails,
    ) -> Result<RecordId> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let mut run = CheckoutRun::start();
        let guard = self.records.write_lock().await;

        run.advance(CheckoutStep::Validating);
        let (cart, customer) = match self.validate(session, customer).await {
            Ok(validated) => validated,
            Err(e) => {
                metrics::counter!("checkout_rejected").increment(1);
                tracing::info!(error = %e, "checkout rejected");
                return Err(e);
            }
        };

        run.advance(CheckoutStep::Snapshotting);
        let snapshot = self
            .records
            .snapshot(&TRANSACTION_COLLECTIONS)
            .await
            .map_err(|e| transaction_failed(CheckoutStep::Snapshotting, e))?;

        match self.apply(&guard, &mut run, session, customer, &cart).await {
            Ok(order_id) => {
                run.advance(CheckoutStep::Committed);
                self.records
                    .log_transaction(
                        OperationKind::TransactionCommit,
                        json!({
                            "order_id": order_id,
                            "session_id": session.as_str(),
                            "total_amount": cart.total_amount,
                            "items": cart.item_count,
                        }),
                    )
                    .await;

                let duration = run.elapsed();
                metrics::histogram!("checkout_duration_seconds").record(duration);
                metrics::counter!("checkout_completed").increment(1);
                tracing::info!(%order_id, total = %cart.total_amount, duration, "order placed");
                Ok(order_id)
            }
            Err(e) => {
                let failed_at = run.step;
                self.roll_back(&mut run, &snapshot, session, &e).await;
                Err(match e {
                    DomainError::Store(source) => transaction_failed(failed_at, source),
                    other => other,
                })
            }
        }
    }

    /// Re-checks the cart against live stock and validates the customer.
    async fn validate(
        &self,
        session: &SessionId,
        customer: CustomerDetails,
    ) -> Result<(CartSnapshot, CustomerDetails)> {
        let lines = self.cart.lines(session).await?;
        if lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let cart = self.cart.snapshot(session).await?;
        if let Some(orphan) = lines
            .iter()
            .find(|line| !cart.lines.iter().any(|e| e.product.id == Some(line.product_id)))
        {
            return Err(DomainError::NotFound {
                entity: "Product",
                id: orphan.product_id,
            });
        }

        for entry in &cart.lines {
            if entry.quantity > entry.product.stock_quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: entry.product.record_id(),
                    product_name: entry.product.name.clone(),
                    requested: entry.quantity,
                    available: entry.product.stock_quantity,
                });
            }
        }

        if !cart.total_amount.is_positive() {
            return Err(DomainError::validation("order total must be positive"));
        }

        let customer = customer.validated()?;
        Ok((cart, customer))
    }

    /// Performs every write of the transaction.
    async fn apply(
        &self,
        guard: &WriteGuard,
        run: &mut CheckoutRun,
        session: &SessionId,
        customer: CustomerDetails,
        cart: &CartSnapshot,
    ) -> Result<RecordId> {
        run.advance(CheckoutStep::InsertingOrder);
        let order = self
            .records
            .insert(Order::pending(customer, cart.total_amount))
            .await?;
        let order_id = order
            .id
            .ok_or(DomainError::Store(RecordStoreError::MissingId(Collection::Orders)))?;

        run.advance(CheckoutStep::ReservingItems);
        for entry in &cart.lines {
            let product_id = entry.product.record_id();
            self.records
                .insert(OrderItem::new(
                    order_id,
                    product_id,
                    entry.product.name.clone(),
                    entry.quantity,
                    entry.product.price,
                ))
                .await?;
            self.ledger
                .reserve_locked(guard, product_id, entry.quantity)
                .await?;
        }

        run.advance(CheckoutStep::ClearingCart);
        self.cart.clear_locked(guard, session).await?;
        Ok(order_id)
    }

    async fn roll_back(
        &self,
        run: &mut CheckoutRun,
        snapshot: &CollectionSnapshot,
        session: &SessionId,
        error: &DomainError,
    ) {
        let failed_at = run.step;
        run.advance(CheckoutStep::RollingBack);

        let restored = self.records.restore(snapshot).await;
        if let Err(e) = &restored {
            tracing::error!(error = %e, step = %failed_at, "checkout rollback left the store partially restored");
        }
        run.advance(CheckoutStep::RolledBack);

        self.records
            .log_transaction(
                OperationKind::TransactionRollback,
                json!({
                    "session_id": session.as_str(),
                    "step": failed_at.as_str(),
                    "error": error.to_string(),
                    "restored": restored.is_ok(),
                }),
            )
            .await;

        metrics::counter!("checkout_rolled_back", "step" => failed_at.as_str()).increment(1);
        tracing::warn!(step = %failed_at, error = %error, "checkout rolled back");
    }
}

fn transaction_failed(step: CheckoutStep, source: RecordStoreError) -> DomainError {
    DomainError::TransactionFailed {
        step: step.as_str().to_string(),
        reason: source.to_string(),
    }
}
