//! Order placement for the storefront.
//!
//! Checkout turns a session's cart into an order in one all-or-nothing
//! unit:
//! 1. Re-check every cart line against live stock and freeze its price
//! 2. Validate the customer details
//! 3. Snapshot the collections the transaction writes
//! 4. Insert the order, its items and the stock reservations
//! 5. Clear the cart
//!
//! If any write fails, every snapshotted collection is restored and the
//! store looks as if checkout was never attempted.

pub mod coordinator;
pub mod step;

pub use coordinator::{CheckoutCoordinator, TRANSACTION_COLLECTIONS};
pub use step::CheckoutStep;
