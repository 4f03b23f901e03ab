//! Checkout step state machine.

use serde::{Deserialize, Serialize};

/// The step a checkout run is in.
///
/// Step transitions:
/// ```text
/// NotStarted ──► Validating ──► Snapshotting ──► InsertingOrder ──► ReservingItems ──► ClearingCart ──► Committed
///                                                      │                  │                  │
///                                                      └──────────────────┴──────────────────┴──► RollingBack ──► RolledBack
/// ```
///
/// A run that fails during `Validating` or `Snapshotting` has written
/// nothing and simply stops there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    NotStarted,

    /// Re-checking stock, freezing prices and validating the customer.
    Validating,

    /// Capturing the collections the transaction will write.
    Snapshotting,

    /// Inserting the pending order row.
    InsertingOrder,

    /// Inserting order items and decrementing stock.
    ReservingItems,

    /// Removing the session's cart lines.
    ClearingCart,

    /// Every write succeeded (terminal state).
    Committed,

    /// A write failed and the snapshot is being restored.
    RollingBack,

    /// The snapshot was restored after a failure (terminal state).
    RolledBack,
}

impl CheckoutStep {
    /// The step that follows this one when nothing fails.
    pub fn next(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::NotStarted => Some(CheckoutStep::Validating),
            CheckoutStep::Validating => Some(CheckoutStep::Snapshotting),
            CheckoutStep::Snapshotting => Some(CheckoutStep::InsertingOrder),
            CheckoutStep::InsertingOrder => Some(CheckoutStep::ReservingItems),
            CheckoutStep::ReservingItems => Some(CheckoutStep::ClearingCart),
            CheckoutStep::ClearingCart => Some(CheckoutStep::Committed),
            CheckoutStep::RollingBack => Some(CheckoutStep::RolledBack),
            CheckoutStep::Committed | CheckoutStep::RolledBack => None,
        }
    }

    /// Returns true while the run is writing to the store.
    pub fn is_writing(&self) -> bool {
        matches!(
            self,
            CheckoutStep::InsertingOrder | CheckoutStep::ReservingItems | CheckoutStep::ClearingCart
        )
    }

    /// Returns true if a failure in this step must be rolled back.
    pub fn can_roll_back(&self) -> bool {
        self.is_writing()
    }

    /// Returns true if the run may move from this step to `to`.
    pub fn can_advance_to(&self, to: CheckoutStep) -> bool {
        self.next() == Some(to) || (to == CheckoutStep::RollingBack && self.can_roll_back())
    }

    /// Returns true if this is a terminal step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStep::Committed | CheckoutStep::RolledBack)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::NotStarted => "not_started",
            CheckoutStep::Validating => "validating",
            CheckoutStep::Snapshotting => "snapshotting",
            CheckoutStep::InsertingOrder => "inserting_order",
            CheckoutStep::ReservingItems => "reserving_items",
            CheckoutStep::ClearingCart => "clearing_cart",
            CheckoutStep::Committed => "committed",
            CheckoutStep::RollingBack => "rolling_back",
            CheckoutStep::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
