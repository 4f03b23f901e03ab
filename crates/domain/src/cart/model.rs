use chrono::{DateTime, Utc};
use common::{Money, SessionId};
use record_store::{Collection, Record, RecordId};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// One (session, product, quantity) line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub session_id: SessionId,
    pub product_id: RecordId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(session_id: SessionId, product_id: RecordId, quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            session_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn belongs_to(&self, session: &SessionId) -> bool {
        &self.session_id == session
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CartLinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl Record for CartLine {
    const COLLECTION: Collection = Collection::CartItems;
    type Patch = CartLinePatch;

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

/// A cart line joined with its current product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEntry {
    pub line_id: Option<RecordId>,
    pub product: Product,
    pub quantity: u32,
    /// Current price × quantity.
    pub subtotal: Money,
}

/// The priced contents of one session's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub session_id: SessionId,
    pub lines: Vec<CartEntry>,
    /// Number of distinct lines.
    pub item_count: usize,
    /// Sum of quantities.
    pub total_quantity: u32,
    pub total_amount: Money,
}

impl CartSnapshot {
    /// Totals the entries, or `None` if a total overflows.
    pub fn from_entries(session_id: SessionId, lines: Vec<CartEntry>) -> Option<Self> {
        let mut total_quantity = 0u32;
        let mut total_amount = Money::zero();
        for line in &lines {
            total_quantity = total_quantity.checked_add(line.quantity)?;
            total_amount = total_amount.checked_add(line.subtotal)?;
        }
        Some(Self {
            session_id,
            item_count: lines.len(),
            total_quantity,
            total_amount,
            lines,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A cart line asking for more than is in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableLine {
    pub product_id: RecordId,
    pub product_name: String,
    pub requested: u32,
    pub available: u32,
}
