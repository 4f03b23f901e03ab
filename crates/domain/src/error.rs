//! Domain error types.

use record_store::{Collection, RecordId, RecordStoreError};
use thiserror::Error;
use validator::ValidationErrors;

use crate::order::OrderStatus;

/// Errors that can occur during storefront operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: RecordId },

    /// Customer data or entity fields are malformed.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The requested quantity exceeds what is in stock.
    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: RecordId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// Checkout was attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order status change is not allowed.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A commit step failed and the transaction was rolled back.
    #[error("Transaction failed at {step}: {reason}")]
    TransactionFailed { step: String, reason: String },

    /// The operation conflicts with existing references or names.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The record store failed.
    #[error("Store error: {0}")]
    Store(RecordStoreError),
}

impl DomainError {
    /// Creates a validation error with a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(vec![message.into()])
    }
}

/// Human-readable entity name for a collection.
pub fn entity_name(collection: Collection) -> &'static str {
    match collection {
        Collection::Categories => "Category",
        Collection::Products => "Product",
        Collection::Orders => "Order",
        Collection::OrderItems => "Order item",
        Collection::CartItems => "Cart line",
        Collection::OperationLogs => "Log entry",
    }
}

impl From<RecordStoreError> for DomainError {
    fn from(e: RecordStoreError) -> Self {
        match e {
            RecordStoreError::NotFound { collection, id } => DomainError::NotFound {
                entity: entity_name(collection),
                id,
            },
            other => DomainError::Store(other),
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid ({})", e.code),
                })
            })
            .collect();
        messages.sort();
        DomainError::Validation(messages)
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
