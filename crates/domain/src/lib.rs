//! Storefront domain layer.
//!
//! This crate provides the typed records and the rules around them:
//! - Catalog administration (categories, products, default seed data)
//! - Inventory ledger with a non-negative stock invariant
//! - Per-session carts priced at current product prices
//! - Order queries and the order status state machine
//!
//! Every service works over a [`record_store::Records`] handle and takes
//! the store write lock for its read-check-write sequences.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod order;

pub use cart::{CartEntry, CartLine, CartService, CartSnapshot, UnavailableLine};
pub use catalog::{
    CatalogService, Category, CategoryPatch, CategoryWithCount, Product, ProductFilter,
    ProductPatch,
};
pub use error::{DomainError, Result};
pub use inventory::{InventoryLedger, LOW_STOCK_THRESHOLD};
pub use order::{
    CustomerDetails, Order, OrderDetails, OrderItem, OrderService, OrderStatistics, OrderStatus,
};
