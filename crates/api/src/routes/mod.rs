//! HTTP route handlers.

pub mod cart;
pub mod categories;
pub mod database;
pub mod orders;
pub mod products;
pub mod system;
