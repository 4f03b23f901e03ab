//! Per-session shopping carts.

mod model;
mod service;

pub use model::{CartEntry, CartLine, CartLinePatch, CartSnapshot, UnavailableLine};
pub use service::CartService;
