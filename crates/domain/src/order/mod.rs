//! Orders, order items and the status state machine.

mod model;
mod service;
mod status;

pub use model::{
    CustomerDetails, Order, OrderDetails, OrderItem, OrderItemPatch, OrderPatch, OrderStatistics,
    normalize_phone,
};
pub use service::OrderService;
pub use status::OrderStatus;
