//! Value types shared by every storefront crate.

mod money;
mod types;

pub use money::Money;
pub use types::{RecordId, SessionId};
