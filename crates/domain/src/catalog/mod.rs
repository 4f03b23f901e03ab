//! Categories, products and catalog administration.

mod model;
pub mod seed;
mod service;

pub use model::{Category, CategoryPatch, CategoryWithCount, Product, ProductFilter, ProductPatch};
pub use service::CatalogService;
