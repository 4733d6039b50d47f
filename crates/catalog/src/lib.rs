//! `storefront-catalog`: products, configurations and categories.
//!
//! Pure domain model; persistence and uniqueness enforcement live in
//! `storefront-infra`.

pub mod category;
pub mod lookup;
pub mod pricing;
pub mod product;
pub mod slug;
pub mod text;

pub use category::Category;
pub use lookup::{Pagination, ProductField, ProductFilter, ProductLookup, ProductSelector, project};
pub use pricing::{MinQuantity, QuantityField, cheapest_configuration};
pub use product::{Configuration, NewConfiguration, NewProduct, Product, ProductStatus};
pub use slug::slugify;
pub use text::LocalizedText;
