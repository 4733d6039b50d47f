//! `storefront-shop`: storefront services over the domain crates and stores.
//!
//! [`ShopManager`] is the entry point: it wires the catalog, stock
//! reservation, cart lifecycle, order and payment services over one
//! [`Stores`] set.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod gate;
pub mod manager;
pub mod orders;
pub mod payment;
pub mod stock;

pub use cart::{CartManager, ItemUpdate};
pub use catalog::{CatalogService, ProductListing};
pub use error::{ShopError, ShopResult};
pub use gate::{CartGate, SettingGate, SwitchGate};
pub use manager::{ShopManager, Stores};
pub use orders::OrderService;
pub use payment::{
    NullPayment, PaymentBackend, PaymentError, PaymentExecution, PaymentRegistry, PaymentStart,
};
pub use stock::StockReservationService;
