//! `storefront-cart`: shopping cart model and cart pricing.
//!
//! A cart is one user's in-progress purchase: a SKU-keyed map of item
//! snapshots plus the order info collected at checkout. Stock accounting is
//! not done here; the cart only records what was already reserved.

pub mod cart;
pub mod order_info;
pub mod pricing;

pub use cart::{Cart, CartItem};
pub use order_info::{
    BillInfo, BillInfoUpdate, OrderInfo, OrderInfoUpdate, ShipmentInfo, ShipmentInfoUpdate,
};
pub use pricing::{CartTotals, PricedLine, totals_of};
