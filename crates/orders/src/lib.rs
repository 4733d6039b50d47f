//! Order domain module.
//!
//! An order is an immutable purchase snapshot taken from a cart, plus two
//! pieces of mutable state: a free-form status with an append-only audit
//! trail, and a one-way billing flag.

pub mod draft;
pub mod item;
pub mod order;

pub use draft::{OrderDraft, PayerInfo};
pub use item::{OrderItem, OrderTotals, VatGroup, net_per_vat_rate};
pub use order::{
    Actor, CANCELED_STATUS, DEFAULT_INITIAL_STATUS, MarkBilled, Order, OrderBilled,
    OrderCommand, OrderEvent, OrderPlaced, PlaceOrder, SetStatus, StatusChange, StatusChanged,
};
