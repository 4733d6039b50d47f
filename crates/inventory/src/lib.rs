//! Inventory reservation rules.
//!
//! The conditional decrement ("take `amount` only if at least `amount` is
//! available") lives here so every store backend applies the same rule.
//! Backends are responsible for making it atomic.

pub mod reservation;

pub use reservation::{ReservationOutcome, StockReservation, apply_reservation, reserve_in};
