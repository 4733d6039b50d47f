//! Payment backends.
//!
//! A backend drives the three-step checkout: `pay` starts a payment and
//! hands back where to send the buyer, `confirm` returns the URL that
//! completes the flow, and `execute` settles it and reports the payer.
//! Backends are looked up by name in a [`PaymentRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use storefront_cart::Cart;
use storefront_core::Details;
use storefront_orders::PayerInfo;

use crate::error::{ShopError, ShopResult};

pub const NULL_PAYMENT: &str = "null_payment";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment rejected by {backend}: {reason}")]
    Rejected { backend: String, reason: String },

    #[error("payment backend {backend} is unavailable: {reason}")]
    Unavailable { backend: String, reason: String },
}

/// Outcome of starting a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentStart {
    /// Where the buyer goes next.
    pub redirect_url: String,
    /// Written to the cart's `order_info.payment`.
    pub record: Details,
}

/// Outcome of settling a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentExecution {
    pub result: Details,
    pub payer_info: PayerInfo,
}

#[async_trait::async_trait]
pub trait PaymentBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn pay(
        &self,
        cart: &Cart,
        redirection_url: &str,
        cancel_url: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentStart, PaymentError>;

    async fn confirm(
        &self,
        cart: &Cart,
        redirection_url: &str,
        data: &Details,
    ) -> Result<String, PaymentError>;

    async fn execute(&self, cart: &Cart, data: &Details) -> Result<PaymentExecution, PaymentError>;
}

/// Backend that accepts every payment without talking to anyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPayment;

fn object(value: JsonValue) -> Details {
    match value {
        JsonValue::Object(map) => map,
        _ => Details::new(),
    }
}

#[async_trait::async_trait]
impl PaymentBackend for NullPayment {
    fn name(&self) -> &str {
        NULL_PAYMENT
    }

    async fn pay(
        &self,
        cart: &Cart,
        redirection_url: &str,
        _cancel_url: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentStart, PaymentError> {
        Ok(PaymentStart {
            redirect_url: redirection_url.to_owned(),
            record: object(json!({
                "backend": NULL_PAYMENT,
                "id": cart.id.to_string(),
                "date": now.to_rfc3339(),
            })),
        })
    }

    async fn confirm(
        &self,
        _cart: &Cart,
        redirection_url: &str,
        _data: &Details,
    ) -> Result<String, PaymentError> {
        Ok(redirection_url.to_owned())
    }

    async fn execute(&self, _cart: &Cart, _data: &Details) -> Result<PaymentExecution, PaymentError> {
        Ok(PaymentExecution {
            result: object(json!({ "result": "paid" })),
            payer_info: PayerInfo::default(),
        })
    }
}

/// Named payment backends. Resolving `None` yields the null backend.
#[derive(Clone)]
pub struct PaymentRegistry {
    backends: BTreeMap<String, Arc<dyn PaymentBackend>>,
}

impl Default for PaymentRegistry {
    fn default() -> Self {
        let mut registry = Self {
            backends: BTreeMap::new(),
        };
        registry.register(Arc::new(NullPayment));
        registry
    }
}

impl PaymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a backend under its own name.
    pub fn register(&mut self, backend: Arc<dyn PaymentBackend>) {
        self.backends.insert(backend.name().to_owned(), backend);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: Option<&str>) -> ShopResult<Arc<dyn PaymentBackend>> {
        let name = name.unwrap_or(NULL_PAYMENT);
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| ShopError::UnknownPaymentBackend(name.to_owned()))
    }
}
