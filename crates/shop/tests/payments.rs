mod common;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use common::Harness;
use storefront_cart::Cart;
use storefront_core::{Details, UserId};
use storefront_shop::{
    PaymentBackend, PaymentError, PaymentExecution, PaymentRegistry, PaymentStart, ShopError,
};

/// Backend that declines every payment.
struct Declining;

#[async_trait::async_trait]
impl PaymentBackend for Declining {
    fn name(&self) -> &str {
        "declining"
    }

    async fn pay(
        &self,
        _cart: &Cart,
        _redirection_url: &str,
        cancel_url: &str,
        _now: DateTime<Utc>,
    ) -> Result<PaymentStart, PaymentError> {
        Err(PaymentError::Rejected {
            backend: self.name().to_owned(),
            reason: format!("card declined, go to {cancel_url}"),
        })
    }

    async fn confirm(
        &self,
        _cart: &Cart,
        _redirection_url: &str,
        _data: &Details,
    ) -> Result<String, PaymentError> {
        Err(PaymentError::Unavailable {
            backend: self.name().to_owned(),
            reason: "offline".into(),
        })
    }

    async fn execute(&self, _cart: &Cart, _data: &Details) -> Result<PaymentExecution, PaymentError> {
        Err(PaymentError::Unavailable {
            backend: self.name().to_owned(),
            reason: "offline".into(),
        })
    }
}

#[tokio::test]
async fn default_backend_records_the_payment_on_the_cart() {
    let h = Harness::new().await;
    let user = UserId::new();
    let mut cart = h.shop.carts().get_or_create(user).await.unwrap();

    let url = h
        .shop
        .pay(&mut cart, "https://shop.test/ok", "https://shop.test/ko", None)
        .await
        .unwrap();
    assert_eq!(url, "https://shop.test/ok");
    assert_eq!(cart.order_info.payment["backend"], json!("null_payment"));
    assert_eq!(cart.order_info.payment["id"], json!(cart.id.to_string()));

    let stored = h.shop.carts().get(user).await.unwrap().unwrap();
    assert_eq!(stored.order_info.payment, cart.order_info.payment);

    let confirmed = h
        .shop
        .confirm(&cart, "https://shop.test/done", &Details::new(), None)
        .await
        .unwrap();
    assert_eq!(confirmed, "https://shop.test/done");

    let execution = h.shop.execute(&cart, &Details::new(), None).await.unwrap();
    assert_eq!(execution.result["result"], json!("paid"));
}

#[tokio::test]
async fn unknown_backend_is_rejected() {
    let h = Harness::new().await;
    let mut cart = h.shop.carts().get_or_create(UserId::new()).await.unwrap();
    assert!(matches!(
        h.shop.pay(&mut cart, "ok", "ko", Some("paypal")).await,
        Err(ShopError::UnknownPaymentBackend(name)) if name == "paypal"
    ));
}

#[tokio::test]
async fn backend_failures_leave_the_cart_alone() {
    let h = Harness::new().await;
    let mut payments = PaymentRegistry::new();
    payments.register(Arc::new(Declining));
    let shop = h.shop.clone().with_payments(payments);

    let user = UserId::new();
    let mut cart = shop.carts().get_or_create(user).await.unwrap();
    let before = cart.clone();

    assert!(matches!(
        shop.pay(&mut cart, "ok", "ko", Some("declining")).await,
        Err(ShopError::Payment(PaymentError::Rejected { .. }))
    ));
    assert_eq!(cart, before);
    assert!(shop.pay(&mut cart, "ok", "ko", None).await.is_ok());
}
