mod common;

use chrono::Duration;

use common::Harness;
use storefront_catalog::{LocalizedText, NewProduct};
use storefront_core::{Details, DomainError, OrderId, UserId};
use storefront_orders::{CANCELED_STATUS, DEFAULT_INITIAL_STATUS, PayerInfo};
use storefront_shop::ShopError;

async fn product(h: &Harness, sku: &str, price: f64, vat: f64) {
    h.shop
        .catalog()
        .create_product(
            NewProduct::new("item", sku, LocalizedText::new("en", sku))
                .priced(price, vat)
                .stocked(10),
        )
        .await
        .unwrap();
}

async fn paid_cart(h: &Harness, user: UserId) -> storefront_cart::Cart {
    product(h, "A", 100.0, 0.1).await;
    product(h, "B", 50.0, 0.1).await;
    product(h, "C", 30.0, 0.2).await;
    let carts = h.shop.carts();
    let mut cart = carts.get_or_create(user).await.unwrap();
    for sku in ["A", "B", "C"] {
        carts.update_item_quantity(&mut cart, sku, 1).await.unwrap();
    }
    h.shop.pay(&mut cart, "https://shop.test/ok", "https://shop.test/ko", None).await.unwrap();
    cart
}

#[tokio::test]
async fn placing_an_order_snapshots_the_cart() {
    let h = Harness::new().await;
    let buyer = h.register("Ada", "Lovelace");
    let cart = paid_cart(&h, buyer).await;

    let order = h.shop.checkout(&cart, &Details::new(), None, Some(buyer)).await.unwrap();

    assert_eq!(order.user_id(), buyer);
    assert_eq!(order.user(), Some("Ada Lovelace"));
    assert_eq!(order.status(), DEFAULT_INITIAL_STATUS);
    assert_eq!(order.items().len(), 3);
    assert_eq!(order.status_changes().len(), 1);
    assert_eq!(
        order.status_changes()[0].changed_by.as_ref().map(|a| a.display_name.as_str()),
        Some("Ada Lovelace")
    );

    let groups = order.net_per_vat_rate();
    assert_eq!(groups.len(), 2);
    assert!((groups[0].vat - 0.1).abs() < 1e-12);
    assert!((groups[0].net - 150.0).abs() < 1e-9);
    assert!((groups[1].vat - 0.2).abs() < 1e-12);
    assert!((groups[1].net - 30.0).abs() < 1e-9);

    let stored = h.shop.orders().get(order.id_typed()).await.unwrap().unwrap();
    assert_eq!(stored.items(), order.items());
    assert_eq!(h.shop.orders().list_by_user(buyer).await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() {
    let h = Harness::new().await;
    let cart = h.shop.carts().get_or_create(UserId::new()).await.unwrap();
    let result = h
        .shop
        .orders()
        .place_from_cart(&cart, PayerInfo::default(), None, None)
        .await;
    assert!(matches!(result, Err(ShopError::Domain(DomainError::Validation(_)))));
}

#[tokio::test]
async fn status_audit_trail_skips_repeats() {
    let h = Harness::new().await;
    let buyer = h.register("Ada", "Lovelace");
    let clerk = h.register("Grace", "Hopper");
    let cart = paid_cart(&h, buyer).await;
    let orders = h.shop.orders();

    let order = orders
        .place_from_cart(&cart, PayerInfo::default(), Some("paid".into()), Some(buyer))
        .await
        .unwrap();
    let id = order.id_typed();

    h.clock.advance(Duration::minutes(5));
    orders.set_status(id, "shipped", Some(clerk)).await.unwrap();
    orders.set_status(id, "shipped", Some(clerk)).await.unwrap();
    h.clock.advance(Duration::minutes(5));
    let order = orders.set_status(id, CANCELED_STATUS, None).await.unwrap();

    let trail: Vec<&str> = order.status_changes().iter().map(|c| c.status.as_str()).collect();
    assert_eq!(trail, ["paid", "shipped", CANCELED_STATUS]);
    assert!(order
        .status_changes()
        .windows(2)
        .all(|w| w[0].changed_at <= w[1].changed_at));
    assert_eq!(
        order.status_changes()[1].changed_by.as_ref().map(|a| a.user_id),
        Some(clerk)
    );
    assert!(order.status_changes()[2].changed_by.is_none());
    assert_eq!(order.cancellation_date(), Some(order.status_changes()[2].changed_at));

    let stored = orders.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status_changes().len(), 3);
    assert_eq!(orders.list_by_status(CANCELED_STATUS).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_actor_is_recorded_anonymously() {
    let h = Harness::new().await;
    let stranger = UserId::new();
    let cart = paid_cart(&h, stranger).await;

    let order = h
        .shop
        .orders()
        .place_from_cart(&cart, PayerInfo::default(), None, Some(stranger))
        .await
        .unwrap();
    assert_eq!(order.user(), None);
    assert!(order.status_changes()[0].changed_by.is_none());
}

#[tokio::test]
async fn billing_is_one_way() {
    let h = Harness::new().await;
    let buyer = h.register("Ada", "Lovelace");
    let accountant = h.register("Mary", "Somerville");
    let cart = paid_cart(&h, buyer).await;
    let orders = h.shop.orders();
    let order = orders
        .place_from_cart(&cart, PayerInfo::default(), None, None)
        .await
        .unwrap();
    let id = order.id_typed();

    let billed_at = h.now();
    let order = orders.mark_billed(id, accountant, billed_at).await.unwrap();
    assert!(order.is_billed());
    assert_eq!(order.billed_date(), Some(billed_at));
    assert_eq!(orders.billed_by_name(&order).await.as_deref(), Some("Mary Somerville"));

    assert!(matches!(
        orders.mark_billed(id, accountant, billed_at).await,
        Err(ShopError::Domain(DomainError::Conflict(_)))
    ));
    assert!(matches!(
        orders.set_status(OrderId::new(), "shipped", None).await,
        Err(ShopError::NotFound(_))
    ));
}
