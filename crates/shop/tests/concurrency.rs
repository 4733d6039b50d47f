mod common;

use std::sync::Arc;

use common::Harness;
use storefront_core::UserId;
use storefront_shop::ItemUpdate;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let h = Harness::new().await;
    let mug = h.mug("Blue Mug", "MUG-B", 50).await;
    let stock = Arc::new(h.shop.stock().clone());

    let mut tasks = Vec::new();
    for i in 0..40 {
        let stock = stock.clone();
        let amount = 1 + (i % 3);
        tasks.push(tokio::spawn(async move {
            if stock.reserve(mug.id, 0, amount).await.unwrap() {
                amount
            } else {
                0
            }
        }));
    }

    let mut applied = 0;
    for task in tasks {
        applied += task.await.unwrap();
    }

    assert!(applied <= 50);
    assert_eq!(h.stock_of("MUG-B").await, 50 - applied);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_carts_share_limited_stock() {
    let h = Arc::new(Harness::new().await);
    h.mug("Last Mugs", "MUG-L", 5).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            let carts = h.shop.carts();
            let mut cart = carts.get_or_create(UserId::new()).await.unwrap();
            match carts.update_item_quantity(&mut cart, "MUG-L", 2).await.unwrap() {
                ItemUpdate::Applied { quantity, .. } => quantity,
                _ => 0,
            }
        }));
    }

    let mut held = 0;
    for task in tasks {
        held += task.await.unwrap();
    }

    assert_eq!(held, 4);
    assert_eq!(h.stock_of("MUG-L").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_get_or_create_yields_one_cart() {
    let h = Arc::new(Harness::new().await);
    let user = UserId::new();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.shop.carts().get_or_create(user).await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}
