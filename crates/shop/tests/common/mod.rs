#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use storefront_auth::{InMemoryDirectory, UserProfile};
use storefront_catalog::{LocalizedText, NewProduct, Product};
use storefront_core::{Clock, ManualClock, UserId};
use storefront_infra::{ProductStore, StorefrontConfig};
use storefront_shop::{ShopManager, Stores};

pub struct Harness {
    pub shop: ShopManager,
    pub stores: Stores,
    pub clock: Arc<ManualClock>,
    pub directory: Arc<InMemoryDirectory>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 30, 0).unwrap()
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(StorefrontConfig::default()).await
    }

    pub async fn with_config(config: StorefrontConfig) -> Self {
        let stores = Stores::in_memory();
        let clock = Arc::new(ManualClock::new(start_time()));
        let directory = Arc::new(InMemoryDirectory::new());
        let shop = ShopManager::new(&config, stores.clone(), directory.clone(), clock.clone())
            .await
            .unwrap();
        Self {
            shop,
            stores,
            clock,
            directory,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn register(&self, name: &str, surname: &str) -> UserId {
        let id = UserId::new();
        self.directory
            .register(UserProfile::new(id, name, surname).unwrap());
        id
    }

    /// A "mug" product with one configuration.
    pub async fn mug(&self, name: &str, sku: &str, qty: i64) -> Product {
        self.shop
            .catalog()
            .create_product(
                NewProduct::new("mug", sku, LocalizedText::new("en", name))
                    .priced(20.0, 0.1)
                    .stocked(qty),
            )
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, sku: &str) -> i64 {
        let product = self.stores.products.find_by_sku(sku).await.unwrap().unwrap();
        product.configuration(sku).unwrap().qty
    }
}
