use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::{LocalizedText, Product};
use storefront_core::{AggregateRoot, CartId, Details, DomainError, DomainResult, ProductId, UserId};

use crate::order_info::{OrderInfo, OrderInfoUpdate};

/// Snapshot of a configuration as it was when the quantity last changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub configuration_index: usize,
    pub name: LocalizedText,
    pub variety: LocalizedText,
    pub qty: i64,
    pub price: f64,
    pub vat: f64,
    #[serde(default)]
    pub details: Details,
}

impl CartItem {
    pub fn snapshot(product: &Product, configuration_index: usize, qty: i64) -> DomainResult<Self> {
        let configuration = product.configurations.get(configuration_index).ok_or_else(|| {
            DomainError::not_found(format!(
                "configuration {configuration_index} of product {}",
                product.id
            ))
        })?;
        Ok(Self {
            product_id: product.id,
            configuration_index,
            name: product.name.clone(),
            variety: configuration.variety.clone(),
            qty,
            price: configuration.price,
            vat: configuration.vat,
            details: configuration.details.clone(),
        })
    }
}

/// Aggregate root: one user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: BTreeMap<String, CartItem>,
    pub order_info: OrderInfo,
    pub expires_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Bumped by the store on every successful save.
    pub version: u64,
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Saturates at the latest representable instant.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Cart {
    pub fn new(id: CartId, user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id,
            user_id,
            items: BTreeMap::new(),
            order_info: OrderInfo::default(),
            expires_at: expiry(now, ttl),
            last_update: now,
            version: 0,
        }
    }

    /// Slide the expiry window forward from `now`.
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.last_update = now;
        self.expires_at = expiry(now, ttl);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity currently held for `sku`; 0 when absent.
    pub fn quantity_of(&self, sku: &str) -> i64 {
        self.items.get(sku).map_or(0, |item| item.qty)
    }

    /// Store `item` under `sku`, or drop the entry when its qty is 0.
    pub fn put_item(&mut self, sku: impl Into<String>, item: CartItem) -> DomainResult<()> {
        let sku = sku.into();
        if item.qty < 0 {
            return Err(DomainError::validation("item quantity cannot be negative"));
        }
        if item.qty == 0 {
            self.items.remove(&sku);
        } else {
            self.items.insert(sku, item);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, sku: &str) -> Option<CartItem> {
        self.items.remove(sku)
    }

    pub fn apply_order_info(&mut self, update: OrderInfoUpdate) -> DomainResult<()> {
        self.order_info.apply(update)
    }

    /// Overwrite the payment record; used by payment backends.
    pub fn record_payment(&mut self, payment: Details) {
        self.order_info.payment = payment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storefront_catalog::{NewConfiguration, NewProduct};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn test_cart() -> Cart {
        Cart::new(CartId::new(), UserId::new(), test_time(), Duration::minutes(30))
    }

    fn test_product() -> Product {
        let mut product = Product::create(
            ProductId::new(),
            NewProduct::new("tshirt", "TS-S", LocalizedText::new("en", "T-Shirt"))
                .priced(20.0, 0.1)
                .stocked(10),
        )
        .unwrap();
        product
            .push_configuration(
                NewConfiguration::new("TS-M")
                    .priced(22.0, 0.1)
                    .stocked(4)
                    .variety(LocalizedText::new("en", "M")),
            )
            .unwrap();
        product
    }

    #[test]
    fn new_cart_expires_after_ttl() {
        let cart = test_cart();
        assert_eq!(cart.expires_at, test_time() + Duration::minutes(30));
        assert!(!cart.is_expired(test_time()));
        assert!(cart.is_expired(test_time() + Duration::minutes(30)));
    }

    #[test]
    fn touch_slides_expiry() {
        let mut cart = test_cart();
        let later = test_time() + Duration::minutes(20);
        cart.touch(later, Duration::minutes(30));
        assert_eq!(cart.last_update, later);
        assert_eq!(cart.expires_at, later + Duration::minutes(30));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let mut cart = test_cart();
        cart.touch(test_time(), Duration::MAX);
        assert_eq!(cart.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!cart.is_expired(test_time()));
    }

    #[test]
    fn snapshot_copies_configuration_fields() {
        let product = test_product();
        let item = CartItem::snapshot(&product, 1, 2).unwrap();
        assert_eq!(item.product_id, product.id);
        assert_eq!(item.configuration_index, 1);
        assert_eq!(item.variety.default_text(), "M");
        assert_eq!(item.price, 22.0);
        assert_eq!(item.qty, 2);

        assert!(CartItem::snapshot(&product, 9, 1).is_err());
    }

    #[test]
    fn zero_quantity_removes_the_entry() {
        let product = test_product();
        let mut cart = test_cart();

        cart.put_item("TS-S", CartItem::snapshot(&product, 0, 3).unwrap()).unwrap();
        assert_eq!(cart.quantity_of("TS-S"), 3);

        cart.put_item("TS-S", CartItem::snapshot(&product, 0, 0).unwrap()).unwrap();
        assert_eq!(cart.quantity_of("TS-S"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn negative_item_quantity_is_rejected() {
        let product = test_product();
        let mut cart = test_cart();
        let mut item = CartItem::snapshot(&product, 0, 1).unwrap();
        item.qty = -1;
        assert!(cart.put_item("TS-S", item).is_err());
    }
}
