//! Persistence boundary for the storefront.
//!
//! Each trait is the minimal contract a backend must honour: lookups by id or
//! unique field, the unique constraints themselves, and for products the one
//! conditional update (`apply_if_stock`) that stock reservation relies on.
//! `InMemory*` backends serve tests and development; `Postgres*` backends are
//! the production implementation.

mod error;
pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use storefront_cart::Cart;
use storefront_catalog::{Category, Configuration, Pagination, Product, ProductFilter, ProductStatus};
use storefront_core::{CartId, CategoryId, ExpectedVersion, OrderId, ProductId, UserId};
use storefront_inventory::ReservationOutcome;
use storefront_orders::Order;

pub use error::{StoreError, UniqueKey};
pub use in_memory::{
    InMemoryCartStore, InMemoryCategoryStore, InMemoryOrderStore, InMemoryProductStore,
    InMemorySettingsStore,
};
pub use postgres::{
    PostgresCartStore, PostgresCategoryStore, PostgresOrderStore, PostgresProductStore,
    PostgresSettingsStore, run_migrations,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a new product. Fails with `Duplicate` on id, slug or any SKU.
    async fn insert(&self, product: &Product) -> StoreResult<()>;

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Product>>;

    /// One page of products matching `filter`, in creation order.
    async fn list(&self, filter: &ProductFilter, page: Pagination) -> StoreResult<Vec<Product>>;

    /// Append a configuration and return its index. Fails with `Duplicate`
    /// when the SKU exists on any product.
    async fn push_configuration(
        &self,
        product_id: ProductId,
        configuration: &Configuration,
    ) -> StoreResult<usize>;

    async fn set_status(&self, product_id: ProductId, status: ProductStatus) -> StoreResult<()>;

    /// Atomically take `amount` from the configuration's stock if at least
    /// that much is available. Negative amounts always apply.
    async fn apply_if_stock(
        &self,
        product_id: ProductId,
        configuration_index: usize,
        amount: i64,
    ) -> StoreResult<ReservationOutcome>;

    async fn any_in_category(&self, category_id: CategoryId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, category: &Category) -> StoreResult<()>;
    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn list(&self) -> StoreResult<Vec<Category>>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: CategoryId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait CartStore: Send + Sync {
    /// Insert a new cart. Fails with `Duplicate(CartUser)` when the user
    /// already owns one.
    async fn insert(&self, cart: &Cart) -> StoreResult<()>;

    async fn get(&self, id: CartId) -> StoreResult<Option<Cart>>;

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>>;

    /// Overwrite a cart if its stored version matches `expected`. Returns the
    /// new version.
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> StoreResult<u64>;

    /// Carts whose `expires_at` is at or before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Cart>>;
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> StoreResult<()>;

    async fn get(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Overwrite an order if its stored version matches `expected`.
    async fn save(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()>;

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    async fn list_by_status(&self, status: &str) -> StoreResult<Vec<Order>>;
}

/// Small key/value store for runtime switches such as the cart lock.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<JsonValue>>;
    async fn put(&self, key: &str, value: JsonValue) -> StoreResult<()>;
}

#[async_trait::async_trait]
impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        (**self).insert(product).await
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).get(id).await
    }

    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        (**self).find_by_sku(sku).await
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        (**self).find_by_slug(slug).await
    }

    async fn list(&self, filter: &ProductFilter, page: Pagination) -> StoreResult<Vec<Product>> {
        (**self).list(filter, page).await
    }

    async fn push_configuration(
        &self,
        product_id: ProductId,
        configuration: &Configuration,
    ) -> StoreResult<usize> {
        (**self).push_configuration(product_id, configuration).await
    }

    async fn set_status(&self, product_id: ProductId, status: ProductStatus) -> StoreResult<()> {
        (**self).set_status(product_id, status).await
    }

    async fn apply_if_stock(
        &self,
        product_id: ProductId,
        configuration_index: usize,
        amount: i64,
    ) -> StoreResult<ReservationOutcome> {
        (**self)
            .apply_if_stock(product_id, configuration_index, amount)
            .await
    }

    async fn any_in_category(&self, category_id: CategoryId) -> StoreResult<bool> {
        (**self).any_in_category(category_id).await
    }
}

#[async_trait::async_trait]
impl<S> CategoryStore for Arc<S>
where
    S: CategoryStore + ?Sized,
{
    async fn insert(&self, category: &Category) -> StoreResult<()> {
        (**self).insert(category).await
    }

    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        (**self).get(id).await
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        (**self).list().await
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<bool> {
        (**self).delete(id).await
    }
}

#[async_trait::async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn insert(&self, cart: &Cart) -> StoreResult<()> {
        (**self).insert(cart).await
    }

    async fn get(&self, id: CartId) -> StoreResult<Option<Cart>> {
        (**self).get(id).await
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        (**self).find_by_user(user_id).await
    }

    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> StoreResult<u64> {
        (**self).save(cart, expected).await
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Cart>> {
        (**self).list_expired(now).await
    }
}

#[async_trait::async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        (**self).insert(order).await
    }

    async fn get(&self, id: OrderId) -> StoreResult<Option<Order>> {
        (**self).get(id).await
    }

    async fn save(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        (**self).save(order, expected).await
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        (**self).list_by_user(user_id).await
    }

    async fn list_by_status(&self, status: &str) -> StoreResult<Vec<Order>> {
        (**self).list_by_status(status).await
    }
}

#[async_trait::async_trait]
impl<S> SettingsStore for Arc<S>
where
    S: SettingsStore + ?Sized,
{
    async fn get(&self, key: &str) -> StoreResult<Option<JsonValue>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: JsonValue) -> StoreResult<()> {
        (**self).put(key, value).await
    }
}
