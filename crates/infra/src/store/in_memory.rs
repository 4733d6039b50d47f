//! In-memory stores for tests and development.
//!
//! Every check-then-write happens under a single write lock, which is what
//! makes `apply_if_stock` and the unique constraints atomic here.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use storefront_cart::Cart;
use storefront_catalog::{Category, Configuration, Pagination, Product, ProductFilter, ProductStatus};
use storefront_core::{AggregateRoot, CartId, CategoryId, ExpectedVersion, OrderId, ProductId, UserId};
use storefront_inventory::{ReservationOutcome, reserve_in};
use storefront_orders::Order;

use super::{
    CartStore, CategoryStore, OrderStore, ProductStore, SettingsStore, StoreError, StoreResult,
    UniqueKey,
};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
}

#[derive(Debug, Default)]
struct ProductTables {
    products: HashMap<ProductId, Product>,
    /// Insertion order, for stable listing pages.
    sequence: Vec<ProductId>,
    slugs: HashMap<String, ProductId>,
    skus: HashMap<String, ProductId>,
}

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    inner: RwLock<ProductTables>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::duplicate(UniqueKey::Id, product.id.to_string()));
        }
        if tables.slugs.contains_key(&product.slug) {
            return Err(StoreError::duplicate(UniqueKey::Slug, product.slug.clone()));
        }
        let mut seen = Vec::with_capacity(product.configurations.len());
        for sku in product.skus() {
            if tables.skus.contains_key(sku) || seen.contains(&sku) {
                return Err(StoreError::duplicate(UniqueKey::Sku, sku));
            }
            seen.push(sku);
        }

        tables.slugs.insert(product.slug.clone(), product.id);
        for sku in seen {
            tables.skus.insert(sku.to_owned(), product.id);
        }
        tables.sequence.push(product.id);
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(read(&self.inner)?.products.get(&id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let tables = read(&self.inner)?;
        Ok(tables
            .skus
            .get(sku)
            .and_then(|id| tables.products.get(id))
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let tables = read(&self.inner)?;
        Ok(tables
            .slugs
            .get(slug)
            .and_then(|id| tables.products.get(id))
            .cloned())
    }

    async fn list(&self, filter: &ProductFilter, page: Pagination) -> StoreResult<Vec<Product>> {
        let tables = read(&self.inner)?;
        Ok(tables
            .sequence
            .iter()
            .filter_map(|id| tables.products.get(id))
            .filter(|p| filter.matches(p))
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn push_configuration(
        &self,
        product_id: ProductId,
        configuration: &Configuration,
    ) -> StoreResult<usize> {
        let mut tables = write(&self.inner)?;
        if tables.skus.contains_key(&configuration.sku) {
            return Err(StoreError::duplicate(UniqueKey::Sku, configuration.sku.clone()));
        }
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(format!("product {product_id}")))?;
        product.configurations.push(configuration.clone());
        let index = product.configurations.len() - 1;
        tables.skus.insert(configuration.sku.clone(), product_id);
        Ok(index)
    }

    async fn set_status(&self, product_id: ProductId, status: ProductStatus) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(format!("product {product_id}")))?;
        product.status = status;
        Ok(())
    }

    async fn apply_if_stock(
        &self,
        product_id: ProductId,
        configuration_index: usize,
        amount: i64,
    ) -> StoreResult<ReservationOutcome> {
        let mut tables = write(&self.inner)?;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found(format!("product {product_id}")))?;
        reserve_in(product, configuration_index, amount)
            .map_err(|err| StoreError::NotFound(err.to_string()))
    }

    async fn any_in_category(&self, category_id: CategoryId) -> StoreResult<bool> {
        Ok(read(&self.inner)?
            .products
            .values()
            .any(|p| p.category_id == Some(category_id)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCategoryStore {
    inner: RwLock<BTreeMap<CategoryId, Category>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait::async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn insert(&self, category: &Category) -> StoreResult<()> {
        let mut map = write(&self.inner)?;
        if map.contains_key(&category.id) {
            return Err(StoreError::duplicate(UniqueKey::Id, category.id.to_string()));
        }
        map.insert(category.id, category.clone());
        Ok(())
    }

    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        Ok(read(&self.inner)?.values().cloned().collect())
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<bool> {
        Ok(write(&self.inner)?.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
struct CartTables {
    carts: HashMap<CartId, Cart>,
    by_user: HashMap<UserId, CartId>,
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    inner: RwLock<CartTables>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait::async_trait]
impl CartStore for InMemoryCartStore {
    async fn insert(&self, cart: &Cart) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        if tables.carts.contains_key(&cart.id) {
            return Err(StoreError::duplicate(UniqueKey::Id, cart.id.to_string()));
        }
        if tables.by_user.contains_key(&cart.user_id) {
            return Err(StoreError::duplicate(UniqueKey::CartUser, cart.user_id.to_string()));
        }
        tables.by_user.insert(cart.user_id, cart.id);
        tables.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn get(&self, id: CartId) -> StoreResult<Option<Cart>> {
        Ok(read(&self.inner)?.carts.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        let tables = read(&self.inner)?;
        Ok(tables
            .by_user
            .get(&user_id)
            .and_then(|id| tables.carts.get(id))
            .cloned())
    }

    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> StoreResult<u64> {
        let mut tables = write(&self.inner)?;
        let stored = tables
            .carts
            .get_mut(&cart.id)
            .ok_or_else(|| StoreError::not_found(format!("cart {}", cart.id)))?;
        if !expected.matches(stored.version) {
            return Err(StoreError::VersionConflict(format!(
                "cart {} (expected: {expected:?}, actual: {})",
                cart.id, stored.version
            )));
        }
        let version = stored.version + 1;
        *stored = Cart {
            version,
            user_id: stored.user_id,
            ..cart.clone()
        };
        Ok(version)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Cart>> {
        let tables = read(&self.inner)?;
        let mut expired: Vec<Cart> = tables
            .carts
            .values()
            .filter(|c| c.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by_key(|c| c.expires_at);
        Ok(expired)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<BTreeMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn select(&self, pred: impl Fn(&Order) -> bool) -> StoreResult<Vec<Order>> {
        Ok(read(&self.inner)?
            .values()
            .filter(|o| pred(o))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        let mut map = write(&self.inner)?;
        let id = order.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::duplicate(UniqueKey::Id, id.to_string()));
        }
        map.insert(id, order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn save(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        let mut map = write(&self.inner)?;
        let id = order.id_typed();
        let stored = map
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("order {id}")))?;
        if !expected.matches(stored.version()) {
            return Err(StoreError::VersionConflict(format!(
                "order {id} (expected: {expected:?}, actual: {})",
                stored.version()
            )));
        }
        *stored = order.clone();
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        self.select(|o| o.user_id() == user_id)
    }

    async fn list_by_status(&self, status: &str) -> StoreResult<Vec<Order>> {
        self.select(|o| o.status() == status)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<HashMap<String, JsonValue>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait::async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: &str) -> StoreResult<Option<JsonValue>> {
        Ok(read(&self.inner)?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: JsonValue) -> StoreResult<()> {
        write(&self.inner)?.insert(key.to_owned(), value);
        Ok(())
    }
}
