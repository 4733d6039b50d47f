//! Wiring of stores and services into one storefront facade.

use std::sync::Arc;

use sqlx::PgPool;

use storefront_auth::IdentityProvider;
use storefront_cart::Cart;
use storefront_core::{Clock, Details, UserId};
use storefront_infra::store::{
    InMemoryCartStore, InMemoryCategoryStore, InMemoryOrderStore, InMemoryProductStore,
    InMemorySettingsStore, PostgresCartStore, PostgresCategoryStore, PostgresOrderStore,
    PostgresProductStore, PostgresSettingsStore,
};
use storefront_infra::{
    CartStore, CategoryStore, OrderStore, ProductStore, SettingsStore, StorefrontConfig,
};
use storefront_orders::Order;

use crate::cart::CartManager;
use crate::catalog::CatalogService;
use crate::error::ShopResult;
use crate::gate::SettingGate;
use crate::orders::OrderService;
use crate::payment::{PaymentExecution, PaymentRegistry};
use crate::stock::StockReservationService;

/// One handle per persisted collection.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            products: InMemoryProductStore::arc(),
            categories: InMemoryCategoryStore::arc(),
            carts: InMemoryCartStore::arc(),
            orders: InMemoryOrderStore::arc(),
            settings: InMemorySettingsStore::arc(),
        }
    }

    /// Postgres-backed stores sharing one pool. The schema must already
    /// exist; see [`storefront_infra::store::run_migrations`].
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            products: Arc::new(PostgresProductStore::new(pool.clone())),
            categories: Arc::new(PostgresCategoryStore::new(pool.clone())),
            carts: Arc::new(PostgresCartStore::new(pool.clone())),
            orders: Arc::new(PostgresOrderStore::new(pool.clone())),
            settings: Arc::new(PostgresSettingsStore::new(pool)),
        }
    }
}

/// Storefront facade: catalog, stock, carts, orders and payments over a
/// shared set of stores.
#[derive(Clone)]
pub struct ShopManager {
    catalog: CatalogService,
    stock: StockReservationService,
    carts: CartManager,
    orders: OrderService,
    payments: PaymentRegistry,
    gate: Arc<SettingGate>,
    clock: Arc<dyn Clock>,
}

impl ShopManager {
    /// Build every service. When `config.cart_locked` is set the persisted
    /// lock is switched on; otherwise the stored flag is left untouched.
    pub async fn new(
        config: &StorefrontConfig,
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> ShopResult<Self> {
        let gate = Arc::new(SettingGate::new(stores.settings.clone()));
        if config.cart_locked {
            gate.set_locked(true).await?;
        }

        let stock = StockReservationService::new(stores.products.clone());
        let carts = CartManager::new(
            stores.carts.clone(),
            stores.products.clone(),
            stock.clone(),
            gate.clone(),
            clock.clone(),
            config.cart_ttl,
        );

        Ok(Self {
            catalog: CatalogService::new(stores.products.clone(), stores.categories.clone()),
            stock,
            carts,
            orders: OrderService::new(stores.orders.clone(), identity, clock.clone()),
            payments: PaymentRegistry::new(),
            gate,
            clock,
        })
    }

    pub fn with_payments(mut self, payments: PaymentRegistry) -> Self {
        self.payments = payments;
        self
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn stock(&self) -> &StockReservationService {
        &self.stock
    }

    pub fn carts(&self) -> &CartManager {
        &self.carts
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn payments(&self) -> &PaymentRegistry {
        &self.payments
    }

    pub fn gate(&self) -> &SettingGate {
        &self.gate
    }

    /// Start a payment and store the backend's record on the cart.
    /// Returns the URL the buyer should be sent to.
    pub async fn pay(
        &self,
        cart: &mut Cart,
        redirection_url: &str,
        cancel_url: &str,
        backend: Option<&str>,
    ) -> ShopResult<String> {
        let backend = self.payments.resolve(backend)?;
        let start = backend
            .pay(cart, redirection_url, cancel_url, self.clock.now())
            .await?;
        self.carts.record_payment(cart, start.record).await?;
        tracing::info!(cart_id = %cart.id, backend = backend.name(), "payment started");
        Ok(start.redirect_url)
    }

    pub async fn confirm(
        &self,
        cart: &Cart,
        redirection_url: &str,
        data: &Details,
        backend: Option<&str>,
    ) -> ShopResult<String> {
        let backend = self.payments.resolve(backend)?;
        Ok(backend.confirm(cart, redirection_url, data).await?)
    }

    pub async fn execute(
        &self,
        cart: &Cart,
        data: &Details,
        backend: Option<&str>,
    ) -> ShopResult<PaymentExecution> {
        let backend = self.payments.resolve(backend)?;
        let execution = backend.execute(cart, data).await?;
        tracing::info!(cart_id = %cart.id, backend = backend.name(), "payment executed");
        Ok(execution)
    }

    /// Execute the payment and place the order with the default status.
    pub async fn checkout(
        &self,
        cart: &Cart,
        data: &Details,
        backend: Option<&str>,
        actor: Option<UserId>,
    ) -> ShopResult<Order> {
        let execution = self.execute(cart, data, backend).await?;
        self.orders
            .place_from_cart(cart, execution.payer_info, None, actor)
            .await
    }
}
