//! Cart lifecycle: creation, quantity changes backed by stock reservations,
//! checkout data and expiry.

use std::sync::Arc;

use chrono::Duration;
use tracing::instrument;

use storefront_cart::{Cart, CartItem, OrderInfoUpdate};
use storefront_core::{CartId, Clock, Details, DomainError, ExpectedVersion, UserId};
use storefront_infra::{CartStore, ProductStore, UniqueKey};
use storefront_inventory::{ReservationOutcome, StockReservation};

use crate::error::{ShopError, ShopResult};
use crate::gate::CartGate;
use crate::stock::StockReservationService;

/// Result of [`CartManager::update_item_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemUpdate {
    /// Requested quantity equals the current one; nothing was written.
    Unchanged,
    /// Stock reserved or released and the cart saved.
    Applied { previous: i64, quantity: i64 },
    /// Not enough stock for the increase; neither stock nor cart changed.
    OutOfStock { available: i64 },
}

impl ItemUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, ItemUpdate::Applied { .. })
    }
}

#[derive(Clone)]
pub struct CartManager {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
    stock: StockReservationService,
    gate: Arc<dyn CartGate>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CartManager {
    pub fn new(
        carts: Arc<dyn CartStore>,
        products: Arc<dyn ProductStore>,
        stock: StockReservationService,
        gate: Arc<dyn CartGate>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            carts,
            products,
            stock,
            gate,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn ensure_open(&self) -> ShopResult<()> {
        if self.gate.is_locked().await? {
            tracing::warn!("cart operation rejected: carts are locked");
            return Err(ShopError::CartLocked);
        }
        Ok(())
    }

    /// The user's cart, if one exists.
    pub async fn get(&self, user_id: UserId) -> ShopResult<Option<Cart>> {
        self.ensure_open().await?;
        Ok(self.carts.find_by_user(user_id).await?)
    }

    /// The user's cart, created empty on first use.
    #[instrument(skip(self), err)]
    pub async fn get_or_create(&self, user_id: UserId) -> ShopResult<Cart> {
        self.ensure_open().await?;
        if let Some(cart) = self.carts.find_by_user(user_id).await? {
            return Ok(cart);
        }

        let cart = Cart::new(CartId::new(), user_id, self.clock.now(), self.ttl);
        match self.carts.insert(&cart).await {
            Ok(()) => {
                tracing::info!(cart_id = %cart.id, %user_id, "cart created");
                Ok(cart)
            }
            Err(err) if err.is_duplicate(UniqueKey::CartUser) => {
                // Lost the race; the winner's cart is the user's cart.
                self.carts
                    .find_by_user(user_id)
                    .await?
                    .ok_or_else(|| ShopError::NotFound(format!("cart of user {user_id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Set the quantity held for `sku`, reserving or releasing the
    /// difference. On success `cart` is replaced by the saved state.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id), err)]
    pub async fn update_item_quantity(
        &self,
        cart: &mut Cart,
        sku: &str,
        new_qty: i64,
    ) -> ShopResult<ItemUpdate> {
        self.ensure_open().await?;
        if new_qty < 0 {
            return Err(DomainError::validation("item quantity cannot be negative").into());
        }

        let previous = cart.quantity_of(sku);
        let delta = new_qty - previous;
        if delta == 0 {
            return Ok(ItemUpdate::Unchanged);
        }

        let product = self
            .products
            .find_by_sku(sku)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("sku {sku}")))?;
        let index = product
            .configuration_index(sku)
            .ok_or_else(|| ShopError::NotFound(format!("sku {sku}")))?;
        let item = CartItem::snapshot(&product, index, new_qty)?;

        let reservation = StockReservation::new(product.id, index, delta);
        let mut updated = cart.clone();
        updated.put_item(sku, item)?;

        if delta > 0 {
            // Stock is taken before the cart claims it.
            if let ReservationOutcome::InsufficientStock { available } =
                self.stock.reserve_outcome(reservation).await?
            {
                return Ok(ItemUpdate::OutOfStock { available });
            }
            if let Err(err) = self.save(cart, updated).await {
                tracing::warn!(
                    product_id = %reservation.product_id,
                    amount = reservation.amount,
                    "cart save failed, releasing reserved stock"
                );
                self.adjust_stock(reservation.reversed()).await?;
                return Err(err);
            }
        } else {
            // The cart gives units up before the stock sees them again.
            self.save(cart, updated).await?;
            self.adjust_stock(reservation).await?;
        }

        tracing::info!(sku, previous, quantity = new_qty, "cart item updated");
        Ok(ItemUpdate::Applied {
            previous,
            quantity: new_qty,
        })
    }

    /// Apply a stock movement that must not be refused: a release, or the
    /// undo of a reservation.
    async fn adjust_stock(&self, reservation: StockReservation) -> ShopResult<()> {
        let failed = || ShopError::StockAdjustmentFailed {
            product_id: reservation.product_id,
            amount: reservation.amount,
        };
        match self.stock.reserve_outcome(reservation).await {
            Ok(outcome) if outcome.is_applied() => Ok(()),
            Ok(outcome) => {
                tracing::warn!(
                    product_id = %reservation.product_id,
                    amount = reservation.amount,
                    ?outcome,
                    "stock adjustment was not applied"
                );
                Err(failed())
            }
            Err(err) => {
                tracing::warn!(
                    product_id = %reservation.product_id,
                    amount = reservation.amount,
                    error = %err,
                    "stock adjustment failed"
                );
                Err(failed())
            }
        }
    }

    /// Same as setting the quantity to zero.
    pub async fn remove_item(&self, cart: &mut Cart, sku: &str) -> ShopResult<ItemUpdate> {
        self.update_item_quantity(cart, sku, 0).await
    }

    /// Merge checkout data into the cart and save it.
    #[instrument(skip(self, cart, update), fields(cart_id = %cart.id), err)]
    pub async fn update_order_info(&self, cart: &mut Cart, update: OrderInfoUpdate) -> ShopResult<()> {
        self.ensure_open().await?;
        let mut updated = cart.clone();
        updated.apply_order_info(update)?;
        self.save(cart, updated).await?;
        tracing::info!("order info updated");
        Ok(())
    }

    /// Overwrite the cart's payment record. Not subject to the gate, so an
    /// in-flight payment can complete after carts are locked.
    #[instrument(skip(self, cart, payment), fields(cart_id = %cart.id), err)]
    pub async fn record_payment(&self, cart: &mut Cart, payment: Details) -> ShopResult<()> {
        let mut updated = cart.clone();
        updated.record_payment(payment);
        self.save(cart, updated).await
    }

    async fn save(&self, cart: &mut Cart, mut updated: Cart) -> ShopResult<()> {
        updated.touch(self.clock.now(), self.ttl);
        updated.version = self
            .carts
            .save(&updated, ExpectedVersion::Exact(cart.version))
            .await?;
        *cart = updated;
        Ok(())
    }

    /// Carts past their expiry, for an external reaper.
    pub async fn list_expired_carts(&self) -> ShopResult<Vec<Cart>> {
        Ok(self.carts.list_expired(self.clock.now()).await?)
    }
}
