use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use storefront_auth::IdentityProvider;
use storefront_cart::Cart;
use storefront_core::{Aggregate, AggregateRoot, Clock, ExpectedVersion, OrderId, UserId};
use storefront_infra::OrderStore;
use storefront_orders::{
    Actor, MarkBilled, Order, OrderCommand, OrderDraft, PayerInfo, PlaceOrder, SetStatus,
};

use crate::error::{ShopError, ShopResult};

/// Places orders and drives their status and billing.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            identity,
            clock,
        }
    }

    /// Unknown or absent users produce no actor.
    async fn resolve_actor(&self, user_id: Option<UserId>) -> Option<Actor> {
        let user_id = user_id?;
        let display_name = self.identity.display_name(user_id).await?;
        Some(Actor {
            user_id,
            display_name,
        })
    }

    async fn load(&self, order_id: OrderId) -> ShopResult<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))
    }

    /// Snapshot a paid cart into a new order. The cart itself is left as is.
    #[instrument(skip(self, cart, payer_info), fields(cart_id = %cart.id), err)]
    pub async fn place_from_cart(
        &self,
        cart: &Cart,
        payer_info: PayerInfo,
        initial_status: Option<String>,
        actor: Option<UserId>,
    ) -> ShopResult<Order> {
        let now = self.clock.now();
        let draft = OrderDraft::from_cart(cart, now, payer_info)?;
        let order_id = OrderId::new();

        let mut order = Order::empty(order_id);
        order.execute(&OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            draft,
            initial_status,
            actor: self.resolve_actor(actor).await,
            occurred_at: now,
        }))?;
        self.orders.insert(&order).await?;

        tracing::info!(%order_id, status = order.status(), total = order.totals().gross_total, "order placed");
        Ok(order)
    }

    /// Append a status change. Setting the current status again is a no-op
    /// and writes nothing.
    #[instrument(skip(self), err)]
    pub async fn set_status(
        &self,
        order_id: OrderId,
        status: &str,
        actor: Option<UserId>,
    ) -> ShopResult<Order> {
        let mut order = self.load(order_id).await?;
        let expected = ExpectedVersion::Exact(order.version());
        let events = order.execute(&OrderCommand::SetStatus(SetStatus {
            order_id,
            status: status.to_owned(),
            actor: self.resolve_actor(actor).await,
            occurred_at: self.clock.now(),
        }))?;
        if events.is_empty() {
            return Ok(order);
        }
        self.orders.save(&order, expected).await?;
        tracing::info!(%order_id, status, "order status changed");
        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn mark_billed(
        &self,
        order_id: OrderId,
        billed_by: UserId,
        billed_date: DateTime<Utc>,
    ) -> ShopResult<Order> {
        let mut order = self.load(order_id).await?;
        let expected = ExpectedVersion::Exact(order.version());
        order.execute(&OrderCommand::MarkBilled(MarkBilled {
            order_id,
            billed_by,
            billed_date,
        }))?;
        self.orders.save(&order, expected).await?;
        tracing::info!(%order_id, %billed_by, "order billed");
        Ok(order)
    }

    /// Display name of whoever billed the order, if known.
    pub async fn billed_by_name(&self, order: &Order) -> Option<String> {
        self.identity.display_name(order.billed_by()?).await
    }

    pub async fn get(&self, order_id: OrderId) -> ShopResult<Option<Order>> {
        Ok(self.orders.get(order_id).await?)
    }

    pub async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        Ok(self.orders.list_by_user(user_id).await?)
    }

    pub async fn list_by_status(&self, status: &str) -> ShopResult<Vec<Order>> {
        Ok(self.orders.list_by_status(status).await?)
    }
}
