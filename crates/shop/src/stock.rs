use std::sync::Arc;

use tracing::instrument;

use storefront_core::ProductId;
use storefront_infra::ProductStore;
use storefront_inventory::{ReservationOutcome, StockReservation};

use crate::error::ShopResult;

/// Conditional stock decrements against the product store.
///
/// Negative amounts give stock back and always succeed. Callers are expected
/// to only release what they previously reserved.
#[derive(Clone)]
pub struct StockReservationService {
    products: Arc<dyn ProductStore>,
}

impl StockReservationService {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// `true` when the stock was taken, `false` when there was not enough.
    pub async fn reserve(
        &self,
        product_id: ProductId,
        configuration_index: usize,
        amount: i64,
    ) -> ShopResult<bool> {
        let outcome = self
            .reserve_outcome(StockReservation::new(product_id, configuration_index, amount))
            .await?;
        Ok(outcome.is_applied())
    }

    #[instrument(skip(self), fields(product_id = %reservation.product_id), err)]
    pub async fn reserve_outcome(
        &self,
        reservation: StockReservation,
    ) -> ShopResult<ReservationOutcome> {
        let outcome = self
            .products
            .apply_if_stock(
                reservation.product_id,
                reservation.configuration_index,
                reservation.amount,
            )
            .await?;
        if let ReservationOutcome::InsufficientStock { available } = outcome {
            tracing::debug!(
                requested = reservation.amount,
                available,
                "insufficient stock"
            );
        }
        Ok(outcome)
    }
}
