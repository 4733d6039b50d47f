use serde::{Deserialize, Serialize};

use storefront_catalog::Product;
use storefront_core::{DomainError, DomainResult, ProductId};

/// Request to take `amount` units of one configuration's stock.
///
/// A negative amount returns stock and always succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub configuration_index: usize,
    pub amount: i64,
}

impl StockReservation {
    pub fn new(product_id: ProductId, configuration_index: usize, amount: i64) -> Self {
        Self {
            product_id,
            configuration_index,
            amount,
        }
    }

    /// The reservation that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            amount: -self.amount,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReservationOutcome {
    Applied { remaining: i64 },
    InsufficientStock { available: i64 },
}

impl ReservationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReservationOutcome::Applied { .. })
    }
}

/// Decrement `qty` by `amount` when `qty >= amount`; otherwise leave it alone.
pub fn apply_reservation(qty: &mut i64, amount: i64) -> ReservationOutcome {
    if *qty < amount {
        return ReservationOutcome::InsufficientStock { available: *qty };
    }
    match qty.checked_sub(amount) {
        Some(remaining) => {
            *qty = remaining;
            ReservationOutcome::Applied { remaining }
        }
        None => ReservationOutcome::InsufficientStock { available: *qty },
    }
}

/// Apply a reservation to the configuration at `configuration_index`.
pub fn reserve_in(
    product: &mut Product,
    configuration_index: usize,
    amount: i64,
) -> DomainResult<ReservationOutcome> {
    let product_id = product.id;
    let configuration = product
        .configurations
        .get_mut(configuration_index)
        .ok_or_else(|| {
            DomainError::not_found(format!(
                "configuration {configuration_index} of product {product_id}"
            ))
        })?;
    Ok(apply_reservation(&mut configuration.qty, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storefront_catalog::{LocalizedText, NewProduct};

    fn test_product(qty: i64) -> Product {
        Product::create(
            ProductId::new(),
            NewProduct::new("mug", "MUG-1", LocalizedText::new("en", "Mug"))
                .priced(20.0, 0.1)
                .stocked(qty),
        )
        .unwrap()
    }

    #[test]
    fn reserve_within_stock_then_beyond() {
        let mut product = test_product(10);

        let first = reserve_in(&mut product, 0, 7).unwrap();
        assert_eq!(first, ReservationOutcome::Applied { remaining: 3 });

        let second = reserve_in(&mut product, 0, 5).unwrap();
        assert_eq!(second, ReservationOutcome::InsufficientStock { available: 3 });
        assert_eq!(product.configurations[0].qty, 3);
    }

    #[test]
    fn exact_stock_can_be_taken() {
        let mut qty = 4;
        assert!(apply_reservation(&mut qty, 4).is_applied());
        assert_eq!(qty, 0);
        assert!(!apply_reservation(&mut qty, 1).is_applied());
    }

    #[test]
    fn negative_amount_returns_stock() {
        let mut qty = 2;
        assert_eq!(apply_reservation(&mut qty, -5), ReservationOutcome::Applied { remaining: 7 });
    }

    #[test]
    fn unknown_configuration_is_not_found() {
        let mut product = test_product(1);
        assert!(matches!(
            reserve_in(&mut product, 3, 1),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn reversed_negates_amount() {
        let r = StockReservation::new(ProductId::new(), 1, 3);
        assert_eq!(r.reversed().amount, -3);
        assert_eq!(r.reversed().configuration_index, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn applied_reservations_never_exceed_stock(
            stock in 0i64..500,
            demands in prop::collection::vec(1i64..40, 0..60)
        ) {
            let mut qty = stock;
            let mut taken = 0;
            for amount in demands {
                if apply_reservation(&mut qty, amount).is_applied() {
                    taken += amount;
                }
                prop_assert!(qty >= 0);
            }
            prop_assert!(taken <= stock);
            prop_assert_eq!(qty, stock - taken);
        }

        #[test]
        fn reserve_then_release_restores_qty(stock in 0i64..1_000, amount in 0i64..1_000) {
            let mut qty = stock;
            if apply_reservation(&mut qty, amount).is_applied() {
                prop_assert!(apply_reservation(&mut qty, -amount).is_applied());
            }
            prop_assert_eq!(qty, stock);
        }
    }
}
