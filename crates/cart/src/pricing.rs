use serde::{Deserialize, Serialize};

use crate::cart::Cart;

/// Quantity and unit prices of one line, the only inputs pricing needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    pub qty: i64,
    /// Unit net price.
    pub price: f64,
    pub vat: f64,
}

/// Cart metrics. `total` excludes shipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: i64,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

pub fn totals_of(lines: impl IntoIterator<Item = PricedLine>) -> CartTotals {
    let mut totals = CartTotals::default();
    for line in lines {
        let net = line.price * line.qty as f64;
        totals.item_count += line.qty;
        totals.subtotal += net;
        totals.tax += net * line.vat;
    }
    totals.total = totals.subtotal + totals.tax;
    totals
}

impl Cart {
    pub fn totals(&self) -> CartTotals {
        totals_of(self.items.values().map(|item| PricedLine {
            qty: item.qty,
            price: item.price,
            vat: item.vat,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn seven_units_at_twenty_with_ten_percent_vat() {
        let totals = totals_of([PricedLine {
            qty: 7,
            price: 20.0,
            vat: 0.1,
        }]);
        assert_eq!(totals.item_count, 7);
        assert!(close(totals.subtotal, 140.0));
        assert!(close(totals.tax, 14.0));
        assert!(close(totals.total, 154.0));
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        assert_eq!(totals_of([]), CartTotals::default());
    }

    fn line() -> impl Strategy<Value = PricedLine> {
        (0i64..50, 0.0f64..500.0, 0.0f64..0.3).prop_map(|(qty, price, vat)| PricedLine { qty, price, vat })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn totals_scale_with_quantities(lines in prop::collection::vec(line(), 0..8), k in 0i64..10) {
            let base = totals_of(lines.clone());
            let scaled = totals_of(lines.into_iter().map(|l| PricedLine { qty: l.qty * k, ..l }));

            prop_assert_eq!(scaled.item_count, base.item_count * k);
            prop_assert!(close(scaled.subtotal, base.subtotal * k as f64));
            prop_assert!(close(scaled.tax, base.tax * k as f64));
            prop_assert!(close(scaled.total, base.total * k as f64));
        }

        #[test]
        fn totals_are_additive_over_lines(
            left in prop::collection::vec(line(), 0..6),
            right in prop::collection::vec(line(), 0..6)
        ) {
            let a = totals_of(left.clone());
            let b = totals_of(right.clone());
            let both = totals_of(left.into_iter().chain(right));

            prop_assert_eq!(both.item_count, a.item_count + b.item_count);
            prop_assert!(close(both.subtotal, a.subtotal + b.subtotal));
            prop_assert!(close(both.tax, a.tax + b.tax));
            prop_assert!(close(both.total, both.subtotal + both.tax));
        }
    }
}
