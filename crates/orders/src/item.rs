use serde::{Deserialize, Serialize};

use storefront_cart::CartItem;
use storefront_catalog::LocalizedText;
use storefront_core::Details;

/// Purchased line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: LocalizedText,
    pub variety: LocalizedText,
    pub qty: i64,
    pub sku: String,
    /// Unit net price.
    pub net_price: f64,
    pub vat: f64,
    /// Unit tax amount, `net_price * vat`.
    pub base_vat: f64,
    /// Unit price including tax, `net_price * (1 + vat)`.
    pub gross_price: f64,
    #[serde(default)]
    pub details: Details,
}

impl OrderItem {
    pub fn new(
        sku: impl Into<String>,
        name: LocalizedText,
        variety: LocalizedText,
        qty: i64,
        net_price: f64,
        vat: f64,
    ) -> Self {
        Self {
            name,
            variety,
            qty,
            sku: sku.into(),
            net_price,
            vat,
            base_vat: net_price * vat,
            gross_price: net_price * (1.0 + vat),
            details: Details::new(),
        }
    }

    pub fn from_cart_item(sku: &str, item: &CartItem) -> Self {
        Self {
            details: item.details.clone(),
            ..Self::new(
                sku,
                item.name.clone(),
                item.variety.clone(),
                item.qty,
                item.price,
                item.vat,
            )
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub net_total: f64,
    pub tax: f64,
    pub gross_total: f64,
    pub shipping_charges: f64,
    /// `gross_total + shipping_charges`.
    pub total: f64,
}

impl OrderTotals {
    pub fn compute(items: &[OrderItem], shipping_charges: f64) -> Self {
        let net_total: f64 = items.iter().map(|i| i.net_price * i.qty as f64).sum();
        let gross_total: f64 = items.iter().map(|i| i.gross_price * i.qty as f64).sum();
        Self {
            net_total,
            tax: gross_total - net_total,
            gross_total,
            shipping_charges,
            total: gross_total + shipping_charges,
        }
    }
}

/// Net amount grouped under one VAT rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VatGroup {
    pub vat: f64,
    pub net: f64,
}

/// Sum of item `net_price` per distinct VAT rate, ordered by rate.
///
/// Rates are grouped by exact value; 0.1 and 0.10000001 are separate groups.
pub fn net_per_vat_rate(items: &[OrderItem]) -> Vec<VatGroup> {
    let mut groups: Vec<VatGroup> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|g| g.vat.to_bits() == item.vat.to_bits()) {
            Some(group) => group.net += item.net_price,
            None => groups.push(VatGroup {
                vat: item.vat,
                net: item.net_price,
            }),
        }
    }
    groups.sort_by(|a, b| a.vat.total_cmp(&b.vat));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, qty: i64, net_price: f64, vat: f64) -> OrderItem {
        OrderItem::new(
            sku,
            LocalizedText::new("en", sku),
            LocalizedText::new("en", sku),
            qty,
            net_price,
            vat,
        )
    }

    #[test]
    fn item_derives_unit_tax_and_gross() {
        let line = item("A", 2, 100.0, 0.2);
        assert!((line.base_vat - 20.0).abs() < 1e-9);
        assert!((line.gross_price - 120.0).abs() < 1e-9);
    }

    #[test]
    fn totals_include_shipping_only_in_total() {
        let items = vec![item("A", 2, 100.0, 0.1), item("B", 1, 30.0, 0.2)];
        let totals = OrderTotals::compute(&items, 5.0);

        assert!((totals.net_total - 230.0).abs() < 1e-9);
        assert!((totals.gross_total - 256.0).abs() < 1e-9);
        assert!((totals.tax - 26.0).abs() < 1e-9);
        assert!((totals.total - 261.0).abs() < 1e-9);
    }

    #[test]
    fn net_per_vat_rate_groups_by_raw_rate() {
        let items = vec![
            item("A", 1, 100.0, 0.1),
            item("B", 3, 50.0, 0.1),
            item("C", 1, 30.0, 0.2),
        ];
        let groups = net_per_vat_rate(&items);

        assert_eq!(
            groups,
            vec![
                VatGroup { vat: 0.1, net: 150.0 },
                VatGroup { vat: 0.2, net: 30.0 },
            ]
        );
    }

    #[test]
    fn nearly_equal_rates_stay_apart() {
        let items = vec![item("A", 1, 10.0, 0.1), item("B", 1, 10.0, 0.1 + 1e-9)];
        assert_eq!(net_per_vat_rate(&items).len(), 2);
    }
}
