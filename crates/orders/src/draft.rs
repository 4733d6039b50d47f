use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart::{BillInfo, Cart, ShipmentInfo};
use storefront_core::{Details, DomainError, DomainResult, UserId};

use crate::item::{OrderItem, OrderTotals};

/// Payer identity as reported by the payment backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Purchase content of an order, before it is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub payment_date: DateTime<Utc>,
    pub shipment_info: ShipmentInfo,
    pub bill: bool,
    pub bill_info: BillInfo,
    pub payer_info: PayerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_charges: f64,
    pub notes: Option<String>,
    #[serde(default)]
    pub details: Details,
}

impl OrderDraft {
    /// Snapshot a paid cart. Items are ordered by SKU.
    pub fn from_cart(
        cart: &Cart,
        payment_date: DateTime<Utc>,
        payer_info: PayerInfo,
    ) -> DomainResult<Self> {
        if cart.is_empty() {
            return Err(DomainError::validation("cannot place an order from an empty cart"));
        }
        let info = &cart.order_info;
        Ok(Self {
            user_id: cart.user_id,
            payment_date,
            shipment_info: info.shipment_info.clone(),
            bill: info.bill,
            bill_info: info.bill_info.clone(),
            payer_info,
            items: cart
                .items
                .iter()
                .map(|(sku, item)| OrderItem::from_cart_item(sku, item))
                .collect(),
            shipping_charges: info.shipping_charges,
            notes: info.notes.clone(),
            details: info.details.clone(),
        })
    }

    pub fn totals(&self) -> OrderTotals {
        OrderTotals::compute(&self.items, self.shipping_charges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use storefront_cart::{CartItem, OrderInfoUpdate};
    use storefront_catalog::{LocalizedText, NewProduct, Product};
    use storefront_core::{CartId, ProductId};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    fn filled_cart() -> Cart {
        let product = Product::create(
            ProductId::new(),
            NewProduct::new("mug", "MUG-1", LocalizedText::new("en", "Mug"))
                .priced(20.0, 0.1)
                .stocked(10),
        )
        .unwrap();
        let mut cart = Cart::new(CartId::new(), UserId::new(), test_time(), Duration::minutes(30));
        cart.put_item("MUG-1", CartItem::snapshot(&product, 0, 7).unwrap())
            .unwrap();
        cart.apply_order_info(OrderInfoUpdate {
            shipping_charges: Some(6.0),
            notes: Some(Some("leave at door".into())),
            ..OrderInfoUpdate::default()
        })
        .unwrap();
        cart
    }

    #[test]
    fn draft_copies_cart_content() {
        let cart = filled_cart();
        let draft = OrderDraft::from_cart(&cart, test_time(), PayerInfo::default()).unwrap();

        assert_eq!(draft.user_id, cart.user_id);
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].sku, "MUG-1");
        assert_eq!(draft.items[0].qty, 7);
        assert_eq!(draft.notes.as_deref(), Some("leave at door"));

        let totals = draft.totals();
        assert!((totals.net_total - 140.0).abs() < 1e-9);
        assert!((totals.tax - 14.0).abs() < 1e-9);
        assert!((totals.total - 160.0).abs() < 1e-9);
    }

    #[test]
    fn empty_cart_cannot_be_ordered() {
        let cart = Cart::new(CartId::new(), UserId::new(), test_time(), Duration::minutes(30));
        assert!(matches!(
            OrderDraft::from_cart(&cart, test_time(), PayerInfo::default()),
            Err(DomainError::Validation(_))
        ));
    }
}
