use crate::product::{Configuration, Product};

/// Minimum stock a configuration must hold to be considered purchasable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinQuantity {
    Fixed(i64),
    /// Threshold read from an integer field of each configuration's details.
    /// Configurations lacking the field are skipped.
    DetailField(String),
    /// Threshold read from one of the configuration's own quantity fields.
    ConfigurationField(QuantityField),
}

/// Integer fields of a [`Configuration`] usable as a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityField {
    Qty,
    InitialQuantity,
}

impl Default for MinQuantity {
    fn default() -> Self {
        MinQuantity::Fixed(1)
    }
}

impl MinQuantity {
    fn threshold(&self, configuration: &Configuration) -> Option<i64> {
        match self {
            MinQuantity::Fixed(n) => Some(*n),
            MinQuantity::DetailField(field) => configuration.detail_i64(field),
            MinQuantity::ConfigurationField(QuantityField::Qty) => Some(configuration.qty),
            MinQuantity::ConfigurationField(QuantityField::InitialQuantity) => {
                Some(configuration.initial_quantity)
            }
        }
    }
}

/// Cheapest configuration by gross unit price among those with enough stock.
///
/// Returns `(index, gross_unit_price)`. Ties go to the lowest index.
pub fn cheapest_configuration(product: &Product, min_qty: &MinQuantity) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, configuration) in product.configurations.iter().enumerate() {
        let Some(threshold) = min_qty.threshold(configuration) else {
            continue;
        };
        if configuration.qty < threshold {
            continue;
        }
        let gross = configuration.gross_price();
        match best {
            Some((_, current)) if current <= gross => {}
            _ => best = Some((index, gross)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{NewConfiguration, NewProduct};
    use crate::text::LocalizedText;
    use storefront_core::ProductId;

    fn product_with(confs: &[(f64, f64, i64)]) -> Product {
        let (price, vat, qty) = confs[0];
        let mut product = Product::create(
            ProductId::new(),
            NewProduct::new("shirt", "SH-0", LocalizedText::new("en", "Shirt"))
                .priced(price, vat)
                .stocked(qty),
        )
        .unwrap();
        for (i, (price, vat, qty)) in confs.iter().enumerate().skip(1) {
            product
                .push_configuration(NewConfiguration::new(format!("SH-{i}")).priced(*price, *vat).stocked(*qty))
                .unwrap();
        }
        product
    }

    #[test]
    fn picks_lowest_gross_price_with_stock() {
        // 10*1.2 = 12, 11*1.0 = 11, 5*1.0 out of stock
        let product = product_with(&[(10.0, 0.2, 3), (11.0, 0.0, 3), (5.0, 0.0, 0)]);
        let (index, gross) = cheapest_configuration(&product, &MinQuantity::Fixed(1)).unwrap();
        assert_eq!(index, 1);
        assert!((gross - 11.0).abs() < 1e-9);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let product = product_with(&[(10.0, 0.0, 1), (10.0, 0.0, 1)]);
        assert_eq!(cheapest_configuration(&product, &MinQuantity::Fixed(1)).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn no_qualifying_configuration_yields_none() {
        let product = product_with(&[(10.0, 0.0, 1), (8.0, 0.0, 2)]);
        assert_eq!(cheapest_configuration(&product, &MinQuantity::Fixed(5)), None);
    }

    #[test]
    fn detail_field_threshold_skips_configurations_without_it() {
        let mut product = product_with(&[(10.0, 0.0, 4), (8.0, 0.0, 4), (9.0, 0.0, 4)]);
        product.configurations[0]
            .details
            .insert("min_order".into(), serde_json::json!(2));
        product.configurations[2]
            .details
            .insert("min_order".into(), serde_json::json!(3));

        let picked = cheapest_configuration(&product, &MinQuantity::DetailField("min_order".into()));
        assert_eq!(picked.map(|(i, _)| i), Some(2));
    }

    #[test]
    fn initial_quantity_threshold_requires_untouched_stock() {
        let mut product = product_with(&[(10.0, 0.0, 4), (8.0, 0.0, 4)]);
        let min_qty = MinQuantity::ConfigurationField(QuantityField::InitialQuantity);
        assert_eq!(cheapest_configuration(&product, &min_qty).map(|(i, _)| i), Some(1));

        product.configurations[1].qty = 3;
        assert_eq!(cheapest_configuration(&product, &min_qty).map(|(i, _)| i), Some(0));
    }
}
