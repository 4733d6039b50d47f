use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, Details, DomainError, DomainResult, ProductId};

use crate::slug::slugify;
use crate::text::LocalizedText;

/// Product status lifecycle. `Inactive` is the soft-deleted state: the record
/// stays so historical orders keep resolving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ProductStatus::Active),
            "inactive" => Some(ProductStatus::Inactive),
            _ => None,
        }
    }
}

/// One purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub sku: String,
    pub variety: LocalizedText,
    /// Unit net price.
    pub price: f64,
    /// Fractional tax rate (0.22 for 22%).
    pub vat: f64,
    /// Stock currently available.
    pub qty: i64,
    /// Stock at creation; never rewritten afterwards.
    pub initial_quantity: i64,
    #[serde(default)]
    pub details: Details,
}

impl Configuration {
    /// Unit price including tax.
    pub fn gross_price(&self) -> f64 {
        self.price * (1.0 + self.vat)
    }

    /// Integer value of a detail field, used for per-configuration thresholds.
    pub fn detail_i64(&self, field: &str) -> Option<i64> {
        self.details.get(field).and_then(serde_json::Value::as_i64)
    }
}

/// Aggregate: a catalog product owning an ordered list of configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category_id: Option<CategoryId>,
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub slug: String,
    pub status: ProductStatus,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Details,
    pub configurations: Vec<Configuration>,
}

/// Input for a new product with its first configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub product_type: String,
    pub sku: String,
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub category_id: Option<CategoryId>,
    pub price: f64,
    pub vat: f64,
    pub qty: i64,
    /// Defaults to `qty` when absent.
    pub initial_quantity: Option<i64>,
    /// Defaults to the product name when absent.
    pub variety: Option<LocalizedText>,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub configuration_details: Details,
    pub details: Details,
}

impl NewProduct {
    pub fn new(product_type: impl Into<String>, sku: impl Into<String>, name: LocalizedText) -> Self {
        Self {
            product_type: product_type.into(),
            sku: sku.into(),
            name,
            description: None,
            category_id: None,
            price: 1.0,
            vat: 0.0,
            qty: 0,
            initial_quantity: None,
            variety: None,
            active: true,
            valid_from: None,
            valid_to: None,
            configuration_details: Details::new(),
            details: Details::new(),
        }
    }

    pub fn priced(mut self, price: f64, vat: f64) -> Self {
        self.price = price;
        self.vat = vat;
        self
    }

    pub fn stocked(mut self, qty: i64) -> Self {
        self.qty = qty;
        self
    }

    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Slug this product will be stored under.
    pub fn slug(&self) -> DomainResult<String> {
        slugify(&self.product_type, self.name.default_text())
    }
}

/// Input for an additional configuration of an existing product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConfiguration {
    pub sku: String,
    pub variety: Option<LocalizedText>,
    pub price: f64,
    pub vat: f64,
    pub qty: i64,
    pub initial_quantity: Option<i64>,
    pub details: Details,
}

impl NewConfiguration {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            variety: None,
            price: 1.0,
            vat: 0.0,
            qty: 0,
            initial_quantity: None,
            details: Details::new(),
        }
    }

    pub fn priced(mut self, price: f64, vat: f64) -> Self {
        self.price = price;
        self.vat = vat;
        self
    }

    pub fn stocked(mut self, qty: i64) -> Self {
        self.qty = qty;
        self
    }

    pub fn variety(mut self, variety: LocalizedText) -> Self {
        self.variety = Some(variety);
        self
    }

    fn into_configuration(self, fallback_variety: &LocalizedText) -> DomainResult<Configuration> {
        validate_configuration(&self.sku, self.price, self.vat, self.qty)?;
        let initial_quantity = self.initial_quantity.unwrap_or(self.qty);
        if initial_quantity < 0 {
            return Err(DomainError::validation("initial_quantity cannot be negative"));
        }
        Ok(Configuration {
            sku: self.sku,
            variety: self.variety.unwrap_or_else(|| fallback_variety.clone()),
            price: self.price,
            vat: self.vat,
            qty: self.qty,
            initial_quantity,
            details: self.details,
        })
    }
}

fn validate_configuration(sku: &str, price: f64, vat: f64, qty: i64) -> DomainResult<()> {
    if sku.trim().is_empty() {
        return Err(DomainError::validation("sku cannot be empty"));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    if !vat.is_finite() || vat < 0.0 {
        return Err(DomainError::validation("vat must be a non-negative rate"));
    }
    if qty < 0 {
        return Err(DomainError::validation("qty cannot be negative"));
    }
    Ok(())
}

impl Product {
    /// Build a product from creation input. Uniqueness of slug and SKU is the
    /// store's concern; this only validates the record itself.
    pub fn create(id: ProductId, input: NewProduct) -> DomainResult<Self> {
        if input.product_type.trim().is_empty() {
            return Err(DomainError::validation("product type cannot be empty"));
        }
        if input.name.is_blank() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if let (Some(from), Some(to)) = (input.valid_from, input.valid_to) {
            if to <= from {
                return Err(DomainError::validation("valid_to must be after valid_from"));
            }
        }
        let slug = input.slug()?;

        let first = NewConfiguration {
            sku: input.sku,
            variety: input.variety,
            price: input.price,
            vat: input.vat,
            qty: input.qty,
            initial_quantity: input.initial_quantity,
            details: input.configuration_details,
        }
        .into_configuration(&input.name)?;

        Ok(Self {
            id,
            product_type: input.product_type,
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            slug,
            status: if input.active {
                ProductStatus::Active
            } else {
                ProductStatus::Inactive
            },
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            details: input.details,
            configurations: vec![first],
        })
    }

    /// Append a configuration and return its index. Global SKU uniqueness is
    /// not checked here.
    pub fn push_configuration(&mut self, input: NewConfiguration) -> DomainResult<usize> {
        let configuration = input.into_configuration(&self.name)?;
        self.configurations.push(configuration);
        Ok(self.configurations.len() - 1)
    }

    pub fn configuration_index(&self, sku: &str) -> Option<usize> {
        self.configurations.iter().position(|c| c.sku == sku)
    }

    pub fn configuration(&self, sku: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.sku == sku)
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.configurations.iter().map(|c| c.sku.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Whether `at` falls inside `[valid_from, valid_to)`; open ends always match.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= at) && self.valid_to.is_none_or(|to| at < to)
    }

    /// Soft delete.
    pub fn deactivate(&mut self) {
        self.status = ProductStatus::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn coffee() -> NewProduct {
        NewProduct::new("coffee", "COF-250", LocalizedText::new("en", "House Blend"))
            .priced(8.5, 0.1)
            .stocked(40)
    }

    #[test]
    fn create_derives_slug_and_first_configuration() {
        let product = Product::create(ProductId::new(), coffee()).unwrap();

        assert_eq!(product.slug, "coffee-house-blend");
        assert_eq!(product.configurations.len(), 1);
        let conf = &product.configurations[0];
        assert_eq!(conf.sku, "COF-250");
        assert_eq!(conf.qty, 40);
        assert_eq!(conf.initial_quantity, 40);
        assert_eq!(conf.variety.default_text(), "House Blend");
        assert!(product.is_active());
    }

    #[test]
    fn inactive_input_creates_inactive_product() {
        let mut input = coffee();
        input.active = false;
        let product = Product::create(ProductId::new(), input).unwrap();
        assert_eq!(product.status, ProductStatus::Inactive);
    }

    #[test]
    fn negative_stock_is_rejected() {
        let err = Product::create(ProductId::new(), coffee().stocked(-1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("qty")));
    }

    #[test]
    fn inverted_validity_window_is_rejected() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut input = coffee();
        input.valid_from = Some(from);
        input.valid_to = Some(from - Duration::days(1));
        assert!(Product::create(ProductId::new(), input).is_err());
    }

    #[test]
    fn validity_window_is_half_open() {
        let from = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(30);
        let mut input = coffee();
        input.valid_from = Some(from);
        input.valid_to = Some(to);
        let product = Product::create(ProductId::new(), input).unwrap();

        assert!(!product.is_valid_at(from - Duration::seconds(1)));
        assert!(product.is_valid_at(from));
        assert!(product.is_valid_at(to - Duration::seconds(1)));
        assert!(!product.is_valid_at(to));
    }

    #[test]
    fn push_configuration_appends_in_order() {
        let mut product = Product::create(ProductId::new(), coffee()).unwrap();
        let idx = product
            .push_configuration(
                NewConfiguration::new("COF-1000")
                    .priced(30.0, 0.1)
                    .stocked(5)
                    .variety(LocalizedText::new("en", "1kg")),
            )
            .unwrap();

        assert_eq!(idx, 1);
        assert_eq!(product.configuration_index("COF-1000"), Some(1));
        assert_eq!(product.configuration("COF-1000").unwrap().variety.default_text(), "1kg");
        assert_eq!(product.skus().collect::<Vec<_>>(), vec!["COF-250", "COF-1000"]);
    }

    #[test]
    fn deactivate_is_a_soft_delete() {
        let mut product = Product::create(ProductId::new(), coffee()).unwrap();
        product.deactivate();
        assert!(!product.is_active());
        assert_eq!(product.configurations.len(), 1);
    }

    #[test]
    fn gross_price_applies_vat() {
        let product = Product::create(ProductId::new(), coffee()).unwrap();
        let gross = product.configurations[0].gross_price();
        assert!((gross - 9.35).abs() < 1e-9);
    }
}
