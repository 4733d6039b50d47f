//! Product selection: single-record lookup, listing filter, field projection.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use storefront_core::{CategoryId, ProductId};

use crate::product::Product;

/// Single-product lookup. At most one selector is honoured, by priority
/// id, then sku, then slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductLookup {
    pub id: Option<ProductId>,
    pub sku: Option<String>,
    pub slug: Option<String>,
}

/// The selector a [`ProductLookup`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSelector<'a> {
    Id(ProductId),
    Sku(&'a str),
    Slug(&'a str),
}

impl ProductLookup {
    pub fn by_id(id: ProductId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_sku(sku: impl Into<String>) -> Self {
        Self {
            sku: Some(sku.into()),
            ..Self::default()
        }
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    /// `None` when no selector is set.
    pub fn selector(&self) -> Option<ProductSelector<'_>> {
        if let Some(id) = self.id {
            Some(ProductSelector::Id(id))
        } else if let Some(sku) = self.sku.as_deref() {
            Some(ProductSelector::Sku(sku))
        } else {
            self.slug.as_deref().map(ProductSelector::Slug)
        }
    }
}

/// Criteria for listing products. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub product_type: Option<String>,
    pub active: Option<bool>,
    pub category_id: Option<CategoryId>,
    /// Only products whose validity window contains this instant.
    pub valid_at: Option<DateTime<Utc>>,
    /// Case-insensitive match against any translation of the name.
    pub name_contains: Option<String>,
}

impl ProductFilter {
    pub fn of_type(product_type: impl Into<String>) -> Self {
        Self {
            product_type: Some(product_type.into()),
            ..Self::default()
        }
    }

    pub fn active_only(mut self) -> Self {
        self.active = Some(true);
        self
    }

    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn valid_at(mut self, at: DateTime<Utc>) -> Self {
        self.valid_at = Some(at);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(kind) = &self.product_type {
            if &product.product_type != kind {
                return false;
            }
        }
        if let Some(active) = self.active {
            if product.is_active() != active {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if product.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(at) = self.valid_at {
            if !product.is_valid_at(at) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            let needle = needle.to_lowercase();
            if !product
                .name
                .translations()
                .any(|(_, text)| text.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Page window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Top-level product field names available for projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Type,
    CategoryId,
    Name,
    Description,
    Slug,
    Status,
    ValidFrom,
    ValidTo,
    Details,
    Configurations,
}

impl ProductField {
    pub fn key(&self) -> &'static str {
        match self {
            ProductField::Type => "type",
            ProductField::CategoryId => "category_id",
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Slug => "slug",
            ProductField::Status => "status",
            ProductField::ValidFrom => "valid_from",
            ProductField::ValidTo => "valid_to",
            ProductField::Details => "details",
            ProductField::Configurations => "configurations",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "type" => ProductField::Type,
            "category_id" => ProductField::CategoryId,
            "name" => ProductField::Name,
            "description" => ProductField::Description,
            "slug" => ProductField::Slug,
            "status" => ProductField::Status,
            "valid_from" => ProductField::ValidFrom,
            "valid_to" => ProductField::ValidTo,
            "details" => ProductField::Details,
            "configurations" => ProductField::Configurations,
            _ => return None,
        })
    }
}

/// JSON document of `product` restricted to `fields` plus `id`.
/// An empty field list yields the whole document.
pub fn project(product: &Product, fields: &[ProductField]) -> serde_json::Result<Value> {
    let document = serde_json::to_value(product)?;
    if fields.is_empty() {
        return Ok(document);
    }
    let Value::Object(mut full) = document else {
        return Ok(document);
    };
    let mut out = Map::new();
    if let Some(id) = full.remove("id") {
        out.insert("id".to_owned(), id);
    }
    for field in fields {
        if let Some(value) = full.remove(field.key()) {
            out.insert(field.key().to_owned(), value);
        }
    }
    Ok(Value::Object(out))
}
