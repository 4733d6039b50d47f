//! Catalog service: product and category administration over the stores.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::instrument;

use storefront_catalog::{
    Category, LocalizedText, NewConfiguration, NewProduct, Pagination, Product, ProductField,
    ProductFilter, ProductLookup, ProductSelector, ProductStatus, project,
};
use storefront_core::{CategoryId, ProductId};
use storefront_infra::{CategoryStore, ProductStore, StoreError, UniqueKey};

use crate::error::{ShopError, ShopResult};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    categories: Arc<dyn CategoryStore>,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self {
            products,
            categories,
        }
    }

    /// Create a product with its first configuration.
    ///
    /// Slug and SKU are checked up front for a clear error; the store's unique
    /// constraints still decide races between concurrent creators.
    #[instrument(skip(self, input), fields(sku = %input.sku), err)]
    pub async fn create_product(&self, input: NewProduct) -> ShopResult<Product> {
        let slug = input.slug()?;
        if self.products.find_by_slug(&slug).await?.is_some() {
            return Err(ShopError::DuplicateSlug(slug));
        }
        if self.products.find_by_sku(&input.sku).await?.is_some() {
            return Err(ShopError::DuplicateSku(input.sku));
        }

        let product = Product::create(ProductId::new(), input)?;
        self.products
            .insert(&product)
            .await
            .map_err(|err| match err {
                StoreError::Duplicate {
                    key: UniqueKey::Slug,
                    ..
                } => ShopError::DuplicateSlug(product.slug.clone()),
                StoreError::Duplicate {
                    key: UniqueKey::Sku,
                    ..
                } => ShopError::DuplicateSku(product.configurations[0].sku.clone()),
                other => other.into(),
            })?;

        tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    /// Fetch one product by id, SKU or slug, in that priority.
    pub async fn get_product(&self, lookup: &ProductLookup) -> ShopResult<Option<Product>> {
        let product = match lookup.selector() {
            Some(ProductSelector::Id(id)) => self.products.get(id).await?,
            Some(ProductSelector::Sku(sku)) => self.products.find_by_sku(sku).await?,
            Some(ProductSelector::Slug(slug)) => self.products.find_by_slug(slug).await?,
            None => None,
        };
        Ok(product)
    }

    /// Lazy listing of products of `product_type` matching `filter`,
    /// projected to `fields` (all fields when empty).
    pub fn list_products(
        &self,
        product_type: impl Into<String>,
        filter: ProductFilter,
        fields: Vec<ProductField>,
    ) -> ProductListing {
        let filter = ProductFilter {
            product_type: Some(product_type.into()),
            ..filter
        };
        ProductListing::new(self.products.clone(), filter, fields)
    }

    /// Append a configuration to an existing product.
    ///
    /// SKU uniqueness is left entirely to the store.
    #[instrument(skip(self, input), fields(sku = %input.sku), err)]
    pub async fn add_configuration(
        &self,
        product_id: ProductId,
        input: NewConfiguration,
    ) -> ShopResult<usize> {
        let mut product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("product {product_id}")))?;
        let local_index = product.push_configuration(input)?;
        let configuration = &product.configurations[local_index];

        let index = self
            .products
            .push_configuration(product_id, configuration)
            .await
            .map_err(|err| match err {
                StoreError::Duplicate {
                    key: UniqueKey::Sku,
                    ..
                } => ShopError::DuplicateSku(configuration.sku.clone()),
                other => other.into(),
            })?;

        tracing::info!(%product_id, index, sku = %configuration.sku, "configuration added");
        Ok(index)
    }

    /// Soft delete: the product stays resolvable but is marked inactive.
    #[instrument(skip(self), err)]
    pub async fn deactivate(&self, product_id: ProductId) -> ShopResult<()> {
        self.products
            .set_status(product_id, ProductStatus::Inactive)
            .await?;
        tracing::info!(%product_id, "product deactivated");
        Ok(())
    }

    #[instrument(skip(self, name), err)]
    pub async fn create_category(&self, name: LocalizedText) -> ShopResult<Category> {
        let category = Category::new(CategoryId::new(), name)?;
        self.categories.insert(&category).await?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> ShopResult<Option<Category>> {
        Ok(self.categories.get(id).await?)
    }

    pub async fn list_categories(&self) -> ShopResult<Vec<Category>> {
        Ok(self.categories.list().await?)
    }

    /// Delete a category nobody references.
    #[instrument(skip(self), err)]
    pub async fn delete_category(&self, id: CategoryId) -> ShopResult<()> {
        if self.products.any_in_category(id).await? {
            return Err(ShopError::CategoryInUse(id));
        }
        if !self.categories.delete(id).await? {
            return Err(ShopError::NotFound(format!("category {id}")));
        }
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }
}

/// Page-by-page product listing.
///
/// Nothing is fetched until [`next_page`](Self::next_page) is awaited, and
/// every fetch re-runs the query, so a listing can be restarted at any time.
pub struct ProductListing {
    store: Arc<dyn ProductStore>,
    filter: ProductFilter,
    fields: Vec<ProductField>,
    page_size: usize,
    next: Option<Pagination>,
}

impl ProductListing {
    fn new(store: Arc<dyn ProductStore>, filter: ProductFilter, fields: Vec<ProductField>) -> Self {
        Self {
            store,
            filter,
            fields,
            page_size: DEFAULT_PAGE_SIZE,
            next: Some(Pagination::first(DEFAULT_PAGE_SIZE)),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self.restart();
        self
    }

    pub fn filter(&self) -> &ProductFilter {
        &self.filter
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.next = Some(Pagination::first(self.page_size));
    }

    /// Next page of projected documents, or `None` once exhausted.
    pub async fn next_page(&mut self) -> ShopResult<Option<Vec<JsonValue>>> {
        let Some(page) = self.next else {
            return Ok(None);
        };
        let products = self.store.list(&self.filter, page).await?;
        self.next = if products.len() < page.limit {
            None
        } else {
            Some(page.next())
        };
        if products.is_empty() {
            return Ok(None);
        }
        let documents = products
            .iter()
            .map(|p| project(p, &self.fields).map_err(StoreError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(documents))
    }

    /// Every remaining document, from the current position.
    pub async fn collect_remaining(&mut self) -> ShopResult<Vec<JsonValue>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}
