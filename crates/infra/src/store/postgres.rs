//! Postgres-backed stores.
//!
//! Products are normalised into `products` + `product_configurations` so the
//! stock reservation can be a single conditional `UPDATE`. Carts and orders
//! keep their nested parts as JSONB next to the indexed columns used for
//! lookups.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` keyed by constraint name |
//! | Database (other) | any | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Decode / ColumnDecode | N/A | `Corrupt` |
//! | Other | N/A | `Backend` |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgDatabaseError, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use storefront_cart::{Cart, CartItem, OrderInfo};
use storefront_catalog::{
    Category, Configuration, LocalizedText, Pagination, Product, ProductFilter, ProductStatus,
};
use storefront_core::{
    AggregateRoot, CartId, CategoryId, Details, ExpectedVersion, OrderId, ProductId, UserId,
};
use storefront_inventory::ReservationOutcome;
use storefront_orders::Order;

use super::{
    CartStore, CategoryStore, OrderStore, ProductStore, SettingsStore, StoreError, StoreResult,
    UniqueKey,
};

const SCHEMA: &str = include_str!("../../migrations/0001_storefront.sql");

/// Create the storefront tables if they do not exist yet.
#[instrument(skip(pool), err)]
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    tracing::info!("storefront schema is up to date");
    Ok(())
}

fn unique_key(constraint: Option<&str>) -> UniqueKey {
    match constraint {
        Some("products_slug_key") => UniqueKey::Slug,
        Some("product_configurations_sku_key") => UniqueKey::Sku,
        Some("carts_user_id_key") => UniqueKey::CartUser,
        _ => UniqueKey::Id,
    }
}

/// The offending value of a unique violation, from a detail line such as
/// `Key (slug)=(mug-blue) already exists.`
fn duplicate_value(detail: &str) -> Option<&str> {
    let start = detail.find(")=(")? + 3;
    let end = detail.rfind(") already exists")?;
    detail.get(start..end)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => {
                    let value = db_err
                        .try_downcast_ref::<PgDatabaseError>()
                        .and_then(PgDatabaseError::detail)
                        .and_then(duplicate_value)
                        .map(str::to_owned)
                        .unwrap_or(msg);
                    StoreError::duplicate(unique_key(db_err.constraint()), value)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

fn decode<T>(operation: &str, result: Result<T, sqlx::Error>) -> StoreResult<T> {
    result.map_err(|e| map_sqlx_error(operation, e))
}

fn status_str(active: bool) -> &'static str {
    if active {
        ProductStatus::Active.as_str()
    } else {
        ProductStatus::Inactive.as_str()
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

const PRODUCT_COLUMNS: &str = "p.id, p.type, p.category_id, p.name, p.description, p.slug, \
     p.status, p.valid_from, p.valid_to, p.details";

#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_configurations(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Configuration>>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, sku, variety, price, vat, qty, initial_quantity, details
            FROM product_configurations
            WHERE product_id = ANY($1)
            ORDER BY product_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_configurations", e))?;

        let mut by_product: HashMap<Uuid, Vec<Configuration>> = HashMap::new();
        for row in rows {
            let product_id: Uuid = decode("load_configurations", row.try_get("product_id"))?;
            let variety: Json<LocalizedText> = decode("load_configurations", row.try_get("variety"))?;
            let details: Json<Details> = decode("load_configurations", row.try_get("details"))?;
            by_product.entry(product_id).or_default().push(Configuration {
                sku: decode("load_configurations", row.try_get("sku"))?,
                variety: variety.0,
                price: decode("load_configurations", row.try_get("price"))?,
                vat: decode("load_configurations", row.try_get("vat"))?,
                qty: decode("load_configurations", row.try_get("qty"))?,
                initial_quantity: decode("load_configurations", row.try_get("initial_quantity"))?,
                details: details.0,
            });
        }
        Ok(by_product)
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Product>> {
        let ids = rows
            .iter()
            .map(|row| decode("hydrate", row.try_get::<Uuid, _>("id")))
            .collect::<StoreResult<Vec<_>>>()?;
        let mut configurations = self.load_configurations(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let id: Uuid = decode("hydrate", row.try_get("id"))?;
                product_from_row(&row, configurations.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn fetch_one_product(&self, operation: &str, query: &str, param: Bind) -> StoreResult<Option<Product>> {
        let q = sqlx::query(query);
        let q = match param {
            Bind::Uuid(v) => q.bind(v),
            Bind::Text(v) => q.bind(v),
        };
        let row = q
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

enum Bind {
    Uuid(Uuid),
    Text(String),
}

fn product_from_row(row: &PgRow, configurations: Vec<Configuration>) -> StoreResult<Product> {
    let status: String = decode("product_from_row", row.try_get("status"))?;
    let status = ProductStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown product status {status:?}")))?;
    let name: Json<LocalizedText> = decode("product_from_row", row.try_get("name"))?;
    let description: Option<Json<LocalizedText>> = decode("product_from_row", row.try_get("description"))?;
    let details: Json<Details> = decode("product_from_row", row.try_get("details"))?;
    let category_id: Option<Uuid> = decode("product_from_row", row.try_get("category_id"))?;
    let id: Uuid = decode("product_from_row", row.try_get("id"))?;

    Ok(Product {
        id: ProductId::from_uuid(id),
        product_type: decode("product_from_row", row.try_get("type"))?,
        category_id: category_id.map(CategoryId::from_uuid),
        name: name.0,
        description: description.map(|d| d.0),
        slug: decode("product_from_row", row.try_get("slug"))?,
        status,
        valid_from: decode("product_from_row", row.try_get("valid_from"))?,
        valid_to: decode("product_from_row", row.try_get("valid_to"))?,
        details: details.0,
        configurations,
    })
}

async fn insert_configuration(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: Uuid,
    position: i32,
    configuration: &Configuration,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_configurations (
            product_id, position, sku, variety, price, vat, qty, initial_quantity, details
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(product_id)
    .bind(position)
    .bind(&configuration.sku)
    .bind(Json(&configuration.variety))
    .bind(configuration.price)
    .bind(configuration.vat)
    .bind(configuration.qty)
    .bind(configuration.initial_quantity)
    .bind(Json(&configuration.details))
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_configuration", e))?;
    Ok(())
}

#[async_trait::async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(skip(self, product), fields(product_id = %product.id, slug = %product.slug), err)]
    async fn insert(&self, product: &Product) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, type, category_id, name, description, slug, status,
                valid_from, valid_to, details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.product_type)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(Json(&product.name))
        .bind(product.description.as_ref().map(Json))
        .bind(&product.slug)
        .bind(product.status.as_str())
        .bind(product.valid_from)
        .bind(product.valid_to)
        .bind(Json(&product.details))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        for (position, configuration) in product.configurations.iter().enumerate() {
            insert_configuration(&mut tx, *product.id.as_uuid(), position as i32, configuration).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.fetch_one_product(
            "get_product",
            &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"),
            Bind::Uuid(*id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn find_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        self.fetch_one_product(
            "find_product_by_sku",
            &format!(
                "SELECT {PRODUCT_COLUMNS} FROM products p \
                 JOIN product_configurations c ON c.product_id = p.id WHERE c.sku = $1"
            ),
            Bind::Text(sku.to_owned()),
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        self.fetch_one_product(
            "find_product_by_slug",
            &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = $1"),
            Bind::Text(slug.to_owned()),
        )
        .await
    }

    #[instrument(skip(self, filter), fields(offset = page.offset, limit = page.limit), err)]
    async fn list(&self, filter: &ProductFilter, page: Pagination) -> StoreResult<Vec<Product>> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE TRUE"));
        if let Some(kind) = &filter.product_type {
            qb.push(" AND p.type = ").push_bind(kind.clone());
        }
        if let Some(active) = filter.active {
            qb.push(" AND p.status = ").push_bind(status_str(active));
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND p.category_id = ").push_bind(*category_id.as_uuid());
        }
        if let Some(at) = filter.valid_at {
            qb.push(" AND (p.valid_from IS NULL OR p.valid_from <= ")
                .push_bind(at)
                .push(") AND (p.valid_to IS NULL OR p.valid_to > ")
                .push_bind(at)
                .push(")");
        }
        if let Some(needle) = &filter.name_contains {
            qb.push(
                " AND EXISTS (SELECT 1 FROM jsonb_each_text(p.name -> 'translations') t \
                 WHERE lower(t.value) LIKE ",
            )
            .push_bind(escape_like(&needle.to_lowercase()))
            .push(")");
        }
        qb.push(" ORDER BY p.seq ASC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset as i64);

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        self.hydrate(rows).await
    }

    #[instrument(skip(self, configuration), fields(sku = %configuration.sku), err)]
    async fn push_configuration(
        &self,
        product_id: ProductId,
        configuration: &Configuration,
    ) -> StoreResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("push_configuration", e))?;

        // Row lock serialises concurrent appends to the same product.
        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(*product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("push_configuration", e))?;
        if locked.is_none() {
            return Err(StoreError::not_found(format!("product {product_id}")));
        }

        let position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM product_configurations WHERE product_id = $1",
        )
        .bind(*product_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("push_configuration", e))?;

        insert_configuration(&mut tx, *product_id.as_uuid(), position, configuration).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("push_configuration", e))?;
        Ok(position as usize)
    }

    #[instrument(skip(self), err)]
    async fn set_status(&self, product_id: ProductId, status: ProductStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE products SET status = $2 WHERE id = $1")
            .bind(*product_id.as_uuid())
            .bind(status.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_product_status", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("product {product_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn apply_if_stock(
        &self,
        product_id: ProductId,
        configuration_index: usize,
        amount: i64,
    ) -> StoreResult<ReservationOutcome> {
        let position = configuration_index as i32;
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE product_configurations
            SET qty = qty - $3
            WHERE product_id = $1 AND position = $2 AND qty >= $3
            RETURNING qty
            "#,
        )
        .bind(*product_id.as_uuid())
        .bind(position)
        .bind(amount)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("apply_if_stock", e))?;

        if let Some(remaining) = remaining {
            return Ok(ReservationOutcome::Applied { remaining });
        }

        let available: Option<i64> = sqlx::query_scalar(
            "SELECT qty FROM product_configurations WHERE product_id = $1 AND position = $2",
        )
        .bind(*product_id.as_uuid())
        .bind(position)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("apply_if_stock", e))?;

        match available {
            Some(available) => Ok(ReservationOutcome::InsufficientStock { available }),
            None => Err(StoreError::not_found(format!(
                "configuration {configuration_index} of product {product_id}"
            ))),
        }
    }

    #[instrument(skip(self), err)]
    async fn any_in_category(&self, category_id: CategoryId) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE category_id = $1)")
            .bind(*category_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("any_in_category", e))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCategoryStore {
    pool: Arc<PgPool>,
}

impl PostgresCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    let id: Uuid = decode("category_from_row", row.try_get("id"))?;
    let name: Json<LocalizedText> = decode("category_from_row", row.try_get("name"))?;
    Ok(Category {
        id: CategoryId::from_uuid(id),
        name: name.0,
    })
}

#[async_trait::async_trait]
impl CategoryStore for PostgresCategoryStore {
    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert(&self, category: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
            .bind(*category.id.as_uuid())
            .bind(Json(&category.name))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY created_at, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: CategoryId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch(&self, operation: &str, column: &str, id: Uuid) -> StoreResult<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT id, user_id, items, order_info, expires_at, last_update, version \
             FROM carts WHERE {column} = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(cart_from_row).transpose()
    }
}

fn cart_from_row(row: &PgRow) -> StoreResult<Cart> {
    let id: Uuid = decode("cart_from_row", row.try_get("id"))?;
    let user_id: Uuid = decode("cart_from_row", row.try_get("user_id"))?;
    let items: Json<BTreeMap<String, CartItem>> = decode("cart_from_row", row.try_get("items"))?;
    let order_info: Json<OrderInfo> = decode("cart_from_row", row.try_get("order_info"))?;
    let version: i64 = decode("cart_from_row", row.try_get("version"))?;
    Ok(Cart {
        id: CartId::from_uuid(id),
        user_id: UserId::from_uuid(user_id),
        items: items.0,
        order_info: order_info.0,
        expires_at: decode("cart_from_row", row.try_get("expires_at"))?,
        last_update: decode("cart_from_row", row.try_get("last_update"))?,
        version: version as u64,
    })
}

fn expected_param(expected: ExpectedVersion) -> Option<i64> {
    match expected {
        ExpectedVersion::Any => None,
        ExpectedVersion::Exact(v) => Some(v as i64),
    }
}

#[async_trait::async_trait]
impl CartStore for PostgresCartStore {
    #[instrument(skip(self, cart), fields(cart_id = %cart.id, user_id = %cart.user_id), err)]
    async fn insert(&self, cart: &Cart) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, items, order_info, expires_at, last_update, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*cart.id.as_uuid())
        .bind(*cart.user_id.as_uuid())
        .bind(Json(&cart.items))
        .bind(Json(&cart.order_info))
        .bind(cart.expires_at)
        .bind(cart.last_update)
        .bind(cart.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_cart", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: CartId) -> StoreResult<Option<Cart>> {
        self.fetch("get_cart", "id", *id.as_uuid()).await
    }

    #[instrument(skip(self), err)]
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        self.fetch("find_cart_by_user", "user_id", *user_id.as_uuid()).await
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id), err)]
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> StoreResult<u64> {
        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE carts
            SET items = $2, order_info = $3, expires_at = $4, last_update = $5,
                version = version + 1
            WHERE id = $1 AND ($6::BIGINT IS NULL OR version = $6)
            RETURNING version
            "#,
        )
        .bind(*cart.id.as_uuid())
        .bind(Json(&cart.items))
        .bind(Json(&cart.order_info))
        .bind(cart.expires_at)
        .bind(cart.last_update)
        .bind(expected_param(expected))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_cart", e))?;

        if let Some(version) = version {
            return Ok(version as u64);
        }
        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM carts WHERE id = $1")
            .bind(*cart.id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_cart", e))?;
        match actual {
            Some(actual) => Err(StoreError::VersionConflict(format!(
                "cart {} (expected: {expected:?}, actual: {actual})",
                cart.id
            ))),
            None => Err(StoreError::not_found(format!("cart {}", cart.id))),
        }
    }

    #[instrument(skip(self), err)]
    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Cart>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, items, order_info, expires_at, last_update, version
            FROM carts
            WHERE expires_at <= $1
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_expired_carts", e))?;
        rows.iter().map(cart_from_row).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let document: Json<Order> = decode("order_from_row", row.try_get("document"))?;
    Ok(document.0)
}

#[async_trait::async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn insert(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, creation_date, version, document)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*order.id_typed().as_uuid())
        .bind(*order.user_id().as_uuid())
        .bind(order.status())
        .bind(order.creation_date())
        .bind(order.version() as i64)
        .bind(Json(order))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn save(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()> {
        let id = order.id_typed();
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, version = $3, document = $4
            WHERE id = $1 AND ($5::BIGINT IS NULL OR version = $5)
            "#,
        )
        .bind(*id.as_uuid())
        .bind(order.status())
        .bind(order.version() as i64)
        .bind(Json(order))
        .bind(expected_param(expected))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_order", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_order", e))?;
        match actual {
            Some(actual) => Err(StoreError::VersionConflict(format!(
                "order {id} (expected: {expected:?}, actual: {actual})"
            ))),
            None => Err(StoreError::not_found(format!("order {id}"))),
        }
    }

    #[instrument(skip(self), err)]
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT document FROM orders WHERE user_id = $1 ORDER BY creation_date ASC, id ASC",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders_by_user", e))?;
        rows.iter().map(order_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_by_status(&self, status: &str) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT document FROM orders WHERE status = $1 ORDER BY creation_date ASC, id ASC",
        )
        .bind(status)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders_by_status", e))?;
        rows.iter().map(order_from_row).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresSettingsStore {
    pool: Arc<PgPool>,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl SettingsStore for PostgresSettingsStore {
    #[instrument(skip(self), err)]
    async fn get(&self, key: &str) -> StoreResult<Option<JsonValue>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_setting", e))
    }

    #[instrument(skip(self, value), err)]
    async fn put(&self, key: &str, value: JsonValue) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_setting", e))?;
        Ok(())
    }
}
