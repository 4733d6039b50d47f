use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;

use storefront_auth::InMemoryDirectory;
use storefront_core::SystemClock;
use storefront_infra::StorefrontConfig;
use storefront_infra::store::run_migrations;
use storefront_shop::{ShopManager, Stores};

/// Print the carts that are past their expiry as a JSON document, for an
/// external reaper to release.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = StorefrontConfig::from_env().context("invalid storefront configuration")?;

    let stores = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            run_migrations(&pool).await?;
            tracing::info!("using Postgres stores");
            Stores::postgres(pool)
        }
        None => {
            tracing::info!("using in-memory stores");
            Stores::in_memory()
        }
    };

    let shop = ShopManager::new(
        &config,
        stores,
        Arc::new(InMemoryDirectory::new()),
        Arc::new(SystemClock),
    )
    .await?;

    let expired = shop.carts().list_expired_carts().await?;
    tracing::info!(count = expired.len(), "expired carts listed");

    let report = json!({
        "cart_ttl_secs": config.cart_ttl.num_seconds(),
        "expired": expired
            .iter()
            .map(|cart| json!({
                "id": cart.id,
                "user_id": cart.user_id,
                "expires_at": cart.expires_at,
                "items": cart.items.iter().map(|(sku, item)| json!({
                    "sku": sku,
                    "product_id": item.product_id,
                    "configuration_index": item.configuration_index,
                    "qty": item.qty,
                })).collect::<Vec<_>>(),
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
