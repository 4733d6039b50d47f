//! Admission control for cart mutations.
//!
//! The gate is consulted on every cart operation; a locked gate rejects the
//! call with [`ShopError::CartLocked`] before any data is read or written.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value as JsonValue;

use storefront_infra::SettingsStore;

use crate::error::ShopResult;

/// Settings key holding the persisted lock flag.
pub const CART_LOCKED_SETTING: &str = "cart_locked";

#[async_trait::async_trait]
pub trait CartGate: Send + Sync {
    async fn is_locked(&self) -> ShopResult<bool>;
}

/// Process-local on/off switch.
#[derive(Debug, Default)]
pub struct SwitchGate {
    locked: AtomicBool,
}

impl SwitchGate {
    pub fn new(locked: bool) -> Self {
        Self {
            locked: AtomicBool::new(locked),
        }
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CartGate for SwitchGate {
    async fn is_locked(&self) -> ShopResult<bool> {
        Ok(self.locked.load(Ordering::SeqCst))
    }
}

/// Gate backed by the `cart_locked` setting, shared by every process using
/// the same store.
pub struct SettingGate {
    settings: Arc<dyn SettingsStore>,
}

impl SettingGate {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn set_locked(&self, locked: bool) -> ShopResult<()> {
        self.settings
            .put(CART_LOCKED_SETTING, JsonValue::Bool(locked))
            .await?;
        tracing::info!(locked, "cart lock updated");
        Ok(())
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

#[async_trait::async_trait]
impl CartGate for SettingGate {
    async fn is_locked(&self) -> ShopResult<bool> {
        let value = self.settings.get(CART_LOCKED_SETTING).await?;
        Ok(value.as_ref().is_some_and(truthy))
    }
}
