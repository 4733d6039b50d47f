//! Infrastructure layer: store backends and configuration.

pub mod config;
pub mod store;

pub use config::{ConfigError, StorefrontConfig};
pub use store::{
    CartStore, CategoryStore, OrderStore, ProductStore, SettingsStore, StoreError, StoreResult,
    UniqueKey,
};
