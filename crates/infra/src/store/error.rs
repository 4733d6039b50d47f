use thiserror::Error;

/// Unique constraints the stores enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Id,
    Slug,
    Sku,
    CartUser,
}

impl core::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            UniqueKey::Id => "id",
            UniqueKey::Slug => "slug",
            UniqueKey::Sku => "sku",
            UniqueKey::CartUser => "cart user",
        };
        f.write_str(name)
    }
}

/// Storage error shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate {key}: {detail}")]
    Duplicate { key: UniqueKey, detail: String },

    #[error("optimistic concurrency check failed: {0}")]
    VersionConflict(String),

    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(key: UniqueKey, detail: impl Into<String>) -> Self {
        Self::Duplicate {
            key,
            detail: detail.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_duplicate(&self, key: UniqueKey) -> bool {
        matches!(self, StoreError::Duplicate { key: k, .. } if *k == key)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}
