use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult};

use crate::text::LocalizedText;

/// Product category. Products point at categories by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: LocalizedText,
}

impl Category {
    pub fn new(id: CategoryId, name: LocalizedText) -> DomainResult<Self> {
        if name.is_blank() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        Ok(Self { id, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        assert!(Category::new(CategoryId::new(), LocalizedText::new("en", "  ")).is_err());
        assert!(Category::new(CategoryId::new(), LocalizedText::new("en", "Tea")).is_ok());
    }
}
