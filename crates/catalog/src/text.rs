use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Translatable text keyed by language code.
///
/// The default language is the one used for slug derivation and as the
/// fallback when a translation is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    default_language: String,
    translations: BTreeMap<String, String>,
}

impl LocalizedText {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        let language = language.into();
        let mut translations = BTreeMap::new();
        translations.insert(language.clone(), text.into());
        Self {
            default_language: language,
            translations,
        }
    }

    pub fn with(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.translations.insert(language.into(), text.into());
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn default_text(&self) -> &str {
        self.translations
            .get(&self.default_language)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Text for `language`, falling back to the default language.
    pub fn get(&self, language: &str) -> &str {
        self.translations
            .get(language)
            .map(String::as_str)
            .unwrap_or_else(|| self.default_text())
    }

    pub fn translations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.translations
            .iter()
            .map(|(lang, text)| (lang.as_str(), text.as_str()))
    }

    pub fn is_blank(&self) -> bool {
        self.translations.values().all(|t| t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_translation_falls_back_to_default() {
        let text = LocalizedText::new("en", "Coffee").with("it", "Caffè");
        assert_eq!(text.get("it"), "Caffè");
        assert_eq!(text.get("de"), "Coffee");
        assert_eq!(text.default_text(), "Coffee");
    }
}
