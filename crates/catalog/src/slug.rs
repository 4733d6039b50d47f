//! Slug derivation for products.
//!
//! Slugs only need to be stable and collision-detectable here: two names that
//! differ only in case, punctuation or spacing normalize to the same slug.

use storefront_core::DomainError;

/// Derive the unique slug of a product from its type and default-language name.
pub fn slugify(product_type: &str, name: &str) -> Result<String, DomainError> {
    let name_part = normalize(name);
    if name_part.is_empty() {
        return Err(DomainError::validation(format!(
            "name {name:?} produces an empty slug"
        )));
    }
    let type_part = normalize(product_type);
    if type_part.is_empty() {
        Ok(name_part)
    } else {
        Ok(format!("{type_part}-{name_part}"))
    }
}

fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn case_and_punctuation_collapse() {
        assert_eq!(
            slugify("book", "The Rust  Book!").unwrap(),
            slugify("Book", "the rust-book").unwrap()
        );
        assert_eq!(slugify("book", "The Rust Book").unwrap(), "book-the-rust-book");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            slugify("book", " ?! "),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn ascii_slugs_use_only_lowercase_alphanumerics_and_single_dashes(
            product_type in "[A-Za-z ]{0,12}",
            name in "[A-Za-z0-9][A-Za-z0-9 _.!-]{0,40}"
        ) {
            let slug = slugify(&product_type, &name).unwrap();
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
