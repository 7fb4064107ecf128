//! Variant name validation
//!
//! A variant name doubles as its directory name inside the workspace, so it is
//! restricted to a portable subset of characters.

use crate::error::WorkflowError;
use thiserror::Error;

/// Errors that can occur during variant name validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VariantNameError {
    #[error("Variant name is empty")]
    Empty,

    #[error("Variant name is too long (max 64 characters)")]
    TooLong,

    #[error("Variant name must start with a letter or number")]
    InvalidStart,

    #[error("Variant name contains invalid characters (only letters, numbers, hyphens, and underscores allowed)")]
    InvalidCharacters,

    #[error("Variant name is reserved: {0}")]
    ReservedName(String),
}

/// Device names that cannot be used as directory names on Windows
const RESERVED_NAMES: &[&str] = &["con", "prn", "aux", "nul"];

/// Validate a variant name according to the naming convention
pub fn validate_variant_name(name: &str) -> Result<(), VariantNameError> {
    let Some(first_char) = name.chars().next() else {
        return Err(VariantNameError::Empty);
    };

    if name.len() > 64 {
        return Err(VariantNameError::TooLong);
    }

    if !first_char.is_ascii_alphanumeric() {
        return Err(VariantNameError::InvalidStart);
    }

    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(VariantNameError::ReservedName(name.to_string()));
    }

    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(VariantNameError::InvalidCharacters);
    }

    Ok(())
}

/// Check if a variant name is valid (convenience function)
pub fn is_valid_variant_name(name: &str) -> bool {
    validate_variant_name(name).is_ok()
}

/// Validate a variant name, mapping failures into the workflow error type
pub fn ensure_variant_name(name: &str) -> Result<(), WorkflowError> {
    validate_variant_name(name).map_err(|err| WorkflowError::InvalidVariantName {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_variant_names() {
        assert!(is_valid_variant_name("v1"));
        assert!(is_valid_variant_name("saas-for-dentists"));
        assert!(is_valid_variant_name("B2B_marketplace"));
        assert!(is_valid_variant_name("a"));
    }

    #[test]
    fn test_invalid_variant_names() {
        assert!(!is_valid_variant_name(""));
        assert!(!is_valid_variant_name("-leading-dash"));
        assert!(!is_valid_variant_name("_leading_underscore"));
        assert!(!is_valid_variant_name("has space"));
        assert!(!is_valid_variant_name("../escape"));
        assert!(!is_valid_variant_name("dir/child"));
        assert!(!is_valid_variant_name("NUL"));
        assert!(!is_valid_variant_name(&"a".repeat(65)));
    }

    #[test]
    fn test_validation_error_kinds() {
        assert_eq!(validate_variant_name(""), Err(VariantNameError::Empty));
        assert_eq!(
            validate_variant_name("-x"),
            Err(VariantNameError::InvalidStart)
        );
        assert_eq!(
            validate_variant_name("con"),
            Err(VariantNameError::ReservedName("con".to_string()))
        );
        assert_eq!(
            validate_variant_name("a.b"),
            Err(VariantNameError::InvalidCharacters)
        );
    }

    #[test]
    fn test_ensure_variant_name_reports_reason() {
        let err = ensure_variant_name("bad name").unwrap_err();
        assert!(err.to_string().contains("invalid characters"));
    }
}
