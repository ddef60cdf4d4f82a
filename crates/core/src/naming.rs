//! Name and identifier rules for registry entities.
//!
//! Active names are unique per entity kind under PostgreSQL's
//! `lower(btrim(name))`. The comparison itself runs in SQL; this module only
//! shapes and bounds the input.

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of an entity name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 120;

/// Validate a caller-supplied name and return its trimmed form.
pub fn validate_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument(
            "Name must not be empty".to_string(),
        ));
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(CoreError::InvalidArgument(format!(
            "Name is {len} characters long; the maximum is {MAX_NAME_LEN}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Reject identifiers that can never name a row.
pub fn validate_id(what: &str, id: DbId) -> Result<(), CoreError> {
    if id <= 0 {
        return Err(CoreError::InvalidArgument(format!(
            "{what} id must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Validate every identifier in a list.
pub fn validate_ids(what: &str, ids: &[DbId]) -> Result<(), CoreError> {
    ids.iter().try_for_each(|&id| validate_id(what, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_name_returns_trimmed() {
        assert_eq!(validate_name("  Core  ").unwrap(), "Core");
    }

    #[test]
    fn rejects_blank_name() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&long).is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn rejects_non_positive_ids() {
        assert!(validate_id("Category", 0).is_err());
        assert!(validate_id("Category", -5).is_err());
        assert!(validate_id("Category", 1).is_ok());
        assert!(validate_ids("Workout", &[1, 2, 0]).is_err());
        assert!(validate_ids("Workout", &[]).is_ok());
    }
}
