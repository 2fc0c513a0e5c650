//! Argument checks shared by every operation that talks to the store.

use crate::error::ValidationError;

/// Reject empty or whitespace-only required string arguments.
pub fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Reject a size below `min` (chunk sizes, page sizes).
pub fn require_at_least(value: usize, min: usize, field: &'static str) -> Result<(), ValidationError> {
    if value < min {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            got: value,
        });
    }
    Ok(())
}

/// True when a revision string carries no usable token.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
