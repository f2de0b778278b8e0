//! Validation of service ids and configurator references.
//!
//! Runs eagerly, when a definition is registered or built, so that
//! malformed wiring is reported at the call that introduced it.

use rivet_common::constants::{REFERENCE_SIGIL, SELF_REFERENCE};
use rivet_common::error::{RivetError, Result};

/// Validates an id passed to `register`.
///
/// # Checks performed
///
/// 1. The id is not empty.
/// 2. The id is not the reserved self-reference word.
///
/// # Errors
///
/// Returns a configuration error if any check fails.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(RivetError::configuration(
            "the service id must be a non-empty string",
        ));
    }
    if id == SELF_REFERENCE {
        return Err(RivetError::configuration(format!(
            "<{SELF_REFERENCE}> is a reserved keyword"
        )));
    }
    Ok(())
}

/// Validates a configurator target such as `"@registry"` and returns its key.
///
/// # Errors
///
/// Returns a configuration error if the reference lacks the sigil, names
/// nothing, or names the container itself.
pub fn validate_reference(reference: &str) -> Result<&str> {
    let key = reference
        .strip_prefix(REFERENCE_SIGIL)
        .ok_or_else(|| invalid_reference(reference))?;
    if key.is_empty() || key == SELF_REFERENCE {
        return Err(invalid_reference(reference));
    }
    Ok(key)
}

/// Validates a method name used for named dispatch.
///
/// # Errors
///
/// Returns a configuration error if the name is empty.
pub fn validate_method_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RivetError::configuration(format!(
            "invalid callable <{name}>"
        )));
    }
    Ok(())
}

fn invalid_reference(reference: &str) -> RivetError {
    RivetError::configuration(format!("invalid reference <{reference}>"))
}
