//! Reserved words and syntax characters of the parameter language.

/// Prefix marking a parameter as a reference to another service.
pub const REFERENCE_SIGIL: char = '@';

/// Reserved reference key that resolves to the container itself.
///
/// It can never be used as a service id.
pub const SELF_REFERENCE: &str = "container";

/// Delimiter surrounding a placeholder name, as in `%name%`.
pub const PLACEHOLDER_DELIMITER: char = '%';

/// Returns whether `c` may appear in a placeholder name (`[a-zA-Z_-]`).
#[must_use]
pub const fn is_placeholder_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-'
}
