//! Search term validation

/// Default upper bound on search term length, in characters
pub const DEFAULT_MAX_SEARCH_LENGTH: usize = 100;

/// Check that a search term looks like plain user input
///
/// Rejects terms longer than `max_len` characters and terms containing
/// control characters or angle brackets.
pub fn is_safe_search_term(term: &str, max_len: usize) -> bool {
    if term.chars().count() > max_len {
        return false;
    }
    !term.chars().any(|c| c.is_control() || c == '<' || c == '>')
}
