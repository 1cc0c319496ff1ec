//! Input sanitization for search parameters

/// Separator used by multi-value parameters
pub const LIST_SEPARATOR: char = ',';

/// Returns true for characters allowed in parameter keys and values
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == LIST_SEPARATOR
}

/// Removes every character outside `[A-Za-z0-9_,-]`
pub fn sanitize(input: &str) -> String {
    input.chars().filter(|c| is_allowed_char(*c)).collect()
}

/// Splits a sanitized list value into its non-empty items
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}
