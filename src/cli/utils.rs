//! Shared CLI utilities.

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Split a command setting such as `accelerate launch` into program words.
pub fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
