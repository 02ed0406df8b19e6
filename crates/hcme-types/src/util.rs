/// Truncate a string to a maximum number of characters, for display contexts
/// (context formatting, log previews) where byte length would split UTF-8.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "...(truncated)"
    }
}
