/// Longest free-text excerpt kept on an event, in characters.
pub const EXCERPT_LIMIT: usize = 200;

/// Truncate `text` to `limit` characters, appending `…` when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_owned(),
    }
}

/// Trimmed excerpt of a free-text body.
pub fn excerpt(text: &str) -> String {
    truncate_chars(text.trim(), EXCERPT_LIMIT)
}

/// First line of a commit message.
pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim_end()
}
