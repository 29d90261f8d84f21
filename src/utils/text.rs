//! Text helpers for prompt assembly.

/// Truncate `text` to at most `max_chars` characters, appending a marker when
/// anything was cut. Counts chars, not bytes, so multi-byte text is never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let omitted = text[byte_idx..].chars().count();
            format!("{}\n... [truncated {} chars]", &text[..byte_idx], omitted)
        }
    }
}
