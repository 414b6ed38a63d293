//! Line-aware splitting of roster text into Discord-sized messages.

/// Discord's per-message content limit, counted in characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split text into chunks of at most `limit` characters without
/// breaking mid-line.
///
/// A single line that exceeds `limit` on its own is hard-truncated to
/// fit; that is the only case where content is lost. Chunks are trimmed
/// of trailing whitespace and blank chunks are never emitted, so empty
/// input yields an empty vec.
pub fn split_text_lines(text: &str, limit: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for line in text.lines() {
        let mut add: String = line.to_string();
        add.push('\n');
        let mut add_chars = add.chars().count();

        if add_chars > limit {
            add = add.chars().take(limit.saturating_sub(1)).collect();
            add.push('\n');
            add_chars = add.chars().count();
        }

        if buffer_chars + add_chars > limit {
            if !buffer.trim().is_empty() {
                chunks.push(buffer.trim_end().to_string());
            }
            buffer = add;
            buffer_chars = add_chars;
        } else {
            buffer.push_str(&add);
            buffer_chars += add_chars;
        }
    }

    if !buffer.trim().is_empty() {
        chunks.push(buffer.trim_end().to_string());
    }

    chunks
}
