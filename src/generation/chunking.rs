//! Splitting long plans into message-sized pieces.

/// Largest chunk a channel is handed, in characters.
pub const MAX_CHUNK_CHARS: usize = 4000;

/// Split `text` into ordered, non-overlapping chunks of at most `max_chars`
/// characters. Concatenating the chunks yields `text` exactly.
///
/// Counts `char`s, not bytes, so a multi-byte character is never cut.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
