//! Split generated text into transport-sized messages along paragraph breaks.

/// Separator between paragraphs.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split `text` into an ordered, non-empty list of chunks of at most
/// `max_len` characters.
///
/// Paragraphs are packed greedily: the next paragraph joins the current chunk
/// while `current + separator + next` fits, otherwise it starts a new chunk.
/// Paragraphs are never cut, so a single paragraph longer than `max_len`
/// becomes one oversized chunk. Each chunk is trimmed.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let separator_len = PARAGRAPH_SEPARATOR.chars().count();
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in text.trim().split(PARAGRAPH_SEPARATOR) {
        let paragraph_len = paragraph.chars().count();

        if current_len > 0 && current_len + separator_len + paragraph_len > max_len {
            chunks.push(current.trim().to_string());
            current.clear();
            current_len = 0;
        }

        if current_len > 0 {
            current.push_str(PARAGRAPH_SEPARATOR);
            current_len += separator_len;
        }
        current.push_str(paragraph);
        current_len += paragraph_len;
    }

    if current_len > 0 || chunks.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}
