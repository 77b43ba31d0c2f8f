//! Text clean-up applied before anything is sent to a backend.

use crate::SentimentError;

const TRUNCATION_MARKER: &str = "...";

/// Trim and collapse every whitespace run (newlines and tabs included) to a
/// single space.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters and append `...`.
///
/// The cut lands on the last space inside the limit when that space sits past
/// the halfway point; otherwise it is a hard cut. Text within the limit is
/// returned unchanged.
#[must_use]
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let Some((byte_end, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let head = &text[..byte_end];
    let cut = match head.rfind(' ') {
        Some(space) if head[..space].chars().count() > max_chars / 2 => &head[..space],
        _ => head,
    };

    format!("{cut}{TRUNCATION_MARKER}")
}

/// Clean and bound text for classification.
///
/// # Errors
///
/// Returns [`SentimentError::InvalidInput`] if nothing is left after cleaning.
pub fn prepare(text: &str, max_chars: usize) -> Result<String, SentimentError> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Err(SentimentError::InvalidInput(
            "text is empty after whitespace normalization".to_string(),
        ));
    }
    Ok(truncate_at_word(&cleaned, max_chars))
}
