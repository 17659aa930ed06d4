//! Input text cleanup: whitespace normalization and character-budget helpers.

use claimlens_common::ClaimLensError;

/// Collapse intra-line whitespace, preserve paragraph breaks, drop empty
/// lines. Fails when the input is empty or becomes empty after cleaning.
pub fn normalize(text: &str) -> Result<String, ClaimLensError> {
    if text.trim().is_empty() {
        return Err(ClaimLensError::Validation(
            "input text is empty".to_string(),
        ));
    }

    let cleaned: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(ClaimLensError::Validation(
            "text is empty after cleaning".to_string(),
        ));
    }

    Ok(cleaned.join("\n"))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncate to at most `max` characters (not bytes), on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Truncate to `max` characters, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut = truncate_chars(text, max);
        cut.push_str("...");
        cut
    }
}
