//! Reading time estimate

/// Average reading speed used for estimates
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace-separated words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated minutes to read `words` words, never less than one
pub fn reading_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}
