//! Text helpers shared across the crate.

/// Truncate text to a maximum character count, adding ellipsis if needed.
///
/// Uses Unicode-aware character counting to handle multi-byte characters correctly.
/// Trims whitespace from input and from truncated output before adding ellipsis.
///
/// # Examples
///
/// ```
/// use krishi_core::truncate;
///
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("short", 10), "short");
/// ```
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Split text into word-sized chunks, each keeping its trailing whitespace.
///
/// Concatenating the chunks reproduces the input exactly; leading
/// whitespace is attached to the first chunk.
///
/// ```
/// use krishi_core::word_chunks;
///
/// let chunks = word_chunks("It is  sunny.\n");
/// assert_eq!(chunks, vec!["It ", "is  ", "sunny.\n"]);
/// assert_eq!(chunks.concat(), "It is  sunny.\n");
/// ```
pub fn word_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut in_space = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_space = true;
        } else if in_space {
            if text[start..i].chars().any(|c| !c.is_whitespace()) {
                chunks.push(&text[start..i]);
                start = i;
            }
            in_space = false;
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("  padded  ", 10), "padded");
        assert_eq!(truncate("मौसम अच्छा है", 7), "मौसम...");
    }

    #[rstest]
    #[case::simple("The answer is 110.", &["The ", "answer ", "is ", "110."])]
    #[case::leading_space("  hi there", &["  hi ", "there"])]
    #[case::newlines("Line one\n\nLine two\n", &["Line ", "one\n\n", "Line ", "two\n"])]
    #[case::single("word", &["word"])]
    #[case::whitespace_only("   ", &["   "])]
    #[case::empty("", &[])]
    #[case::unicode("आज धूप है।", &["आज ", "धूप ", "है।"])]
    fn test_word_chunks(#[case] text: &str, #[case] expected: &[&str]) {
        let chunks = word_chunks(text);
        assert_eq!(chunks, expected);
        assert_eq!(chunks.concat(), text);
    }
}
