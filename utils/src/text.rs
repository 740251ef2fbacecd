/// Truncates to at most `max_bytes` bytes without splitting a multi-byte
/// UTF-8 sequence. The result is always valid UTF-8 and `<= max_bytes` long.
pub fn truncate_utf8(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_untouched() {
        assert_eq!(truncate_utf8("gm", 255), "gm");
        assert_eq!(truncate_utf8("", 0), "");
    }

    #[test]
    fn test_ascii_truncation() {
        assert_eq!(truncate_utf8("hello world", 5), "hello");
    }

    #[test]
    fn test_never_splits_multibyte_sequences() {
        // "⚡" is 3 bytes, "🤙" is 4 bytes.
        let comment = "⚡🤙⚡";
        for max in 0..=comment.len() {
            let truncated = truncate_utf8(comment, max);
            assert!(truncated.len() <= max);
            assert!(comment.starts_with(truncated));
            assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
        }
        assert_eq!(truncate_utf8(comment, 4), "⚡");
        assert_eq!(truncate_utf8(comment, 7), "⚡🤙");
    }

    #[test]
    fn test_zero_budget_yields_empty() {
        assert_eq!(truncate_utf8("note", 0), "");
    }
}
