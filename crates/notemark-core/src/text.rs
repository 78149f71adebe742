//! Char-offset helpers over `&str`.

/// Byte index of the `char_idx`-th char, clamped to `text.len()`.
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Number of chars in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Sub-slice by char offsets, clamped to the text.
pub fn slice_chars(text: &str, from: usize, to: usize) -> &str {
    let start = char_to_byte(text, from);
    let end = char_to_byte(text, to.max(from));
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_chars() {
        assert_eq!(slice_chars("héllo", 1, 3), "él");
        assert_eq!(slice_chars("abc", 2, 10), "c");
        assert_eq!(slice_chars("abc", 5, 6), "");
        assert_eq!(char_to_byte("é", 1), 2);
        assert_eq!(char_len("日本"), 2);
    }
}
