//! Byte to char offset conversion for parser output.

/// Converts byte offsets of one string into char offsets.
pub struct OffsetMap {
    /// Byte index of every char start; empty when the text is ASCII.
    char_starts: Vec<usize>,
    ascii: bool,
}

impl OffsetMap {
    /// Build the map for `text`.
    pub fn new(text: &str) -> Self {
        if text.is_ascii() {
            return Self {
                char_starts: Vec::new(),
                ascii: true,
            };
        }
        Self {
            char_starts: text.char_indices().map(|(i, _)| i).collect(),
            ascii: false,
        }
    }

    /// Char offset of `byte`. Offsets inside a multi-byte char round up to the next char.
    pub fn char_offset(&self, byte: usize) -> usize {
        if self.ascii {
            return byte;
        }
        self.char_starts.partition_point(|&start| start < byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_identity() {
        let map = OffsetMap::new("**bold**");
        assert_eq!(map.char_offset(6), 6);
    }

    #[test]
    fn test_multibyte() {
        let text = "é==ü==";
        let map = OffsetMap::new(text);
        assert_eq!(map.char_offset(0), 0);
        assert_eq!(map.char_offset(2), 1);
        assert_eq!(map.char_offset(4), 3);
        assert_eq!(map.char_offset(text.len()), 6);
    }
}
