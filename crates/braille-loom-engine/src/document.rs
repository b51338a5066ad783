use std::borrow::Cow;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::Rope;

/// Opaque identifier for a node in the (external) document model.
///
/// The layout core never inspects document nodes; it only carries their
/// identities through offset maps, emphasis ranges and page markers so the
/// editing layer can route caret and paint events back to the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Print text of the section currently being laid out.
///
/// The document model proper lives outside this crate; mapped elements hold
/// byte ranges into this buffer and the renderer slices it when feeding text
/// to the layout builder. Stored as a rope so large sections slice cheaply.
pub struct SourceDocument {
    buffer: Rope,
}

impl SourceDocument {
    pub fn from_str(text: &str) -> Self {
        Self {
            buffer: Rope::from(text),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Slice a byte range out of the print text.
    pub fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        self.buffer.slice_to_cow(range)
    }
}

/// Character count of a string (buffer offsets are char based, not byte based).
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice `[start, end)` of a string by char offsets.
///
/// Braille text is multi-byte UTF-8 (U+2800 block), so byte slicing would
/// split code points. `end` is clamped to the string's char length.
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let mut indices = s.char_indices().map(|(i, _)| i);
    let byte_start = indices.nth(start).unwrap_or(s.len());
    let byte_end = if end > start {
        s[byte_start..]
            .char_indices()
            .map(|(i, _)| byte_start + i)
            .nth(end - start)
            .unwrap_or(s.len())
    } else {
        byte_start
    };
    &s[byte_start..byte_end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_slice_ascii() {
        assert_eq!(char_slice("hello world", 6, 11), "world");
        assert_eq!(char_slice("hello", 0, 0), "");
        assert_eq!(char_slice("hello", 2, 99), "llo");
    }

    #[test]
    fn test_char_slice_braille_cells() {
        // Each braille cell is 3 bytes in UTF-8; offsets must count chars.
        let cells = "⠓⠑⠇⠇⠕";
        assert_eq!(char_slice(cells, 1, 3), "⠑⠇");
        assert_eq!(char_len(cells), 5);
    }

    #[test]
    fn test_source_document_slices_byte_ranges() {
        let doc = SourceDocument::from_str("The quick brown fox");
        assert_eq!(doc.slice(4..9), "quick");
        assert_eq!(doc.len(), 19);
    }
}
