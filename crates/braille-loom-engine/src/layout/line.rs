use crate::document::{NodeId, char_len};

/// Emphasis range relative to one logical line's text.
///
/// Resolved to absolute buffer offsets when the snapshot is taken, once every
/// line's start offset is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmphasisSpan {
    pub node: NodeId,
    /// Char offset within the line where the emphasis opens.
    pub start: usize,
    /// Char offset within the line where it closes (exclusive).
    pub end: usize,
}

/// One logical line of the rendered page.
///
/// Created lazily the first time its vertical position is visited. Pending
/// spaces are horizontal padding owed from a cursor move; they are only
/// materialized into `text` when more text actually arrives, so that padding
/// before a page break never shows up as trailing blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Left margin in cells, painted by the widget rather than as spaces.
    /// `None` until the line's first move or append establishes one.
    pub starting_hpos: Option<usize>,
    /// Page-relative vertical position.
    pub vpos: usize,
    pub text: String,
    pub pending_spaces: usize,
    pub emphasis: Vec<EmphasisSpan>,
}

impl LogicalLine {
    pub fn blank(vpos: usize) -> Self {
        Self {
            starting_hpos: None,
            vpos,
            text: String::new(),
            pending_spaces: 0,
            emphasis: Vec::new(),
        }
    }

    /// Char length of the materialized text (pending spaces excluded).
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    /// Turn owed padding into real spaces. Called right before an append.
    pub fn materialize_pending(&mut self) {
        for _ in 0..self.pending_spaces {
            self.text.push(' ');
        }
        self.pending_spaces = 0;
    }
}

/// Entry in the line buffer: either a logical line or a page boundary.
///
/// Page markers are zero-width; their buffer offset is derived during the
/// snapshot join, at the start of the following line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Line(LogicalLine),
    PageBreak(NodeId),
}

impl Segment {
    pub fn as_line(&self) -> Option<&LogicalLine> {
        match self {
            Segment::Line(line) => Some(line),
            Segment::PageBreak(_) => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LogicalLine> {
        match self {
            Segment::Line(line) => Some(line),
            Segment::PageBreak(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_spaces_materialize_once() {
        let mut line = LogicalLine::blank(0);
        line.text.push_str("ab");
        line.pending_spaces = 3;
        assert_eq!(line.char_len(), 2);

        line.materialize_pending();
        assert_eq!(line.text, "ab   ");
        assert_eq!(line.pending_spaces, 0);
    }
}
