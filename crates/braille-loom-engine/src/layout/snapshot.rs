use crate::document::NodeId;

use super::builder::{LINE_SEPARATOR, LayoutBuilder};
use super::line::Segment;

/// Emphasis range resolved to absolute buffer char offsets, for style-range
/// painting in the text widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmphasisRange {
    pub node: NodeId,
    pub start: usize,
    pub length: usize,
}

/// A page boundary in the flat buffer, for page-indicator overlay painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStart {
    pub node: NodeId,
    /// Char offset of the first line of this page.
    pub offset: usize,
}

/// Immutable read views derived from the layout builder's line buffer.
///
/// The GUI layer renders `text` into the widget and paints overlays from the
/// metadata; it never touches the line buffer itself. Rebuilt from scratch
/// on every reformat pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSnapshot {
    /// Lines joined with [`LINE_SEPARATOR`]. Pending spaces are not
    /// materialized, so padded trailing lines stay visually blank.
    pub text: String,
    pub emphasis: Vec<EmphasisRange>,
    pub page_starts: Vec<PageStart>,
    /// Per-line painted left margin in cells.
    pub line_indents: Vec<usize>,
}

impl LayoutSnapshot {
    /// Single join pass over the segments: records each line's start offset
    /// and resolves its emphasis spans against it as it goes.
    pub(crate) fn build(builder: &LayoutBuilder) -> Self {
        let mut text = String::new();
        let mut emphasis = Vec::new();
        let mut page_starts = Vec::new();
        let mut line_indents = Vec::new();
        let mut offset = 0;
        let mut lines_emitted = 0usize;

        for segment in builder.segments() {
            match segment {
                Segment::PageBreak(node) => {
                    let page_offset = if lines_emitted == 0 { 0 } else { offset + 1 };
                    page_starts.push(PageStart {
                        node: *node,
                        offset: page_offset,
                    });
                }
                Segment::Line(line) => {
                    if lines_emitted > 0 {
                        text.push(LINE_SEPARATOR);
                        offset += 1;
                    }
                    let line_start = offset;
                    for span in &line.emphasis {
                        emphasis.push(EmphasisRange {
                            node: span.node,
                            start: line_start + span.start,
                            length: span.end - span.start,
                        });
                    }
                    text.push_str(&line.text);
                    offset += line.char_len();
                    line_indents.push(line.starting_hpos.unwrap_or(0));
                    lines_emitted += 1;
                }
            }
        }

        Self {
            text,
            emphasis,
            page_starts,
            line_indents,
        }
    }

    /// Char length of the flat buffer.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageGeometry;
    use crate::layout::LayoutInstruction;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_matches_builder_char_count() {
        let mut builder = LayoutBuilder::new(PageGeometry::new(40, 4));
        for instruction in [
            LayoutInstruction::NewPage(NodeId(1)),
            LayoutInstruction::AddText("first".into()),
            LayoutInstruction::MoveTo { h: 0, v: 1 },
            LayoutInstruction::AddText("second".into()),
        ] {
            builder.apply(instruction);
        }
        builder.finish_page();

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.char_len(), builder.char_count());
        assert_eq!(snapshot.line_indents.len(), 4);
    }

    #[test]
    fn test_emphasis_resolved_within_single_line() {
        let mut builder = LayoutBuilder::new(PageGeometry::new(40, 2));
        builder.apply(LayoutInstruction::NewPage(NodeId(1)));
        builder.apply(LayoutInstruction::AddText("one ".into()));
        builder.apply(LayoutInstruction::MoveTo { h: 0, v: 1 });
        builder.apply(LayoutInstruction::ApplyEmphasis(NodeId(9)));
        builder.apply(LayoutInstruction::AddText("two".into()));

        let snapshot = builder.snapshot();
        let range = &snapshot.emphasis[0];
        assert_eq!(range.start, 5);
        assert_eq!(range.length, 3);

        // Containment: the span lies entirely within one line's text.
        let line_start = snapshot.text[..range.start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = snapshot.text[range.start..]
            .find('\n')
            .map_or(snapshot.text.len(), |i| range.start + i);
        assert!(line_start <= range.start && range.start + range.length <= line_end);
    }
}
