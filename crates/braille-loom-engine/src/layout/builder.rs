use crate::document::{NodeId, char_len};
use crate::geometry::PageGeometry;

use super::LayoutInstruction;
use super::cursor::Cursor;
use super::line::{EmphasisSpan, LogicalLine, Segment};

/// Separator between logical lines in the flat buffer.
pub const LINE_SEPARATOR: char = '\n';

/// Whether incoming text and moves are rendered at all.
///
/// Content before the first explicit page break or after the designated last
/// page is suppressed from the visible buffer; the renderer still books its
/// character count against the owning element so the transcriber can later
/// scroll to reveal the adjacent section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    BeforeFirstPage,
    InPage,
    AfterLastPage,
}

/// Result of feeding text to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Visible {
        /// Absolute char offset where the appended text begins.
        start: usize,
        /// Char length of the appended text.
        len: usize,
        /// Set when the append landed on a non-final line (table mode):
        /// previously assigned offsets at or past `at` moved up by `amount`,
        /// including any pending spaces materialized by this append.
        shift: Option<Shift>,
    },
    Suppressed {
        len: usize,
    },
}

/// An insertion into the middle of the buffer: offsets `>= at` grew by `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub at: usize,
    pub amount: usize,
}

/// The layout state machine.
///
/// Consumes [`LayoutInstruction`]s (or the equivalent direct calls made by
/// the element renderer) and accumulates the line buffer. Derived views
/// (`char_count`, `char_count_to_vpos`, [`snapshot`](Self::snapshot)) are
/// pure functions over that buffer and are safe to call mid-stream.
pub struct LayoutBuilder {
    geometry: PageGeometry,
    segments: Vec<Segment>,
    cursor: Cursor,
    state: PageState,
    table_mode: bool,
    line_indent_mode: bool,
    line_number_pending: bool,
    staged_emphasis: Option<NodeId>,
    /// Render at most this many pages; later content is suppressed.
    page_limit: Option<usize>,
    pages_seen: usize,
}

impl LayoutBuilder {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            segments: Vec::new(),
            cursor: Cursor::new(),
            state: PageState::BeforeFirstPage,
            table_mode: false,
            line_indent_mode: false,
            line_number_pending: false,
            staged_emphasis: None,
            page_limit: None,
            pages_seen: 0,
        }
    }

    pub fn with_page_limit(geometry: PageGeometry, limit: usize) -> Self {
        let mut builder = Self::new(geometry);
        builder.page_limit = Some(limit);
        builder
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn table_mode(&self) -> bool {
        self.table_mode
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Apply one instruction from the translation engine.
    pub fn apply(&mut self, instruction: LayoutInstruction) {
        match instruction {
            LayoutInstruction::MoveTo { h, v } => {
                self.move_to(h, v);
            }
            LayoutInstruction::AddText(text) => {
                self.add_to_line(&text);
            }
            LayoutInstruction::NewPage(node) => self.new_page(node),
            LayoutInstruction::ApplyEmphasis(node) => self.stage_emphasis(node),
            LayoutInstruction::SetTableMode(on) => self.set_table_mode(on),
            LayoutInstruction::SetLineIndentMode(on) => self.set_line_indent_mode(on),
            LayoutInstruction::SetLineNumberFlag(on) => self.set_line_number_flag(on),
        }
    }

    /// Reposition the cursor, creating blank lines for any skipped vertical
    /// positions.
    ///
    /// A backward move outside table mode is a protocol violation: fatal in
    /// debug builds, logged and clamped in release builds (a malformed
    /// stream must not crash a transcriber's session).
    pub fn move_to(&mut self, h: usize, target_v: usize) {
        if self.state != PageState::InPage {
            self.cursor.hpos = Some(h);
            self.cursor.vpos = target_v;
            return;
        }

        let mut v = target_v;
        if let Err(violation) = self.cursor.validate_move(v, self.table_mode) {
            if cfg!(debug_assertions) {
                panic!("layout protocol violation: {violation}");
            }
            log::warn!("layout protocol violation: {violation}; clamping move");
            v = self.cursor.vpos;
        }

        // Fill in lines for every skipped vertical position, including the
        // current one if it was never materialized.
        for missing in self.cursor.vpos..v {
            if self.line_index_at_vpos(missing).is_none() {
                self.segments.push(Segment::Line(LogicalLine::blank(missing)));
            }
        }

        let (index, fresh) = match self.line_index_at_vpos(v) {
            Some(index) => (index, false),
            None => {
                self.segments.push(Segment::Line(LogicalLine::blank(v)));
                (self.segments.len() - 1, true)
            }
        };

        let indent_mode = self.line_indent_mode;
        let line = self.segments[index]
            .as_line_mut()
            .expect("line index resolves to a line segment");
        if fresh {
            line.starting_hpos = Some(if indent_mode { h } else { 0 });
        }

        if self.line_number_pending {
            // Recovering from a suppressed line-number move: no padding.
            self.line_number_pending = false;
        } else if !(fresh && indent_mode) {
            let occupied = line.starting_hpos.unwrap_or(0) + line.char_len();
            line.pending_spaces = h.saturating_sub(occupied);
        }

        self.cursor.hpos = Some(h);
        self.cursor.vpos = v;
    }

    /// Append text to the line at the cursor's vertical position.
    ///
    /// Materializes pending spaces first; if an emphasis node is staged,
    /// opens a span at the current line-relative length and closes it after
    /// the append.
    pub fn add_to_line(&mut self, text: &str) -> Appended {
        let len = char_len(text);
        if self.state != PageState::InPage {
            return Appended::Suppressed { len };
        }

        let index = match self.line_index_at_vpos(self.cursor.vpos) {
            Some(index) => index,
            None => {
                self.segments
                    .push(Segment::Line(LogicalLine::blank(self.cursor.vpos)));
                self.segments.len() - 1
            }
        };

        let staged = self.staged_emphasis.take();
        let line = self.segments[index]
            .as_line_mut()
            .expect("line index resolves to a line segment");
        if line.starting_hpos.is_none() {
            line.starting_hpos = Some(0);
        }

        let materialized = line.pending_spaces;
        line.materialize_pending();
        let line_rel = line.char_len();
        if let Some(node) = staged {
            line.emphasis.push(EmphasisSpan {
                node,
                start: line_rel,
                end: line_rel + len,
            });
        }
        line.text.push_str(text);

        let start = self.line_start_offset(index) + line_rel;
        let on_final_line = !self.segments[index + 1..]
            .iter()
            .any(|segment| matches!(segment, Segment::Line(_)));
        let shift = if on_final_line {
            None
        } else {
            Some(Shift {
                at: start - materialized,
                amount: materialized + len,
            })
        };

        self.cursor.hpos = Some(self.cursor.hpos.unwrap_or(0) + len);
        Appended::Visible { start, len, shift }
    }

    /// Close out the current page and start a new one owned by `node`.
    ///
    /// Pads the finished page with blank lines up to the page's line
    /// capacity (except before the very first page) so page-relative line
    /// numbering stays consistent.
    pub fn new_page(&mut self, node: NodeId) {
        if self.state == PageState::InPage {
            self.pad_current_page();
        }
        self.pages_seen += 1;
        if let Some(limit) = self.page_limit
            && self.pages_seen > limit
        {
            self.state = PageState::AfterLastPage;
            return;
        }
        self.segments.push(Segment::PageBreak(node));
        self.state = PageState::InPage;
        self.cursor.reset();
    }

    /// Pad the final page of the document to capacity.
    pub fn finish_page(&mut self) {
        if self.state == PageState::InPage {
            self.pad_current_page();
        }
    }

    pub fn set_table_mode(&mut self, on: bool) {
        self.table_mode = on;
    }

    pub fn set_line_indent_mode(&mut self, on: bool) {
        self.line_indent_mode = on;
    }

    pub fn set_line_number_flag(&mut self, on: bool) {
        self.line_number_pending = on;
    }

    /// Stage an emphasis node to span the next appended text.
    pub fn stage_emphasis(&mut self, node: NodeId) {
        self.staged_emphasis = Some(node);
    }

    /// Char count of the rendered buffer (pending spaces excluded).
    pub fn char_count(&self) -> usize {
        let mut count = 0;
        let mut lines = 0;
        for segment in &self.segments {
            if let Segment::Line(line) = segment {
                if lines > 0 {
                    count += 1; // line separator
                }
                count += line.char_len();
                lines += 1;
            }
        }
        count
    }

    /// Char count as if all owed padding were materialized.
    pub fn char_count_with_pending(&self) -> usize {
        let pending: usize = self
            .segments
            .iter()
            .filter_map(Segment::as_line)
            .map(|line| line.pending_spaces)
            .sum();
        self.char_count() + pending
    }

    /// Char count up to the end of the line at vertical position `v` on the
    /// current page.
    ///
    /// Used exclusively by table-mode backward column layout to find where
    /// an append to an earlier row will land. Falls back to the full count
    /// when no such line exists.
    pub fn char_count_to_vpos(&self, v: usize) -> usize {
        match self.line_index_at_vpos(v) {
            Some(index) => {
                let line = self.segments[index]
                    .as_line()
                    .expect("line index resolves to a line segment");
                self.line_start_offset(index) + line.char_len()
            }
            None => self.char_count(),
        }
    }

    /// Derive the immutable read views over the line buffer.
    pub fn snapshot(&self) -> super::snapshot::LayoutSnapshot {
        super::snapshot::LayoutSnapshot::build(self)
    }

    /// Reverse-scan the current page for the line at vertical position `v`.
    fn line_index_at_vpos(&self, v: usize) -> Option<usize> {
        for (index, segment) in self.segments.iter().enumerate().rev() {
            match segment {
                Segment::PageBreak(_) => return None,
                Segment::Line(line) if line.vpos == v => return Some(index),
                Segment::Line(_) => {}
            }
        }
        None
    }

    /// Absolute char offset of the first char of the line at `index`.
    fn line_start_offset(&self, index: usize) -> usize {
        self.segments[..index]
            .iter()
            .filter_map(Segment::as_line)
            .map(|line| line.char_len() + 1)
            .sum()
    }

    fn pad_current_page(&mut self) {
        let start = self
            .segments
            .iter()
            .rposition(|segment| matches!(segment, Segment::PageBreak(_)))
            .map(|index| index + 1)
            .unwrap_or(0);
        let mut count = 0;
        let mut next_vpos = 0;
        for segment in &self.segments[start..] {
            if let Segment::Line(line) = segment {
                count += 1;
                next_vpos = next_vpos.max(line.vpos + 1);
            }
        }
        while count < self.geometry.lines_per_page {
            self.segments
                .push(Segment::Line(LogicalLine::blank(next_vpos)));
            next_vpos += 1;
            count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(lines: usize) -> PageGeometry {
        PageGeometry::new(40, lines)
    }

    fn node(id: u64) -> NodeId {
        NodeId(id)
    }

    #[test]
    fn test_single_page_single_line_pads_to_capacity() {
        let mut builder = LayoutBuilder::new(page(25));
        builder.new_page(node(1));
        builder.add_to_line("hello");
        builder.finish_page();

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.text, format!("hello{}", "\n".repeat(24)));
        assert_eq!(snapshot.page_starts.len(), 1);
        assert_eq!(snapshot.page_starts[0].offset, 0);
        assert_eq!(snapshot.page_starts[0].node, node(1));
    }

    #[test]
    fn test_explicit_move_creates_blank_line() {
        let mut builder = LayoutBuilder::new(page(3));
        builder.new_page(node(1));
        builder.move_to(0, 0);
        builder.add_to_line("a");
        builder.move_to(0, 2);
        builder.add_to_line("b");

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.text, "a\n\nb");
    }

    #[test]
    fn test_text_before_first_page_is_suppressed() {
        let mut builder = LayoutBuilder::new(page(2));
        let appended = builder.add_to_line("front matter");
        assert_eq!(appended, Appended::Suppressed { len: 12 });

        builder.new_page(node(1));
        builder.add_to_line("body");
        assert_eq!(builder.snapshot().text, "body");
    }

    #[test]
    fn test_page_limit_suppresses_trailing_pages() {
        let mut builder = LayoutBuilder::with_page_limit(page(1), 1);
        builder.new_page(node(1));
        builder.add_to_line("one");
        builder.new_page(node(2));
        let appended = builder.add_to_line("two");

        assert_eq!(appended, Appended::Suppressed { len: 3 });
        assert_eq!(builder.state(), PageState::AfterLastPage);
        assert_eq!(builder.snapshot().text, "one");
    }

    #[test]
    fn test_table_mode_permits_backward_move() {
        let mut builder = LayoutBuilder::new(page(10));
        builder.new_page(node(1));
        builder.set_table_mode(true);
        builder.move_to(0, 5);
        builder.add_to_line("r5");
        builder.move_to(10, 3);
        builder.add_to_line("r3");
        // No panic; text landed on the earlier line with its padding.
        let snapshot = builder.snapshot();
        let line3: &str = snapshot.text.split('\n').nth(3).unwrap();
        assert_eq!(line3, "          r3");
    }

    #[test]
    #[should_panic(expected = "layout protocol violation")]
    fn test_backward_move_outside_table_mode_panics_in_debug() {
        let mut builder = LayoutBuilder::new(page(10));
        builder.new_page(node(1));
        builder.move_to(0, 5);
        builder.move_to(0, 3);
    }

    #[test]
    fn test_backward_table_append_reports_shift() {
        let mut builder = LayoutBuilder::new(page(10));
        builder.new_page(node(1));
        builder.set_table_mode(true);
        builder.move_to(0, 0);
        builder.add_to_line("aa");
        builder.move_to(0, 1);
        builder.add_to_line("bb");
        builder.move_to(4, 0);
        let appended = builder.add_to_line("cc");

        // "aa" + two pending spaces + "cc" on line 0; "bb" shifted by 4.
        assert_eq!(
            appended,
            Appended::Visible {
                start: 4,
                len: 2,
                shift: Some(Shift { at: 2, amount: 4 }),
            }
        );
        assert_eq!(builder.snapshot().text, "aa  cc\nbb");
    }

    #[test]
    fn test_char_count_to_vpos_reverse_scan() {
        let mut builder = LayoutBuilder::new(page(10));
        builder.new_page(node(1));
        builder.move_to(0, 0);
        builder.add_to_line("aaa");
        builder.move_to(0, 1);
        builder.add_to_line("bb");
        builder.move_to(0, 2);
        builder.add_to_line("c");

        assert_eq!(builder.char_count_to_vpos(0), 3);
        assert_eq!(builder.char_count_to_vpos(1), 6);
        assert_eq!(builder.char_count_to_vpos(2), 8);
        assert_eq!(builder.char_count_to_vpos(9), builder.char_count());
    }

    #[test]
    fn test_pending_spaces_not_counted_until_materialized() {
        let mut builder = LayoutBuilder::new(page(5));
        builder.new_page(node(1));
        builder.add_to_line("x");
        builder.move_to(10, 0);

        assert_eq!(builder.char_count(), 1);
        assert_eq!(builder.char_count_with_pending(), 10);

        // No further text: the padding never becomes visible trailing space.
        builder.finish_page();
        assert_eq!(builder.snapshot().text, "x\n\n\n\n");
    }

    #[test]
    fn test_emphasis_span_opens_and_closes_around_append() {
        let mut builder = LayoutBuilder::new(page(1));
        builder.new_page(node(1));
        builder.add_to_line("plain ");
        builder.stage_emphasis(node(7));
        builder.add_to_line("bold");
        builder.add_to_line(" tail");

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.emphasis.len(), 1);
        assert_eq!(snapshot.emphasis[0].node, node(7));
        assert_eq!(snapshot.emphasis[0].start, 6);
        assert_eq!(snapshot.emphasis[0].length, 4);
    }

    #[test]
    fn test_line_number_flag_suppresses_padding_once() {
        let mut builder = LayoutBuilder::new(page(2));
        builder.new_page(node(1));
        builder.add_to_line("text");
        builder.set_line_number_flag(true);
        builder.move_to(38, 0);
        builder.add_to_line("12");

        // The move to the line-number cell produced no padding.
        assert_eq!(builder.snapshot().text, "text12");
    }

    #[test]
    fn test_line_indent_mode_records_margin_instead_of_spaces() {
        let mut builder = LayoutBuilder::new(page(2));
        builder.new_page(node(1));
        builder.set_line_indent_mode(true);
        builder.move_to(4, 0);
        builder.add_to_line("indented");
        builder.set_line_indent_mode(false);
        builder.move_to(2, 1);
        builder.add_to_line("spaced");

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.text, "indented\n  spaced");
        assert_eq!(snapshot.line_indents, vec![4, 0]);
    }

    #[test]
    fn test_page_padding_between_consecutive_markers() {
        let mut builder = LayoutBuilder::new(page(3));
        builder.new_page(node(1));
        builder.add_to_line("p1");
        builder.new_page(node(2));
        builder.add_to_line("p2");
        builder.finish_page();

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.text, "p1\n\n\np2\n\n");
        assert_eq!(
            snapshot.page_starts.iter().map(|p| p.offset).collect::<Vec<_>>(),
            vec![0, 5]
        );
    }
}
