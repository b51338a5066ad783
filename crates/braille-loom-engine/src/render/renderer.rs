use crate::document::{NodeId, SourceDocument, char_len, char_slice};
use crate::error::RenderError;
use crate::layout::builder::{Appended, LayoutBuilder, PageState};

use super::element::{BrailleNodeKind, ElementKind, MappedElement, TextKind};
use super::index_map;

/// Visual-only decoration painted by the widget outside the text flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    PrintPageNumber,
    BraillePageNumber,
    RunningHead,
    GuideWord,
}

impl OverlayKind {
    fn from_braille(kind: BrailleNodeKind) -> Option<Self> {
        match kind {
            BrailleNodeKind::Text => None,
            BrailleNodeKind::PrintPageMarker => Some(Self::PrintPageNumber),
            BrailleNodeKind::BraillePageMarker => Some(Self::BraillePageNumber),
            BrailleNodeKind::RunningHead => Some(Self::RunningHead),
            BrailleNodeKind::GuideWord => Some(Self::GuideWord),
        }
    }
}

/// A deferred decoration: never inserted into the buffer, painted at the
/// recorded char offset by the overlay painter instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedOverlay {
    pub node: NodeId,
    pub kind: OverlayKind,
    pub text: String,
    pub offset: usize,
}

/// Walks the mapped elements of one section in document order and drives
/// the layout builder, assigning each element its buffer offsets.
pub struct SectionRenderer<'a> {
    builder: &'a mut LayoutBuilder,
    document: &'a SourceDocument,
    overlays: Vec<PaintedOverlay>,
    /// Mid-buffer insertions from table-mode appends, not yet applied to
    /// earlier siblings of the current scope.
    shifts: Vec<crate::layout::builder::Shift>,
    /// Char count recorded when the last unresolved tab element was seen.
    tab_anchor: Option<usize>,
    /// Offsets for that tab, once a move has revealed its rendered width.
    tab_resolution: Option<(usize, usize)>,
}

impl<'a> SectionRenderer<'a> {
    pub fn new(builder: &'a mut LayoutBuilder, document: &'a SourceDocument) -> Self {
        Self {
            builder,
            document,
            overlays: Vec::new(),
            shifts: Vec::new(),
            tab_anchor: None,
            tab_resolution: None,
        }
    }

    pub fn render(&mut self, elements: &mut [MappedElement]) -> Result<(), RenderError> {
        self.render_slice(elements)
    }

    pub fn overlays(&self) -> &[PaintedOverlay] {
        &self.overlays
    }

    pub fn into_overlays(self) -> Vec<PaintedOverlay> {
        self.overlays
    }

    fn render_slice(&mut self, elements: &mut [MappedElement]) -> Result<(), RenderError> {
        let mut pending_ws: Vec<usize> = Vec::new();
        let mut last_tab: Option<usize> = None;
        let mut prev_nonws_end = self.builder.char_count();
        let mut prev_was_ws = false;

        for i in 0..elements.len() {
            let is_real = matches!(
                elements[i].kind,
                ElementKind::Table { .. } | ElementKind::Text { .. }
            );
            if is_real {
                // a real element gives the deferred whitespace its offsets
                for j in pending_ws.drain(..) {
                    elements[j].start.get_or_insert(prev_nonws_end);
                    elements[j].end = Some(prev_nonws_end);
                }
            }

            match &elements[i].kind {
                ElementKind::Table { .. } => self.render_table(&mut elements[i])?,
                ElementKind::Text { kind } => {
                    let kind = *kind;
                    self.render_text_element(&mut elements[i], kind)?;
                }
                ElementKind::LineBreak { .. } => {
                    if self.builder.state() == PageState::InPage {
                        let offset = self.builder.char_count();
                        let ends_text = !prev_was_ws;
                        let element = &mut elements[i];
                        if let ElementKind::LineBreak { eol } = &mut element.kind {
                            *eol = ends_text;
                        }
                        element.start.get_or_insert(offset);
                        element.end = Some(offset);
                    } else {
                        elements[i].fully_visible = false;
                    }
                }
                ElementKind::Tab => {
                    if let Some(j) = last_tab.replace(i) {
                        // two tabs without an intervening move: collapse the first
                        let count = self.builder.char_count();
                        elements[j].start.get_or_insert(count);
                        elements[j].end = Some(count);
                    }
                    self.tab_anchor = Some(self.builder.char_count());
                }
                ElementKind::PageBreak => {
                    elements[i].start.get_or_insert(prev_nonws_end);
                    elements[i].end = Some(prev_nonws_end);
                    if let Some(j) = last_tab.take() {
                        // abandoned tab: no text followed it on the page
                        self.tab_anchor = None;
                        let count = self.builder.char_count();
                        elements[j].start.get_or_insert(count);
                        elements[j].end = Some(count);
                    }
                }
                ElementKind::Whitespace => pending_ws.push(i),
            }

            if let Some((start, end)) = self.tab_resolution.take()
                && let Some(j) = last_tab.take()
            {
                elements[j].start.get_or_insert(start);
                elements[j].end = Some(end);
            }

            // Propagate table-mode mid-buffer insertions to earlier siblings.
            let shifts = std::mem::take(&mut self.shifts);
            for shift in shifts {
                let (done, _) = elements.split_at_mut(i);
                for element in done {
                    element.shift_offsets(shift);
                }
                if prev_nonws_end > shift.at {
                    prev_nonws_end += shift.amount;
                }
                if let Some(anchor) = &mut self.tab_anchor
                    && *anchor >= shift.at
                {
                    *anchor += shift.amount;
                }
            }

            prev_was_ws = elements[i].is_whitespace();
            if is_real && let Some(end) = elements[i].end {
                prev_nonws_end = end;
            }
        }

        for j in pending_ws {
            elements[j].start.get_or_insert(prev_nonws_end);
            elements[j].end = Some(prev_nonws_end);
        }
        if let Some(j) = last_tab {
            self.tab_anchor = None;
            let count = self.builder.char_count();
            elements[j].start.get_or_insert(count);
            elements[j].end = Some(count);
        }
        Ok(())
    }

    fn render_table(&mut self, table: &mut MappedElement) -> Result<(), RenderError> {
        if self.builder.state() == PageState::InPage {
            table.start.get_or_insert(self.builder.char_count());
        } else {
            table.fully_visible = false;
        }

        let was_table_mode = self.builder.table_mode();
        self.builder.set_table_mode(true);
        let result = match &mut table.kind {
            ElementKind::Table { cells } => self.render_slice(cells),
            _ => Ok(()),
        };
        self.builder.set_table_mode(was_table_mode);
        result?;

        if table.start.is_some() {
            table.end = Some(if self.builder.state() == PageState::InPage {
                self.builder.char_count()
            } else {
                table.start.unwrap_or(0)
            });
        }
        if let ElementKind::Table { cells } = &table.kind
            && cells.iter().any(|cell| !cell.fully_visible)
        {
            table.fully_visible = false;
        }
        Ok(())
    }

    fn render_text_element(
        &mut self,
        element: &mut MappedElement,
        kind: TextKind,
    ) -> Result<(), RenderError> {
        // Images carry no braille payload; every other text kind without one
        // means the document and braille models have desynchronized.
        let payload_required = !matches!(kind, TextKind::Image);
        let Some(child_count) = element.braille.as_ref().map(Vec::len) else {
            if payload_required {
                return Err(RenderError::MissingPayload(element.node));
            }
            if self.builder.state() == PageState::InPage {
                let count = self.builder.char_count();
                element.start.get_or_insert(count);
                element.end = Some(count);
            } else {
                element.fully_visible = false;
            }
            return Ok(());
        };

        let source = self.document.slice(element.source_range.clone()).into_owned();
        let source_chars = char_len(&source);
        // First print position of each text child, for slice boundaries:
        // a child's slice runs to the next text child's first position.
        let firsts: Vec<Option<usize>> = element
            .braille
            .as_ref()
            .expect("payload checked above")
            .iter()
            .map(|child| {
                if child.kind == BrailleNodeKind::Text {
                    index_map::source_span(&child.index).map(|(first, _)| first)
                } else {
                    None
                }
            })
            .collect();

        let mut last_end: Option<usize> = None;
        for ci in 0..child_count {
            let (child_kind, move_cue, page_cue) = {
                let child = &element.braille.as_ref().expect("payload checked above")[ci];
                (child.kind, child.move_to, child.new_page)
            };
            if let Some(page_node) = page_cue {
                self.builder.new_page(page_node);
            }
            if let Some((h, v)) = move_cue {
                self.apply_move(h, v);
            }

            match child_kind {
                BrailleNodeKind::Text => {
                    let text = {
                        let child = &element.braille.as_ref().expect("payload checked above")[ci];
                        match firsts[ci] {
                            Some(first) => {
                                let end = firsts[ci + 1..]
                                    .iter()
                                    .copied()
                                    .flatten()
                                    .next()
                                    .unwrap_or(source_chars);
                                char_slice(&source, first, end).to_string()
                            }
                            // generated cells (box lines, separators) have no
                            // print mapping; rendered verbatim
                            None => child.text.clone(),
                        }
                    };
                    match self.builder.add_to_line(&text) {
                        Appended::Visible { start, len, shift } => {
                            if let Some(shift) = shift {
                                element.shift_offsets(shift);
                                if let Some(end) = &mut last_end
                                    && *end > shift.at
                                {
                                    *end += shift.amount;
                                }
                                self.shifts.push(shift);
                            }
                            element.start.get_or_insert(start);
                            let child =
                                &mut element.braille.as_mut().expect("payload checked above")[ci];
                            child.buffer_start = Some(start);
                            child.rendered_len = Some(len);
                            last_end =
                                Some(last_end.map_or(start + len, |end| end.max(start + len)));
                        }
                        Appended::Suppressed { len } => {
                            element.invisible_chars += len;
                            element.fully_visible = false;
                        }
                    }
                }
                _ => {
                    let overlay_kind = OverlayKind::from_braille(child_kind)
                        .expect("non-text braille kinds map to overlays");
                    let text = element.braille.as_ref().expect("payload checked above")[ci]
                        .text
                        .clone();
                    self.overlays.push(PaintedOverlay {
                        node: element.node,
                        kind: overlay_kind,
                        text,
                        offset: self.builder.char_count(),
                    });
                }
            }
        }

        if self.builder.state() == PageState::InPage && element.start.is_none() {
            // empty payload or overlay-only element
            element.start = Some(self.builder.char_count());
        }
        if element.start.is_some() {
            element.end = last_end.or(element.start);
        }
        Ok(())
    }

    /// A layout-engine move inside a braille list. Resolves a dangling tab
    /// (the move reveals the tab's true rendered width) before the text that
    /// follows is appended.
    fn apply_move(&mut self, h: usize, v: usize) {
        let before = self.builder.cursor();
        let in_page = self.builder.state() == PageState::InPage;
        self.builder.move_to(h, v);
        if let Some(anchor) = self.tab_anchor.take() {
            let resolution = if in_page && v == before.vpos {
                (anchor, self.builder.char_count_with_pending())
            } else {
                // the move left the line: the tab never got a width
                (anchor, anchor)
            };
            self.tab_resolution = Some(resolution);
        }
    }
}
