use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::document::NodeId;
use crate::error::RenderError;
use crate::layout::builder::Shift;

use super::index_map;

/// Subtype of a text-bearing element. Each kind has its own braille payload
/// lookup rule and its own caret-resolution behavior in the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
    Plain,
    BoxLine,
    GuideDots,
    Math,
    PageIndicator,
    Image,
}

/// Closed classification of mapped elements.
///
/// One exhaustive match in the renderer replaces the open class hierarchy of
/// per-subtype handlers; a missing arm is a compile error rather than a
/// silently unhandled element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// A table; cells are rendered recursively under table mode.
    Table { cells: Vec<MappedElement> },
    /// Forced line break. `eol` is set by the renderer when the break ends
    /// a line of real text (not immediately preceded by whitespace).
    LineBreak {
        #[serde(default)]
        eol: bool,
    },
    /// Horizontal tab; width unknown until the next move reveals it.
    Tab,
    /// Page-break whitespace.
    PageBreak,
    /// Other whitespace placeholder.
    Whitespace,
    Text {
        kind: TextKind,
    },
}

/// Classification of one node in an element's braille markup.
///
/// Only `Text` nodes become buffer characters. The remaining kinds are
/// painted overlays: decorations drawn by the widget outside the text flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrailleNodeKind {
    Text,
    PrintPageMarker,
    BraillePageMarker,
    RunningHead,
    GuideWord,
}

/// One node of an element's braille payload, in markup order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrailleNode {
    pub kind: BrailleNodeKind,
    /// The braille cells of this node.
    pub text: String,
    /// Parsed `index` attribute: for each braille char, the char position in
    /// the element's print text it was translated from. Sorted ascending.
    /// Empty for generated characters (box lines, separators).
    #[serde(default)]
    pub index: Vec<usize>,
    /// A `moveTo` sibling preceding this node in the braille markup.
    #[serde(default)]
    pub move_to: Option<(usize, usize)>,
    /// A `newPage` sibling preceding this node.
    #[serde(default)]
    pub new_page: Option<NodeId>,
    /// Buffer char offset where this node's text landed. Assigned by the
    /// renderer; used by the synchronizer for per-node offset translation.
    #[serde(skip)]
    pub buffer_start: Option<usize>,
    /// Char length of the rendered slice (print chars, not braille cells).
    #[serde(skip)]
    pub rendered_len: Option<usize>,
}

impl BrailleNode {
    pub fn text_node(text: impl Into<String>, index: Vec<usize>) -> Self {
        Self {
            kind: BrailleNodeKind::Text,
            text: text.into(),
            index,
            move_to: None,
            new_page: None,
            buffer_start: None,
            rendered_len: None,
        }
    }

    /// Text node from the raw markup form of the index attribute.
    pub fn text_node_from_attr(
        owner: NodeId,
        text: impl Into<String>,
        attr: &str,
    ) -> Result<Self, RenderError> {
        let index = index_map::parse_index_attr(attr).map_err(|_| RenderError::BadIndexAttr {
            node: owner,
            attr: attr.to_owned(),
        })?;
        Ok(Self::text_node(text, index))
    }

    pub fn overlay(kind: BrailleNodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            index: Vec::new(),
            move_to: None,
            new_page: None,
            buffer_start: None,
            rendered_len: None,
        }
    }

    pub fn with_move(mut self, h: usize, v: usize) -> Self {
        self.move_to = Some((h, v));
        self
    }

    pub fn with_new_page(mut self, node: NodeId) -> Self {
        self.new_page = Some(node);
        self
    }
}

fn fully_visible_default() -> bool {
    true
}

fn empty_range() -> Range<usize> {
    0..0
}

/// A document-offset-tracking unit bridging a source node and its span in
/// the rendered buffer.
///
/// Offsets start unassigned and are filled in by the renderer. Once a start
/// offset is assigned it is never reset; the end offset is always assigned
/// after processing (an element with an empty payload inherits
/// `end == start`). Elements outside the visible page window keep their
/// offsets unassigned and are excluded from buffer-offset arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedElement {
    pub node: NodeId,
    pub kind: ElementKind,
    /// Byte range of this element's print text in the source document.
    #[serde(default = "empty_range")]
    pub source_range: Range<usize>,
    /// Braille payload, lazily populated by the document-mapping layer.
    /// `None` means never populated, which is fatal for payload-bearing
    /// kinds; `Some(vec![])` is a legal empty payload.
    #[serde(default)]
    pub braille: Option<Vec<BrailleNode>>,
    /// Buffer char offset of the first rendered char.
    #[serde(skip)]
    pub start: Option<usize>,
    /// Buffer char offset one past the last rendered char.
    #[serde(skip)]
    pub end: Option<usize>,
    /// False when any part of the element fell outside the visible pages.
    #[serde(skip, default = "fully_visible_default")]
    pub fully_visible: bool,
    /// Chars suppressed outside the visible pages, booked so adjacent
    /// sections can be revealed without a full re-render.
    #[serde(skip)]
    pub invisible_chars: usize,
}

impl MappedElement {
    pub fn new(node: NodeId, kind: ElementKind) -> Self {
        Self {
            node,
            kind,
            source_range: 0..0,
            braille: None,
            start: None,
            end: None,
            fully_visible: true,
            invisible_chars: 0,
        }
    }

    pub fn text(node: NodeId, kind: TextKind, source_range: Range<usize>) -> Self {
        let mut element = Self::new(node, ElementKind::Text { kind });
        element.source_range = source_range;
        element
    }

    pub fn table(node: NodeId, cells: Vec<MappedElement>) -> Self {
        Self::new(node, ElementKind::Table { cells })
    }

    pub fn with_braille(mut self, braille: Vec<BrailleNode>) -> Self {
        self.braille = Some(braille);
        self
    }

    /// True for the kinds the renderer treats as whitespace when deciding
    /// whether a following line break ends a line of real text.
    pub fn is_whitespace(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::LineBreak { .. }
                | ElementKind::Tab
                | ElementKind::PageBreak
                | ElementKind::Whitespace
        )
    }

    /// Rendered span, when both offsets are assigned.
    pub fn span(&self) -> Option<Range<usize>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }

    /// Propagate a mid-buffer insertion through already-assigned offsets.
    ///
    /// Start offsets move when the insertion lands at or before them; an
    /// exclusive end offset exactly at the insertion point stays put (the
    /// inserted text comes after that element).
    pub(crate) fn shift_offsets(&mut self, shift: Shift) {
        let bump_start = |offset: &mut Option<usize>| {
            if let Some(o) = offset
                && *o >= shift.at
            {
                *o += shift.amount;
            }
        };
        bump_start(&mut self.start);
        if let Some(end) = &mut self.end
            && *end > shift.at
        {
            *end += shift.amount;
        }
        if let Some(braille) = &mut self.braille {
            for node in braille {
                bump_start(&mut node.buffer_start);
            }
        }
        if let ElementKind::Table { cells } = &mut self.kind {
            for cell in cells {
                cell.shift_offsets(shift);
            }
        }
    }
}
