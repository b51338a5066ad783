/*!
 * Dual-view cursor synchronization.
 *
 * Given a char offset in the rendered buffer, [`CaretSync`] finds the owning
 * mapped element and translates the offset into a document position, keeping
 * the print view and braille view carets mutually consistent. The reverse
 * mapping restores the caret after an edit rebuilds the layout.
 *
 * This component does no layout of its own; it only reads the offsets the
 * renderer assigned.
 */

use crate::document::NodeId;
use crate::error::SyncError;
use crate::render::element::{ElementKind, MappedElement, TextKind};
use crate::render::index_map;

/// Which way the caret was travelling when it arrived at an offset.
///
/// Decides ownership when the offset lands exactly on the boundary between
/// two elements: arriving from the left keeps the caret with the preceding
/// element, from the right with the following one. This reproduces the
/// original caret-direction policy; it is not derived from anything deeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Where a caret sits relative to a non-text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Before,
    After,
    All,
}

/// A buffer offset translated into document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPosition {
    /// Inside a text-bearing element: char offset relative to the source
    /// node's print text.
    Text { node: NodeId, offset: usize },
    /// A non-text element (table, box line, page indicator, image).
    Node { node: NodeId, at: Qualifier },
}

/// How far the seeded search looks around the previously-current element
/// before falling back to a binary search. Caret moves are usually small.
const SEED_WINDOW: usize = 8;

/// Translates buffer offsets to document positions and back.
///
/// Keeps the index of the previously-current element as a search seed;
/// reset (or rebuilt) whenever a reformat replaces the element list.
#[derive(Debug, Default)]
pub struct CaretSync {
    current: usize,
}

impl CaretSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate a buffer offset into a document position.
    pub fn locate(
        &mut self,
        elements: &[MappedElement],
        offset: usize,
        direction: Direction,
    ) -> Result<DocPosition, SyncError> {
        let spanned = spanned_indices(elements);
        if spanned.is_empty() {
            return Err(SyncError::OffsetOutOfRange { offset, len: 0 });
        }
        let buffer_len = elements[*spanned.last().expect("non-empty")]
            .end
            .unwrap_or(0);
        if offset > buffer_len {
            return Err(SyncError::OffsetOutOfRange {
                offset,
                len: buffer_len,
            });
        }

        let position = self.find_element(elements, &spanned, offset, direction);
        let index = spanned[position];
        self.current = index;
        Ok(resolve(elements, &spanned, position, offset, direction))
    }

    /// Buffer offset for a char position within a node's print text.
    ///
    /// Used to restore the caret after an edit; a failure here is wrapped by
    /// the caller as a cursor-movement error, distinct from the edit itself.
    pub fn buffer_offset(
        &self,
        elements: &[MappedElement],
        node: NodeId,
        source_offset: usize,
    ) -> Result<usize, SyncError> {
        let element =
            find_by_node(elements, node).ok_or(SyncError::UnmappedNode(node))?;
        let start = element.start.ok_or(SyncError::UnmappedNode(node))?;

        let Some(braille) = &element.braille else {
            return Ok(start);
        };
        let mut best = start;
        for child in braille {
            let (Some(buffer_start), Some(len), Some((first, _))) = (
                child.buffer_start,
                child.rendered_len,
                index_map::source_span(&child.index),
            ) else {
                continue;
            };
            if source_offset < first {
                return Ok(buffer_start);
            }
            if source_offset < first + len {
                return Ok(buffer_start + (source_offset - first));
            }
            best = buffer_start + len;
        }
        Ok(best)
    }

    /// Closest-element search seeded from the previously-current element.
    /// Returns a position into `spanned`.
    fn find_element(
        &self,
        elements: &[MappedElement],
        spanned: &[usize],
        offset: usize,
        direction: Direction,
    ) -> usize {
        let seed = spanned
            .iter()
            .position(|&i| i >= self.current)
            .unwrap_or(spanned.len() - 1);

        // common case: the caret moved within or near the current element
        let lo = seed.saturating_sub(SEED_WINDOW);
        let hi = (seed + SEED_WINDOW).min(spanned.len() - 1);
        for distance in 0..=(hi - lo) {
            for position in [seed.checked_sub(distance), Some(seed + distance)] {
                let Some(position) = position else { continue };
                if position < lo || position > hi {
                    continue;
                }
                if contains(&elements[spanned[position]], offset) {
                    return tie_break(elements, spanned, position, offset, direction);
                }
            }
        }

        // large jump: binary search over start offsets
        let position = spanned
            .partition_point(|&i| elements[i].start.unwrap_or(0) <= offset)
            .saturating_sub(1);
        tie_break(elements, spanned, position, offset, direction)
    }
}

/// Inclusive containment; exact boundaries are settled by [`tie_break`].
fn contains(element: &MappedElement, offset: usize) -> bool {
    match element.span() {
        Some(span) => span.start <= offset && offset <= span.end,
        None => false,
    }
}

/// Apply the directional boundary policy when `offset` sits exactly between
/// two neighboring elements.
fn tie_break(
    elements: &[MappedElement],
    spanned: &[usize],
    position: usize,
    offset: usize,
    direction: Direction,
) -> usize {
    let element = &elements[spanned[position]];
    match direction {
        // arrived from the left: stay with the element that ends here
        Direction::Forward if element.start == Some(offset) && position > 0 => {
            let left = &elements[spanned[position - 1]];
            if left.end == Some(offset) {
                return position - 1;
            }
            position
        }
        // arrived from the right: stay with the element that starts here
        Direction::Backward if element.end == Some(offset) && position + 1 < spanned.len() => {
            let right = &elements[spanned[position + 1]];
            if right.start == Some(offset) {
                return position + 1;
            }
            position
        }
        _ => position,
    }
}

fn resolve(
    elements: &[MappedElement],
    spanned: &[usize],
    position: usize,
    offset: usize,
    direction: Direction,
) -> DocPosition {
    let element = &elements[spanned[position]];
    match &element.kind {
        // the caret never addresses a literal cell's text node: table
        // navigation happens against the enclosing table's host node
        ElementKind::Table { .. } => DocPosition::Node {
            node: element.node,
            at: Qualifier::All,
        },
        ElementKind::Text { kind } => match kind {
            TextKind::Plain | TextKind::Math | TextKind::GuideDots => DocPosition::Text {
                node: element.node,
                offset: source_offset_at(element, offset),
            },
            TextKind::BoxLine | TextKind::PageIndicator | TextKind::Image => DocPosition::Node {
                node: element.node,
                at: edge_qualifier(element, offset),
            },
        },
        // whitespace runs have no document position of their own
        ElementKind::LineBreak { .. }
        | ElementKind::Tab
        | ElementKind::PageBreak
        | ElementKind::Whitespace => redirect_whitespace(elements, spanned, position, direction),
    }
}

/// An offset inside a whitespace run belongs to the nearest non-whitespace
/// neighbor, except that the separator run opening a box belongs to the box
/// line itself.
fn redirect_whitespace(
    elements: &[MappedElement],
    spanned: &[usize],
    position: usize,
    direction: Direction,
) -> DocPosition {
    // curated exception: whitespace introducing a box line
    if let Some(right) = spanned[position + 1..]
        .iter()
        .map(|&i| &elements[i])
        .find(|e| !e.is_whitespace())
        && matches!(
            right.kind,
            ElementKind::Text {
                kind: TextKind::BoxLine
            }
        )
    {
        return DocPosition::Node {
            node: right.node,
            at: Qualifier::Before,
        };
    }

    let left = spanned[..position]
        .iter()
        .rev()
        .map(|&i| &elements[i])
        .find(|e| !e.is_whitespace());
    let right = spanned[position + 1..]
        .iter()
        .map(|&i| &elements[i])
        .find(|e| !e.is_whitespace());

    let (neighbor, qualifier) = match (left, right, direction) {
        (Some(left), _, Direction::Forward) => (left, Qualifier::After),
        (_, Some(right), Direction::Backward) => (right, Qualifier::Before),
        (Some(left), None, _) => (left, Qualifier::After),
        (None, Some(right), _) => (right, Qualifier::Before),
        (None, None, _) => {
            // a section of nothing but whitespace; nothing better to offer
            let element = &elements[spanned[position]];
            return DocPosition::Node {
                node: element.node,
                at: Qualifier::All,
            };
        }
    };

    match (&neighbor.kind, qualifier) {
        (
            ElementKind::Text {
                kind: TextKind::Plain | TextKind::Math | TextKind::GuideDots,
            },
            Qualifier::After,
        ) => DocPosition::Text {
            node: neighbor.node,
            offset: source_offset_at(neighbor, neighbor.end.unwrap_or(0)),
        },
        (
            ElementKind::Text {
                kind: TextKind::Plain | TextKind::Math | TextKind::GuideDots,
            },
            Qualifier::Before,
        ) => DocPosition::Text {
            node: neighbor.node,
            offset: source_offset_at(neighbor, neighbor.start.unwrap_or(0)),
        },
        (_, qualifier) => DocPosition::Node {
            node: neighbor.node,
            at: qualifier,
        },
    }
}

fn edge_qualifier(element: &MappedElement, offset: usize) -> Qualifier {
    if element.start == Some(offset) {
        Qualifier::Before
    } else if element.end == Some(offset) {
        Qualifier::After
    } else {
        Qualifier::All
    }
}

/// Source char offset (relative to the element's print text) for a buffer
/// offset within the element's rendered span.
fn source_offset_at(element: &MappedElement, offset: usize) -> usize {
    let Some(braille) = &element.braille else {
        return 0;
    };
    let mut best = 0;
    for child in braille {
        let (Some(buffer_start), Some(len), Some((first, _))) = (
            child.buffer_start,
            child.rendered_len,
            index_map::source_span(&child.index),
        ) else {
            continue;
        };
        if offset < buffer_start {
            return first;
        }
        if offset <= buffer_start + len {
            return first + (offset - buffer_start);
        }
        best = first + len;
    }
    best
}

/// Indices of elements that take part in offset arithmetic, in order.
fn spanned_indices(elements: &[MappedElement]) -> Vec<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.fully_visible && e.span().is_some())
        .map(|(i, _)| i)
        .collect()
}

fn find_by_node(elements: &[MappedElement], node: NodeId) -> Option<&MappedElement> {
    for element in elements {
        if element.node == node {
            return Some(element);
        }
        if let ElementKind::Table { cells } = &element.kind
            && let Some(found) = find_by_node(cells, node)
        {
            return Some(found);
        }
    }
    None
}
