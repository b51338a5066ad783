//! Reconciliation between braille char positions and print char positions.
//!
//! Each braille-bearing markup node carries an `index` attribute: a
//! space-separated ASCII integer list giving, for every braille char, the
//! char position in the source print text it was translated from. Braille
//! contractions make this many-to-one (one cell can stand for several print
//! chars), so the array is sorted but not dense. These are pure functions;
//! the renderer and synchronizer never reimplement the search inline.

use std::num::ParseIntError;

/// Parse a space-separated integer list.
pub fn parse_index_attr(attr: &str) -> Result<Vec<usize>, ParseIntError> {
    attr.split_ascii_whitespace()
        .map(str::parse::<usize>)
        .collect()
}

/// Print char position for a braille char position.
///
/// Positions past the end of the array clamp to the last entry, matching
/// caret behavior at the tail of a contracted word.
pub fn source_pos(index: &[usize], braille_pos: usize) -> Option<usize> {
    let last = index.last()?;
    Some(*index.get(braille_pos).unwrap_or(last))
}

/// Braille char position whose print mapping is nearest at or before
/// `source_pos`. Binary search over the sorted array.
pub fn braille_pos(index: &[usize], source_pos: usize) -> Option<usize> {
    if index.is_empty() {
        return None;
    }
    match index.binary_search(&source_pos) {
        Ok(found) => Some(found),
        Err(0) => Some(0),
        Err(insertion) => Some(insertion - 1),
    }
}

/// Inclusive span `[first, last]` of print chars covered by this array.
pub fn source_span(index: &[usize]) -> Option<(usize, usize)> {
    Some((*index.first()?, *index.last()?))
}
