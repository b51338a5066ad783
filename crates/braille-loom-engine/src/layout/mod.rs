/*!
 * Braille page layout construction.
 *
 * The translation engine emits a linear stream of [`LayoutInstruction`]s per
 * document section. [`LayoutBuilder`] consumes the stream and reconstructs
 * the 2-D page layout as a buffer of logical lines and page markers, from
 * which [`LayoutSnapshot`] derives the flat text handed to the text widget
 * plus the metadata used for overlay painting.
 *
 * All layout state is owned here: the line buffer and cursor are plain
 * values inside the builder, created per reformat pass and discarded
 * wholesale when an edit invalidates the section. Nothing reads ambient
 * settings; page geometry is passed in at construction.
 */

pub mod builder;
pub mod cursor;
pub mod line;
pub mod snapshot;

pub use builder::{Appended, LayoutBuilder, PageState};
pub use cursor::Cursor;
pub use line::{EmphasisSpan, LogicalLine, Segment};
pub use snapshot::{EmphasisRange, LayoutSnapshot, PageStart};

use serde::{Deserialize, Serialize};

use crate::document::NodeId;

/// One instruction from the translation engine, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutInstruction {
    /// Reposition the rendering cursor to an absolute cell position.
    MoveTo { h: usize, v: usize },
    /// Append text at the cursor.
    AddText(String),
    /// Start a new page owned by the given page node.
    NewPage(NodeId),
    /// Stage an emphasis node; the next append opens and closes its span.
    ApplyEmphasis(NodeId),
    /// Enter or leave table mode (permits backward vertical moves).
    SetTableMode(bool),
    /// When set, a fresh line's first horizontal move becomes its painted
    /// left margin instead of leading spaces.
    SetLineIndentMode(bool),
    /// Suppress padding on the next move (line-number region recovery).
    SetLineNumberFlag(bool),
}
