use thiserror::Error;

use crate::document::NodeId;

/// Violations of the layout instruction protocol.
///
/// These are never returned from the builder's public API: a backward move
/// outside table mode panics in debug builds (surface the malformed stream
/// immediately) and is logged and clamped in release builds (never crash a
/// transcriber's open document over a formatting anomaly).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("backward vertical move from line {from} to line {to} outside table mode")]
    BackwardMove { from: usize, to: usize },
}

/// Fatal inconsistencies between the document model and its braille markup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A text element has no braille payload at all. The two models have
    /// desynchronized; continuing would corrupt every later offset.
    #[error("no braille payload for element node {0:?}")]
    MissingPayload(NodeId),

    /// The `index` attribute on a braille node was not a space-separated
    /// ASCII integer list.
    #[error("malformed index attribute {attr:?} on element node {node:?}")]
    BadIndexAttr { node: NodeId, attr: String },
}

/// Failures translating between buffer offsets and document positions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("buffer offset {offset} outside rendered text of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("node {0:?} has no rendered element in this section")]
    UnmappedNode(NodeId),
}

/// Wrapper distinguishing the two user-facing failure classes of an editing
/// action, so the surrounding handler can recover the view without losing
/// the user's edit.
#[derive(Debug, Error)]
pub enum EditError {
    /// Offset translation failed while repositioning the caret after an
    /// edit. The edit itself succeeded and must be kept.
    #[error("cursor movement failed: {0}")]
    CursorMovement(#[from] SyncError),

    /// The editing action itself failed. Surfaced as a notification; the
    /// single operation is aborted and the document left untouched.
    #[error("editing action failed: {0}")]
    Editing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_wraps_as_cursor_movement() {
        let err: EditError = SyncError::OffsetOutOfRange { offset: 9, len: 4 }.into();
        assert!(matches!(err, EditError::CursorMovement(_)));
        assert!(err.to_string().contains("cursor movement"));
    }

    #[test]
    fn test_editing_failure_keeps_its_message() {
        let err = EditError::Editing("backspace across a page boundary".into());
        assert_eq!(
            err.to_string(),
            "editing action failed: backspace across a page boundary"
        );
    }
}
