/*!
 * # braille-loom-engine
 *
 * Layout/rendering core of a braille transcription editor. The translation
 * engine (external, treated as a black box) emits a stream of layout
 * instructions and index-annotated braille markup per document section;
 * this crate turns that into:
 *
 * - the flat character buffer displayed in the braille text widget,
 * - a bidirectional offset mapping between buffer positions and source
 *   document nodes, and
 * - page, line-indent, emphasis and painted-overlay metadata.
 *
 * ## Architecture
 *
 * - **`layout`**: the layout state machine. Consumes instructions, owns the
 *   line buffer and cursor, derives immutable [`LayoutSnapshot`]s.
 * - **`render`**: walks mapped elements in document order, drives the
 *   layout builder, and assigns every element its buffer offsets.
 * - **`sync`**: translates widget caret offsets back to document positions
 *   (and back), keeping the dual views consistent.
 * - **`document`**, **`geometry`**, **`error`**: the source-text model the
 *   core reads, the explicit page-geometry value object, and the error
 *   taxonomy.
 *
 * Everything is rebuilt from scratch on every reformat pass: an edit
 * invalidates the whole layout for the affected section, and the old
 * structures are discarded wholesale rather than patched. All mutation is
 * confined to the UI thread; there is no internal parallelism.
 */

pub mod document;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod render;
pub mod sync;

// Re-export key types for easier usage
pub use document::{NodeId, SourceDocument};
pub use error::{EditError, LayoutError, RenderError, SyncError};
pub use geometry::PageGeometry;
pub use layout::{LayoutBuilder, LayoutInstruction, LayoutSnapshot};
pub use render::{
    BrailleNode, BrailleNodeKind, ElementKind, MappedElement, PaintedOverlay, RenderedSection,
    Section, SectionRenderer, TextKind, render_section, render_section_with,
};
pub use sync::{CaretSync, Direction, DocPosition, Qualifier};
