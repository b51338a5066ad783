/*!
 * Element-to-buffer rendering.
 *
 * The document-mapping layer hands over an ordered list of
 * [`MappedElement`]s per section, each with a lazily populated braille
 * payload. [`SectionRenderer`] classifies every element, drives the layout
 * builder, and reconciles the payload's index-annotated offsets with the
 * builder's running char count, assigning every element its start and end
 * buffer offsets.
 */

pub mod element;
pub mod index_map;
pub mod renderer;

pub use element::{BrailleNode, BrailleNodeKind, ElementKind, MappedElement, TextKind};
pub use renderer::{OverlayKind, PaintedOverlay, SectionRenderer};

use serde::{Deserialize, Serialize};

use crate::document::SourceDocument;
use crate::error::RenderError;
use crate::geometry::PageGeometry;
use crate::layout::{LayoutBuilder, LayoutInstruction, LayoutSnapshot};

/// One visible section as produced by the document-mapping layer: the print
/// text, its mapped elements, and any raw instruction preamble from the
/// translation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    pub source: String,
    #[serde(default)]
    pub instructions: Vec<LayoutInstruction>,
    pub elements: Vec<MappedElement>,
}

/// Everything the GUI layer needs for one section: flat text plus paint
/// metadata, and the offset-annotated elements for caret synchronization.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    pub snapshot: LayoutSnapshot,
    pub elements: Vec<MappedElement>,
    pub overlays: Vec<PaintedOverlay>,
}

/// Render a whole section: instruction preamble, then every element in
/// document order, then final-page padding.
pub fn render_section(
    geometry: PageGeometry,
    section: Section,
) -> Result<RenderedSection, RenderError> {
    render_section_with(LayoutBuilder::new(geometry), section)
}

/// [`render_section`] with a caller-configured builder (page limits etc.).
pub fn render_section_with(
    mut builder: LayoutBuilder,
    section: Section,
) -> Result<RenderedSection, RenderError> {
    let document = SourceDocument::from_str(&section.source);
    for instruction in section.instructions {
        builder.apply(instruction);
    }

    let mut elements = section.elements;
    let mut renderer = SectionRenderer::new(&mut builder, &document);
    renderer.render(&mut elements)?;
    let overlays = renderer.into_overlays();

    builder.finish_page();
    Ok(RenderedSection {
        snapshot: builder.snapshot(),
        elements,
        overlays,
    })
}
