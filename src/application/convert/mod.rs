//! Conversion pipeline: markdown source → paragraph specs → encoded DOCX.

mod assemble;
mod dispatch;
mod types;

use comrak::{Arena, Options, parse_document};

use crate::domain::styles::StyleCatalog;

pub use assemble::{EncodeError, assemble, encode};
pub use dispatch::dispatch;
pub use types::{ParagraphSpec, RunFormat, RunSpec};

/// Parse markdown and dispatch the resulting tree into paragraph specs.
///
/// Total for any input string: parse irregularities degrade to plain-text
/// paragraphs, never to an error.
pub fn convert_markdown(markdown: &str, catalog: &StyleCatalog) -> Vec<ParagraphSpec> {
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &Options::default());
    dispatch(root, catalog)
}

/// Convert markdown straight to encoded DOCX bytes.
pub fn render_document(markdown: &str, catalog: &StyleCatalog) -> Result<Vec<u8>, EncodeError> {
    let specs = convert_markdown(markdown, catalog);
    encode(assemble(&specs, catalog))
}
