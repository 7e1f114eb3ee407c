//! Document assembly: paragraph specifications into a DOCX object.
//!
//! The assembler owns the output document shell. Catalog styles are
//! registered up front and each paragraph has its style applied before any
//! run is appended; some word processors reset run formatting when a style
//! lands after content.

use std::io::Cursor;

use docx_rs::{BreakType, Docx, Paragraph, Run, RunFonts, Style, StyleType};
use thiserror::Error;

use crate::domain::styles::{StyleCatalog, StyleDefinition};

use super::types::{ParagraphSpec, RunSpec};

const MONOSPACE_FONT: &str = "Courier New";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to pack document archive: {0}")]
    Pack(String),
}

/// Build a document shell carrying the catalog's styles and append every
/// paragraph spec in order.
pub fn assemble(specs: &[ParagraphSpec], catalog: &StyleCatalog) -> Docx {
    let mut docx = register_styles(Docx::new(), catalog);
    for spec in specs {
        docx = docx.add_paragraph(build_paragraph(spec));
    }
    docx
}

/// Serialize the assembled document to DOCX bytes.
pub fn encode(docx: Docx) -> Result<Vec<u8>, EncodeError> {
    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|err| EncodeError::Pack(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn register_styles(docx: Docx, catalog: &StyleCatalog) -> Docx {
    catalog
        .definitions()
        .fold(docx, |docx, (id, definition)| {
            docx.add_style(build_style(id, definition))
        })
}

fn build_style(id: &str, definition: &StyleDefinition) -> Style {
    let mut style = Style::new(id, StyleType::Paragraph).name(id);
    if let Some(size) = definition.size {
        style = style.size(size);
    }
    if let Some(font) = definition.font.as_deref() {
        style = style.fonts(paragraph_fonts(font));
    }
    if definition.bold {
        style = style.bold();
    }
    if definition.italic {
        style = style.italic();
    }
    style
}

fn build_paragraph(spec: &ParagraphSpec) -> Paragraph {
    // Style first, runs after.
    let mut paragraph = Paragraph::new().style(spec.style.as_str());
    for run in &spec.runs {
        paragraph = paragraph.add_run(build_run(run));
    }
    paragraph
}

fn build_run(spec: &RunSpec) -> Run {
    let mut run = Run::new();
    if spec.format.bold {
        run = run.bold();
    }
    if spec.format.italic {
        run = run.italic();
    }
    if spec.format.monospace {
        run = run.fonts(paragraph_fonts(MONOSPACE_FONT));
    }
    if spec.text == "\n" {
        return run.add_break(BreakType::TextWrapping);
    }
    run.add_text(spec.text.as_str())
}

fn paragraph_fonts(name: &str) -> RunFonts {
    RunFonts::new()
        .ascii(name)
        .hi_ansi(name)
        .east_asia(name)
        .cs(name)
}

#[cfg(test)]
mod tests {
    use crate::domain::styles::{PRIMARY_BODY, STRUCTURE};

    use super::super::types::{RunFormat, RunSpec};
    use super::*;

    fn spec(style: &StyleCatalog, logical: &str, runs: Vec<RunSpec>) -> ParagraphSpec {
        ParagraphSpec::new(style.resolve(logical).clone(), runs)
    }

    #[test]
    fn encodes_a_populated_document() {
        let catalog = StyleCatalog::fallback();
        let specs = vec![
            spec(&catalog, STRUCTURE, vec![RunSpec::new("Title", RunFormat::default().bold())]),
            spec(&catalog, PRIMARY_BODY, vec![RunSpec::plain("Body text")]),
        ];

        let bytes = encode(assemble(&specs, &catalog)).expect("encode");
        // DOCX files are ZIP archives; check the magic header.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn encodes_an_empty_document() {
        let catalog = StyleCatalog::fallback();
        let bytes = encode(assemble(&[], &catalog)).expect("encode");
        assert_eq!(&bytes[..2], b"PK");
    }
}
