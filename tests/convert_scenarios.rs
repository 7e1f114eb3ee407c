//! End-to-end conversion scenarios from markdown source to styled output.

use scrivano::application::convert::{ParagraphSpec, convert_markdown, render_document};
use scrivano::application::templates::load_catalog;
use scrivano::domain::styles::StyleCatalog;

const TEMPLATE: &str = r#"
default = "body"

[styles.body]
font = "Calibri"
size = 22

[styles.heading]
size = 28
bold = true

[aliases]
structure = "heading"
primary-body = "body"
"#;

fn texts(specs: &[ParagraphSpec]) -> Vec<String> {
    specs.iter().map(ParagraphSpec::text).collect()
}

#[test]
fn mixed_document_emits_styled_paragraphs_in_order() {
    let catalog = StyleCatalog::from_template(TEMPLATE).expect("valid template");
    let specs = convert_markdown("# Title\n\n- item1\n- item2\n\nBody text\n", &catalog);

    assert_eq!(
        texts(&specs),
        vec!["Title", "\u{2022} item1", "\u{2022} item2", "Body text"]
    );

    assert_eq!(specs[0].style.as_str(), "heading");
    assert!(specs[0].runs.iter().all(|run| run.format.bold));
    for spec in &specs[1..] {
        assert_eq!(spec.style.as_str(), "body");
    }
}

#[test]
fn template_without_structure_style_degrades_to_default() {
    let template = r#"
default = "body"

[styles.body]
font = "Calibri"

[aliases]
primary-body = "body"
"#;
    let catalog = StyleCatalog::from_template(template).expect("valid template");
    let specs = convert_markdown("# Heading\n\nBody\n", &catalog);

    // The heading resolves to the default style instead of failing, but it
    // keeps its bold formatting.
    assert_eq!(specs[0].style.as_str(), "body");
    assert!(specs[0].runs[0].format.bold);
    assert_eq!(specs[1].style.as_str(), "body");
}

#[test]
fn formatting_and_structure_survive_to_run_level() {
    let catalog = StyleCatalog::fallback();
    let specs = convert_markdown(
        "## Agenda\n\n1. **decide** on _names_\n2. ship `v1`\n\n---\n\nsee [notes](https://example.com/n)\n",
        &catalog,
    );

    assert_eq!(
        texts(&specs),
        vec![
            "Agenda",
            "1. decide on names",
            "2. ship v1",
            "see notes (https://example.com/n)",
        ]
    );

    let first_item = &specs[1];
    assert!(first_item.runs[1].format.bold);
    assert!(first_item.runs[3].format.italic);
    let second_item = &specs[2];
    assert!(second_item.runs[2].format.monospace);
}

#[test]
fn rendered_document_is_a_zip_container() {
    let catalog = StyleCatalog::from_template(TEMPLATE).expect("valid template");
    let bytes =
        render_document("# Report\n\nSome body text.\n", &catalog).expect("encode document");

    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn catalog_loaded_from_disk_matches_inline_template() {
    let dir = tempfile::tempdir().expect("template dir");
    std::fs::write(dir.path().join("bhk.toml"), TEMPLATE).expect("write template");

    let catalog = load_catalog(dir.path(), "bhk").await;
    let specs = convert_markdown("# Title\n\nBody\n", &catalog);

    assert_eq!(specs[0].style.as_str(), "heading");
    assert_eq!(specs[1].style.as_str(), "body");
}

#[tokio::test]
async fn missing_template_still_converts() {
    let dir = tempfile::tempdir().expect("template dir");
    let catalog = load_catalog(dir.path(), "missing").await;

    let bytes = render_document("# Title\n\nBody\n", &catalog).expect("encode document");
    assert_eq!(&bytes[..2], b"PK");
}
