//! AST dispatch: pre-order walk over parsed block nodes emitting paragraph
//! specifications.
//!
//! The mapping is total. Headings become bold paragraphs in the "structure"
//! style, paragraphs and list items use "primary-body", and any node kind
//! without an explicit mapping is flattened to plain text rather than
//! dropped. Output paragraph order is exactly the pre-order traversal of the
//! input tree; callers rely on that.

use comrak::nodes::{AstNode, ListType, NodeValue};
use tracing::debug;

use crate::domain::styles::{PRIMARY_BODY, STRUCTURE, StyleCatalog};

use super::types::{ParagraphSpec, RunFormat, RunSpec};

const BULLET_MARKER: &str = "\u{2022} ";

/// Walk the document tree and emit one `ParagraphSpec` per block-level node.
pub fn dispatch<'a>(root: &'a AstNode<'a>, catalog: &StyleCatalog) -> Vec<ParagraphSpec> {
    let mut out = Vec::new();
    for node in root.children() {
        dispatch_block(node, catalog, &mut out);
    }
    out
}

fn dispatch_block<'a>(node: &'a AstNode<'a>, catalog: &StyleCatalog, out: &mut Vec<ParagraphSpec>) {
    let value = &node.data.borrow().value;
    match value {
        NodeValue::Heading(_) => {
            let mut runs = Vec::new();
            collect_inline(node, RunFormat::default(), &mut runs);
            // Headings keep any manual numbering; bolding the whole line is
            // what distinguishes them from body text.
            for run in &mut runs {
                run.format.bold = true;
            }
            out.push(ParagraphSpec::new(catalog.resolve(STRUCTURE).clone(), runs));
        }
        NodeValue::Paragraph => {
            let mut runs = Vec::new();
            collect_inline(node, RunFormat::default(), &mut runs);
            push_if_nonempty(
                ParagraphSpec::new(catalog.resolve(PRIMARY_BODY).clone(), runs),
                out,
            );
        }
        NodeValue::List(list) => {
            let ordered = matches!(list.list_type, ListType::Ordered);
            dispatch_list(node, ordered, list.start, catalog, out);
        }
        NodeValue::CodeBlock(block) => {
            let literal = block.literal.trim_end_matches('\n').to_string();
            if !literal.is_empty() {
                let runs = vec![RunSpec::new(literal, RunFormat::default().monospace())];
                out.push(ParagraphSpec::new(catalog.resolve(PRIMARY_BODY).clone(), runs));
            }
        }
        NodeValue::ThematicBreak | NodeValue::FrontMatter(_) => {}
        other => {
            // Unrecognized block kinds are flattened to plain text so no
            // content is silently lost.
            debug!(
                target = "application::convert",
                kind = ?std::mem::discriminant(other),
                "unhandled block node flattened to plain text"
            );
            let text = flatten_text(node);
            push_if_nonempty(
                ParagraphSpec::new(
                    catalog.resolve(PRIMARY_BODY).clone(),
                    vec![RunSpec::plain(text)],
                ),
                out,
            );
        }
    }
}

fn dispatch_list<'a>(
    list: &'a AstNode<'a>,
    ordered: bool,
    start: usize,
    catalog: &StyleCatalog,
    out: &mut Vec<ParagraphSpec>,
) {
    let mut index = start.max(1);
    for item in list.children() {
        if !matches!(
            &item.data.borrow().value,
            NodeValue::Item(_) | NodeValue::TaskItem(_)
        ) {
            continue;
        }

        let marker = if ordered {
            format!("{index}. ")
        } else {
            BULLET_MARKER.to_string()
        };
        let mut runs = vec![RunSpec::plain(marker)];
        let mut nested = Vec::new();

        for child in item.children() {
            match &child.data.borrow().value {
                NodeValue::Paragraph => collect_inline(child, RunFormat::default(), &mut runs),
                NodeValue::List(_) => nested.push(child),
                _ => {
                    let text = flatten_text(child);
                    if !text.trim().is_empty() {
                        runs.push(RunSpec::plain(text));
                    }
                }
            }
        }

        out.push(ParagraphSpec::new(catalog.resolve(PRIMARY_BODY).clone(), runs));

        // Nested lists follow their parent item, preserving pre-order.
        for child in nested {
            if let NodeValue::List(inner) = &child.data.borrow().value {
                let inner_ordered = matches!(inner.list_type, ListType::Ordered);
                dispatch_list(child, inner_ordered, inner.start, catalog, out);
            }
        }

        index += 1;
    }
}

fn collect_inline<'a>(parent: &'a AstNode<'a>, format: RunFormat, runs: &mut Vec<RunSpec>) {
    for child in parent.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => runs.push(RunSpec::new(text.clone(), format)),
            NodeValue::Strong => collect_inline(child, format.bold(), runs),
            NodeValue::Emph => collect_inline(child, format.italic(), runs),
            NodeValue::Code(code) => {
                runs.push(RunSpec::new(code.literal.clone(), format.monospace()));
            }
            NodeValue::Link(link) => {
                let label = flatten_text(child);
                runs.push(RunSpec::new(format!("{label} ({})", link.url), format));
            }
            NodeValue::SoftBreak => runs.push(RunSpec::new(" ", format)),
            NodeValue::LineBreak => runs.push(RunSpec::new("\n", format)),
            _ => {
                let text = flatten_text(child);
                if !text.is_empty() {
                    runs.push(RunSpec::new(text, format));
                }
            }
        }
    }
}

/// Concatenate the plain text of a subtree, used for unrecognized node kinds.
fn flatten_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    flatten_into(node, &mut text);
    text
}

fn flatten_into<'a>(node: &'a AstNode<'a>, text: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(value) => text.push_str(value),
        NodeValue::Code(code) => text.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
        _ => {}
    }
    for child in node.children() {
        flatten_into(child, text);
    }
}

fn push_if_nonempty(spec: ParagraphSpec, out: &mut Vec<ParagraphSpec>) {
    if !spec.text().trim().is_empty() {
        out.push(spec);
    }
}
