//! Intermediate paragraph/run specifications produced by the dispatcher and
//! consumed immediately by the assembler. Never persisted.

use crate::domain::styles::StyleId;

/// Formatting flags inherited down a span tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

impl RunFormat {
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn monospace(mut self) -> Self {
        self.monospace = true;
        self
    }
}

/// One run of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub text: String,
    pub format: RunFormat,
}

impl RunSpec {
    pub fn new(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunFormat::default())
    }
}

/// One output paragraph: a concrete style id followed by ordered runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSpec {
    pub style: StyleId,
    pub runs: Vec<RunSpec>,
}

impl ParagraphSpec {
    pub fn new(style: StyleId, runs: Vec<RunSpec>) -> Self {
        Self { style, runs }
    }

    /// Concatenated text of all runs, used for emptiness checks and tests.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}
