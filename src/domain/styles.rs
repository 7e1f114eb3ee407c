//! Style catalogs: logical style names resolved to concrete template styles.
//!
//! A catalog is loaded once per conversion from a TOML template and is fully
//! pre-resolved: every alias points at a defined style, so `resolve` performs
//! a plain map lookup with no I/O and can never fail. Unknown logical names
//! fall back to the catalog's default identifier with a diagnostic.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Logical style name used for headings.
pub const STRUCTURE: &str = "structure";

/// Logical style name used for body paragraphs and list items.
pub const PRIMARY_BODY: &str = "primary-body";

const FALLBACK_STYLE_ID: &str = "Standard";

/// Identifier of a concrete paragraph style defined by the template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyleId(String);

impl StyleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StyleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Concrete formatting carried by a template style.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleDefinition {
    pub font: Option<String>,
    /// Font size in half-points, as stored in DOCX.
    pub size: Option<usize>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// The set of named styles available from a loaded template, plus a default.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    aliases: HashMap<String, StyleId>,
    definitions: BTreeMap<String, StyleDefinition>,
    default: StyleId,
    template_loaded: bool,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("template default style `{0}` is not defined")]
    UnknownDefault(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    default: String,
    #[serde(default)]
    styles: BTreeMap<String, StyleDefinition>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl StyleCatalog {
    /// Catalog used when no template is available: a single default style,
    /// every lookup resolves to it without per-lookup diagnostics.
    pub fn fallback() -> Self {
        let mut definitions = BTreeMap::new();
        definitions.insert(FALLBACK_STYLE_ID.to_string(), StyleDefinition::default());
        Self {
            aliases: HashMap::new(),
            definitions,
            default: StyleId(FALLBACK_STYLE_ID.to_string()),
            template_loaded: false,
        }
    }

    /// Parse a TOML template into a pre-resolved catalog.
    ///
    /// Aliases pointing at undefined styles are dropped with a diagnostic so
    /// later lookups hit the default without re-checking the template.
    pub fn from_template(source: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile = toml::from_str(source)?;

        if !file.styles.contains_key(&file.default) {
            return Err(TemplateError::UnknownDefault(file.default));
        }

        let mut aliases = HashMap::new();
        for (logical, concrete) in file.aliases {
            if file.styles.contains_key(&concrete) {
                aliases.insert(logical, StyleId(concrete));
            } else {
                warn!(
                    target = "domain::styles",
                    logical, concrete, "alias targets an undefined style; dropped"
                );
            }
        }

        Ok(Self {
            aliases,
            definitions: file.styles,
            default: StyleId(file.default),
            template_loaded: true,
        })
    }

    /// Resolve a logical style name to a concrete style id.
    ///
    /// Total: unknown names yield the default id. A miss against a loaded
    /// template is a diagnostic, not an error.
    pub fn resolve(&self, logical: &str) -> &StyleId {
        match self.aliases.get(logical) {
            Some(id) => id,
            None => {
                if self.template_loaded {
                    warn!(
                        target = "domain::styles",
                        logical,
                        default = %self.default,
                        "style not found in template; using default"
                    );
                    metrics::counter!("scrivano_style_fallback_total").increment(1);
                } else {
                    debug!(target = "domain::styles", logical, "no template loaded");
                }
                &self.default
            }
        }
    }

    pub fn default_style(&self) -> &StyleId {
        &self.default
    }

    /// All concrete style definitions, in stable order, for registration into
    /// the output document shell.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &StyleDefinition)> {
        self.definitions
            .iter()
            .map(|(id, def)| (id.as_str(), def))
    }
}
