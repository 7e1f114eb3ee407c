//! Template loading for conversions.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::domain::styles::StyleCatalog;

/// Load the style catalog for the requested style set.
///
/// Total: a missing or malformed template file degrades to the fallback
/// catalog with a diagnostic, it never fails the conversion that asked for
/// it.
pub async fn load_catalog(template_dir: &Path, style_set: &str) -> StyleCatalog {
    let path = template_path(template_dir, style_set);

    let source = match fs::read_to_string(&path).await {
        Ok(source) => source,
        Err(err) => {
            warn!(
                target = "application::templates",
                style_set,
                path = %path.display(),
                error = %err,
                "template unavailable; using fallback catalog"
            );
            return StyleCatalog::fallback();
        }
    };

    match StyleCatalog::from_template(&source) {
        Ok(catalog) => {
            debug!(
                target = "application::templates",
                style_set,
                path = %path.display(),
                "template loaded"
            );
            catalog
        }
        Err(err) => {
            warn!(
                target = "application::templates",
                style_set,
                path = %path.display(),
                error = %err,
                "template rejected; using fallback catalog"
            );
            StyleCatalog::fallback()
        }
    }
}

fn template_path(template_dir: &Path, style_set: &str) -> PathBuf {
    // Only bare names select a template; anything path-like falls through to
    // a read error and the fallback catalog.
    template_dir.join(format!("{style_set}.toml"))
}
