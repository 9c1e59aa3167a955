use crate::tpl::cache;
use crate::tpl::engine::Template;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

pub const TEMPLATE_EXTENSION: &str = "mustache";

/// Registers embedded `(path, content)` assets under their file stems.
///
/// Called by [`crate::template_assets!`] before `main` runs.
pub fn load_assets(assets: Vec<(&str, &str)>) -> Result<()> {
    let mut seen = HashSet::new();
    for (path, content) in assets {
        register_source(Path::new(path), content, &mut seen)?;
    }
    Ok(())
}

pub fn find_template(name: &str) -> Option<Arc<Template>> {
    cache::get(name)
}

/// Recursively registers every `*.mustache` file below `dir_path`.
/// Returns the number of templates registered.
pub fn load_from_path(dir_path: &Path) -> Result<usize> {
    let mut seen = HashSet::new();
    for entry in WalkDir::new(dir_path).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read template: {}", path.display()))?;
            register_source(path, &content, &mut seen)?;
        }
    }
    Ok(seen.len())
}

fn register_source(path: &Path, content: &str, seen: &mut HashSet<String>) -> Result<()> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("template path has no usable name: {}", path.display()))?
        .to_string();

    if !seen.insert(name.clone()) {
        anyhow::bail!(
            "duplicate template name '{}' (from '{}')",
            name,
            path.display()
        );
    }
    cache::register(&name, content)
        .with_context(|| format!("failed to parse template: {}", path.display()))?;
    debug!(name = %name, source = %path.display(), "template registered");
    Ok(())
}
