use crate::error::TplError;
use crate::models::options::TemplateOptions;
use crate::tpl::engine::Template;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};
use tracing::warn;

#[derive(Clone)]
pub struct CachedTemplate {
    pub template: Arc<Template>,
    pub content_hash: u64,
}

/// Process-wide registry of named templates, consulted for partials that a
/// template does not carry itself.
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Returns the parsed template registered under `name`, parsing and
/// registering `content` when the name is new or its content changed.
pub fn get_or_parse(name: &str, content: &str) -> Result<Arc<Template>, TplError> {
    let new_hash = content_hash(content);

    if let Some(cached) = TEMPLATE_CACHE.get(name) {
        if cached.content_hash == new_hash {
            return Ok(cached.template.clone());
        }
    }

    let template = Arc::new(Template::parse_with(
        content,
        TemplateOptions::new().name(name),
    )?);
    let previous = TEMPLATE_CACHE.insert(
        name.to_string(),
        CachedTemplate {
            template: template.clone(),
            content_hash: new_hash,
        },
    );
    if previous.is_some() {
        warn!(name, "registered template replaced with new content");
    }
    Ok(template)
}

/// Parses and registers `content` under `name`.
pub fn register(name: &str, content: &str) -> Result<(), TplError> {
    get_or_parse(name, content).map(|_| ())
}

pub fn get(name: &str) -> Option<Arc<Template>> {
    TEMPLATE_CACHE.get(name).map(|cached| cached.template.clone())
}

pub fn remove(name: &str) -> bool {
    TEMPLATE_CACHE.remove(name).is_some()
}
