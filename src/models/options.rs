use crate::tpl::engine::Template;
use crate::tpl::lexer::{DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM};
use std::collections::HashMap;
use std::sync::Arc;

/// Settings applied once when a template is built.
#[derive(Clone)]
pub struct TemplateOptions {
    /// Name the template is registered under when used as a partial. Default `""`.
    pub name: String,
    /// Opening tag delimiter. Default `{{`.
    pub left_delim: String,
    /// Closing tag delimiter. Default `}}`.
    pub right_delim: String,
    /// Render unresolved names as nothing (`true`, default) or fail the
    /// render with [`crate::error::TplError::MissingVariable`] (`false`).
    pub silent_miss: bool,
    /// Partials visible to this template, keyed by name. Default empty.
    pub partials: HashMap<String, Arc<Template>>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        TemplateOptions {
            name: String::new(),
            left_delim: DEFAULT_LEFT_DELIM.to_string(),
            right_delim: DEFAULT_RIGHT_DELIM.to_string(),
            silent_miss: true,
            partials: HashMap::new(),
        }
    }
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_delim = left.into();
        self.right_delim = right.into();
        self
    }

    /// Registers `partial` under its own name.
    pub fn partial(mut self, partial: impl Into<Arc<Template>>) -> Self {
        let partial = partial.into();
        self.partials.insert(partial.name().to_string(), partial);
        self
    }

    /// Fail renders on unresolved names.
    pub fn errors(mut self) -> Self {
        self.silent_miss = false;
        self
    }

    pub fn silent_miss(mut self, silent_miss: bool) -> Self {
        self.silent_miss = silent_miss;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TemplateOptions::new();
        assert_eq!(options.name, "");
        assert_eq!(options.left_delim, "{{");
        assert_eq!(options.right_delim, "}}");
        assert!(options.silent_miss);
        assert!(options.partials.is_empty());
    }

    #[test]
    fn test_builder() {
        let header = Template::parse_with("{{title}}", TemplateOptions::new().name("header"))
            .unwrap();
        let options = TemplateOptions::new()
            .name("page")
            .delimiters("|", "|")
            .errors()
            .partial(header);
        assert_eq!(options.name, "page");
        assert_eq!((options.left_delim.as_str(), options.right_delim.as_str()), ("|", "|"));
        assert!(!options.silent_miss);
        assert!(options.partials.contains_key("header"));
    }
}
