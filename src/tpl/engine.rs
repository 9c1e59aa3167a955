use crate::error::TplError;
use crate::models::options::TemplateOptions;
use crate::tpl::ast::Node;
use crate::tpl::parser::Parser;
use crate::tpl::render::{PartialResolver, RenderEnv};
use crate::tpl::render_context::Context;
use crate::tpl::{cache, render};
use crate::value::{Value, to_value};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// A parsed template. Immutable once built, so one instance can be rendered
/// from many threads at once.
#[derive(Debug)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
    partials: HashMap<String, Arc<Template>>,
    silent_miss: bool,
}

impl Template {
    /// Parses `source` with default options.
    pub fn parse(source: &str) -> Result<Self, TplError> {
        Self::parse_with(source, TemplateOptions::default())
    }

    pub fn parse_with(source: &str, options: TemplateOptions) -> Result<Self, TplError> {
        let nodes =
            Parser::for_input(source, &options.left_delim, &options.right_delim).parse()?;
        debug!(name = %options.name, nodes = nodes.len(), "template parsed");
        Ok(Self {
            name: options.name,
            nodes,
            partials: options.partials,
            silent_miss: options.silent_miss,
        })
    }

    pub fn from_reader<R: Read>(mut reader: R, options: TemplateOptions) -> Result<Self, TplError> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Self::parse_with(&source, options)
    }

    pub fn from_bytes(bytes: &[u8], options: TemplateOptions) -> Result<Self, TplError> {
        let source = std::str::from_utf8(bytes)
            .map_err(|e| TplError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Self::parse_with(source, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn silent_miss(&self) -> bool {
        self.silent_miss
    }

    /// A partial registered on this template, without the registry fallback.
    pub(crate) fn own_partial(&self, name: &str) -> Option<Arc<Template>> {
        self.partials.get(name).cloned()
    }

    /// Renders against a single scope built from `data`.
    pub fn render<W: Write + ?Sized, T: Serialize + ?Sized>(
        &self,
        w: &mut W,
        data: &T,
    ) -> Result<(), TplError> {
        let value = to_value(data)?;
        self.render_stack(w, &[&value])
    }

    /// Renders against an explicit context stack, outermost scope first.
    /// Output written before a failure stays in `w`.
    pub fn render_stack<W: Write + ?Sized>(
        &self,
        w: &mut W,
        stack: &[&Value],
    ) -> Result<(), TplError> {
        let mut ctx = Context::from_stack(stack);
        let env = RenderEnv::new(self, !self.silent_miss);
        render::render(&self.nodes, &mut ctx, &env, w)
    }

    pub fn render_bytes<T: Serialize + ?Sized>(&self, data: &T) -> Result<Vec<u8>, TplError> {
        let mut buf = Vec::new();
        self.render(&mut buf, data)?;
        Ok(buf)
    }

    pub fn render_string<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, TplError> {
        let buf = self.render_bytes(data)?;
        String::from_utf8(buf).map_err(|e| TplError::Value(e.to_string()))
    }
}

impl PartialResolver for Template {
    fn get_partial(&self, name: &str) -> Option<Arc<Template>> {
        self.own_partial(name).or_else(|| cache::get(name))
    }
}

/// Renders a named template, reusing its parsed tree while the content is
/// unchanged.
pub fn render_template<T: Serialize + ?Sized>(
    template_name: &str,
    template_content: &str,
    data: &T,
) -> Result<String, TplError> {
    let template = cache::get_or_parse(template_name, template_content)?;
    template.render_string(data)
}

/// Unloads a named template from the registry.
pub fn remove_template(template_name: &str) {
    cache::remove(template_name);
}

/// Parses `reader` with default options and renders it into `w` in one go.
pub fn render_reader<R: Read, W: Write + ?Sized, T: Serialize + ?Sized>(
    reader: R,
    w: &mut W,
    data: &T,
) -> Result<(), TplError> {
    Template::from_reader(reader, TemplateOptions::default())?.render(w, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    #[derive(Serialize)]
    struct User {
        name: String,
        age: u8,
        roles: Vec<Role>,
    }

    #[derive(Serialize)]
    struct Role {
        id: i32,
        name: String,
    }

    fn user() -> User {
        User {
            name: "alice".to_string(),
            age: 18,
            roles: vec![
                Role {
                    id: 1,
                    name: "admin".to_string(),
                },
                Role {
                    id: 2,
                    name: "editor".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_render_struct() {
        let tpl = Template::parse("{{name}} is {{age}}: {{#roles}}[{{id}} {{name}}]{{/roles}}")
            .unwrap();
        assert_eq!(
            tpl.render_string(&user()).unwrap(),
            "alice is 18: [1 admin][2 editor]"
        );
    }

    #[test]
    fn test_render_stack_innermost_wins() {
        let outer = to_value(&serde_json::json!({"a": "outer", "b": "only outer"})).unwrap();
        let inner = to_value(&serde_json::json!({"a": "inner"})).unwrap();
        let tpl = Template::parse("{{a}} {{b}}").unwrap();
        let mut out = Vec::new();
        tpl.render_stack(&mut out, &[&outer, &inner]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "inner only outer");
    }

    #[test]
    fn test_partials_from_options() {
        let partial =
            Template::parse_with("{{bar}}", TemplateOptions::new().name("partial")).unwrap();
        let tpl = Template::parse_with(
            "{{#foo}}{{>partial}}{{/foo}}{{>unknown}}",
            TemplateOptions::new().partial(partial),
        )
        .unwrap();
        let out = tpl
            .render_string(&serde_json::json!({"foo": true, "bar": "bazinga!"}))
            .unwrap();
        assert_eq!(out, "bazinga!");
    }

    #[test]
    fn test_custom_delimiters_and_errors() {
        let title = Template::parse_with("{{title}}", TemplateOptions::new().name("header"))
            .unwrap();
        let body = Template::parse_with(
            "{{content}}",
            TemplateOptions::new().name("body").errors(),
        )
        .unwrap();
        let tpl = Template::parse_with(
            "|>header|\n|>body|",
            TemplateOptions::new()
                .delimiters("|", "|")
                .errors()
                .partial(title)
                .partial(body),
        )
        .unwrap();
        let out = tpl
            .render_string(&serde_json::json!({
                "title": "Mustache",
                "content": "Logic less templates with Mustache!",
            }))
            .unwrap();
        assert_eq!(out, "Mustache\nLogic less templates with Mustache!");

        let err = tpl
            .render_string(&serde_json::json!({"title": "Mustache"}))
            .unwrap_err();
        assert!(matches!(err, TplError::MissingVariable { .. }));
    }

    #[test]
    fn test_partial_resolves_its_own_partials() {
        let leaf = Template::parse_with("{{v}}", TemplateOptions::new().name("leaf")).unwrap();
        let wrapper =
            Template::parse_with("[{{>leaf}}]", TemplateOptions::new().name("wrapper").partial(leaf))
                .unwrap();
        let tpl = Template::parse_with("{{>wrapper}}", TemplateOptions::new().partial(wrapper))
            .unwrap();
        assert_eq!(
            tpl.render_string(&serde_json::json!({"v": "q"})).unwrap(),
            "[q]"
        );
    }

    #[test]
    fn test_partial_falls_back_to_including_template() {
        let leaf = Template::parse_with("leaf", TemplateOptions::new().name("leaf")).unwrap();
        let wrapper =
            Template::parse_with("[{{>leaf}}]", TemplateOptions::new().name("wrapper")).unwrap();
        let tpl = Template::parse_with(
            "{{>wrapper}}",
            TemplateOptions::new().partial(wrapper).partial(leaf),
        )
        .unwrap();
        assert_eq!(tpl.render_string(&serde_json::json!({})).unwrap(), "[leaf]");
    }

    #[test]
    fn test_partial_uses_its_own_miss_policy() {
        let lenient =
            Template::parse_with("<{{missing}}>", TemplateOptions::new().name("lenient")).unwrap();
        let tpl = Template::parse_with(
            "a{{>lenient}}b",
            TemplateOptions::new().errors().partial(lenient),
        )
        .unwrap();
        assert_eq!(tpl.render_string(&serde_json::json!({})).unwrap(), "a<>b");

        let strict = Template::parse_with(
            "<{{missing}}>",
            TemplateOptions::new().name("strict").errors(),
        )
        .unwrap();
        let tpl = Template::parse_with("a{{>strict}}b", TemplateOptions::new().partial(strict))
            .unwrap();
        let err = tpl.render_string(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, TplError::MissingVariable { ref name } if name == "missing"));
    }

    #[test]
    fn test_from_reader_and_bytes() {
        let opts = TemplateOptions::new();
        let tpl = Template::from_reader("some text {{foo}} here".as_bytes(), opts.clone()).unwrap();
        assert_eq!(
            tpl.render_string(&serde_json::json!({"foo": "bar"})).unwrap(),
            "some text bar here"
        );
        assert!(matches!(
            Template::from_bytes(&[0xff, 0xfe], opts),
            Err(TplError::Io(_))
        ));
    }

    #[test]
    fn test_render_string_keeps_multibyte_text() {
        let tpl = Template::parse("héllo {{who}} ✓").unwrap();
        let data = serde_json::json!({"who": "wörld"});
        let bytes = tpl.render_bytes(&data).unwrap();
        assert_eq!(tpl.render_string(&data).unwrap(), "héllo wörld ✓");
        assert_eq!(String::from_utf8(bytes).unwrap(), "héllo wörld ✓");
    }

    #[test]
    fn test_render_reader() {
        let mut out = Vec::new();
        render_reader("{{#a}}{{.}}{{/a}}".as_bytes(), &mut out, &serde_json::json!({"a": [1, 2]}))
            .unwrap();
        assert_eq!(out, b"12");
    }

    #[test]
    fn test_render_template_cached() {
        let data = serde_json::json!({"x": "1"});
        assert_eq!(
            render_template("engine_test_cached", "a{{x}}", &data).unwrap(),
            "a1"
        );
        assert_eq!(
            render_template("engine_test_cached", "b{{x}}", &data).unwrap(),
            "b1"
        );
        remove_template("engine_test_cached");
        assert!(cache::get("engine_test_cached").is_none());
    }

    #[test]
    fn test_template_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Template>();
    }
}
