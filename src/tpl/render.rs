use crate::error::TplError;
use crate::tpl::ast::Node;
use crate::tpl::engine::Template;
use crate::tpl::render_context::Context;
use crate::value::Value;
use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, trace};

/// Partials nested deeper than this abort the render.
pub const MAX_PARTIAL_DEPTH: usize = 64;

/// Supplies partial templates by name at render time.
pub trait PartialResolver {
    fn get_partial(&self, name: &str) -> Option<Arc<Template>>;
}

/// Resolves through an included template's own partials first, then through
/// whatever resolved the template itself.
struct ScopedPartials<'r> {
    template: &'r Template,
    parent: &'r dyn PartialResolver,
}

impl PartialResolver for ScopedPartials<'_> {
    fn get_partial(&self, name: &str) -> Option<Arc<Template>> {
        self.template
            .own_partial(name)
            .or_else(|| self.parent.get_partial(name))
    }
}

/// Settings for the template currently being rendered. A partial gets its own
/// copy carrying its own policy and partial scope.
#[derive(Clone, Copy)]
pub struct RenderEnv<'r> {
    pub partials: &'r dyn PartialResolver,
    /// Report unresolved variables and sections instead of rendering nothing.
    pub strict: bool,
    pub partial_depth: usize,
}

impl<'r> RenderEnv<'r> {
    pub fn new(partials: &'r dyn PartialResolver, strict: bool) -> Self {
        Self {
            partials,
            strict,
            partial_depth: 0,
        }
    }
}

fn missing(name: &str, env: &RenderEnv) -> Result<(), TplError> {
    if env.strict {
        return Err(TplError::MissingVariable {
            name: name.to_string(),
        });
    }
    debug!(name, "unresolved name rendered as empty");
    Ok(())
}

pub fn render<'a, W: Write + ?Sized>(
    nodes: &[Node],
    ctx: &mut Context<'a>,
    env: &RenderEnv,
    w: &mut W,
) -> Result<(), TplError> {
    for node in nodes {
        match node {
            Node::Text(t) => w.write_all(t.as_bytes())?,
            Node::Variable { name, escape } => match ctx.lookup(name) {
                Some(v) => {
                    let text = text_of(v);
                    if *escape {
                        w.write_all(escape_html(&text).as_bytes())?;
                    } else {
                        w.write_all(text.as_bytes())?;
                    }
                }
                None => missing(name, env)?,
            },
            Node::Section {
                name,
                inverted,
                children,
            } => render_section(name, *inverted, children, ctx, env, w)?,
            Node::Comment(_) => {}
            Node::Partial { name } => match env.partials.get_partial(name) {
                Some(partial) => {
                    if env.partial_depth >= MAX_PARTIAL_DEPTH {
                        return Err(TplError::PartialDepth {
                            name: name.clone(),
                            max_depth: MAX_PARTIAL_DEPTH,
                        });
                    }
                    let scoped = ScopedPartials {
                        template: &partial,
                        parent: env.partials,
                    };
                    let nested = RenderEnv {
                        partials: &scoped,
                        strict: !partial.silent_miss(),
                        partial_depth: env.partial_depth + 1,
                    };
                    trace!(name, depth = nested.partial_depth, "rendering partial");
                    render(partial.nodes(), ctx, &nested, w)?;
                }
                None => trace!(name, "partial not found, skipped"),
            },
        }
    }
    Ok(())
}

fn render_section<'a, W: Write + ?Sized>(
    name: &str,
    inverted: bool,
    children: &[Node],
    ctx: &mut Context<'a>,
    env: &RenderEnv,
    w: &mut W,
) -> Result<(), TplError> {
    let value = ctx.lookup(name);
    let truthy = value.is_some_and(Value::is_truthy);

    if inverted {
        if !truthy {
            render(children, ctx, env, w)?;
        }
        return Ok(());
    }

    let Some(value) = value else {
        return missing(name, env);
    };
    if !truthy {
        return Ok(());
    }

    match value.as_list() {
        Some(items) => {
            trace!(name, len = items.len(), "iterating section");
            for item in items {
                ctx.push(item);
                let result = render(children, ctx, env, w);
                ctx.pop();
                result?;
            }
        }
        None => {
            ctx.push(value);
            let result = render(children, ctx, env, w);
            ctx.pop();
            result?;
        }
    }
    Ok(())
}

fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Str(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
