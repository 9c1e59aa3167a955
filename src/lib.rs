//! Logic-less mustache templates.
//!
//! Template text goes through three stages: the [`tpl::lexer`] turns it into
//! tokens, the [`tpl::parser`] builds a tree of [`Node`]s, and the
//! [`tpl::render`] stage walks that tree against a stack of [`Value`] scopes.
//!
//! ```
//! use ustache::Template;
//!
//! let tpl = Template::parse("{{#list}}({{.}}){{/list}}").unwrap();
//! let out = tpl.render_string(&serde_json::json!({"list": ["a", "b"]})).unwrap();
//! assert_eq!(out, "(a)(b)");
//! ```

pub mod error;
pub mod models;
pub mod template_loader;
pub mod tpl;
pub mod value;

pub use error::TplError;
pub use models::options::TemplateOptions;
pub use tpl::ast::Node;
pub use tpl::engine::{Template, remove_template, render_reader, render_template};
pub use tpl::render::PartialResolver;
pub use value::{Value, to_value};

#[doc(hidden)]
pub use ctor;
pub use ustache_macros::template_assets;
