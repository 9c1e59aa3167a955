pub mod ast;
pub mod cache;
pub mod engine;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod render_context;
