use thiserror::Error;

/// Errors raised while lexing, parsing or rendering a template.
#[derive(Error, Debug)]
pub enum TplError {
    #[error("{line}:{column} lexical error: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("{line}:{column} syntax error: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("failed to lookup {name}")]
    MissingVariable { name: String },
    #[error("partial {name} nested deeper than {max_depth} levels")]
    PartialDepth { name: String, max_depth: usize },
    #[error("Value error: {0}")]
    Value(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TplError {
    /// Source position of a parse failure, if this error carries one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            TplError::Lex { line, column, .. } | TplError::Syntax { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }
}

impl serde::ser::Error for TplError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TplError::Value(msg.to_string())
    }
}
