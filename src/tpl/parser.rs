//! Recursive-descent parser from tokens to a [`Node`] tree.
//!
//! Section bodies are collected as token spans and parsed again by a
//! sub-parser that owns the span, so nested sections never share parser
//! state with their parent.

use crate::error::TplError;
use crate::tpl::ast::Node;
use crate::tpl::lexer::{Lexer, Token, TokenKind};
use std::collections::VecDeque;

/// Sections nested deeper than this are rejected at parse time.
pub const MAX_SECTION_DEPTH: usize = 100;

/// Anything that hands out tokens one at a time and keeps repeating its
/// terminal token once exhausted.
pub trait TokenSource {
    fn next_token(&mut self) -> Token;
}

impl TokenSource for Lexer<'_> {
    fn next_token(&mut self) -> Token {
        Lexer::next_token(self)
    }
}

/// A pre-lexed span ending in a synthetic end-of-input token.
pub struct TokenBuffer {
    tokens: std::vec::IntoIter<Token>,
    eof: Token,
}

impl TokenBuffer {
    pub fn new(tokens: Vec<Token>) -> Self {
        let (line, column) = tokens
            .last()
            .map(|t| (t.line, t.column + t.text.chars().count()))
            .unwrap_or((1, 1));
        Self {
            tokens: tokens.into_iter(),
            eof: Token::new(TokenKind::EndOfInput, "", line, column),
        }
    }
}

impl TokenSource for TokenBuffer {
    fn next_token(&mut self) -> Token {
        match self.tokens.next() {
            Some(token) if token.kind.is_terminal() => {
                self.eof = token.clone();
                token
            }
            Some(token) => token,
            None => self.eof.clone(),
        }
    }
}

pub struct Parser<S> {
    source: S,
    buf: VecDeque<Token>,
    /// Number of sections enclosing the tokens of `source`.
    depth: usize,
}

impl<'a> Parser<Lexer<'a>> {
    pub fn for_input(input: &'a str, left_delim: &str, right_delim: &str) -> Self {
        Parser::new(Lexer::new(input, left_delim, right_delim))
    }
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Self::nested(source, 0)
    }

    fn nested(source: S, depth: usize) -> Self {
        Self {
            source,
            buf: VecDeque::new(),
            depth,
        }
    }

    /// Consumes and returns the next token.
    fn read(&mut self) -> Token {
        match self.buf.pop_front() {
            Some(token) => token,
            None => self.source.next_token(),
        }
    }

    /// Looks at the next token without consuming it.
    fn peek(&mut self) -> &Token {
        if self.buf.is_empty() {
            let token = self.source.next_token();
            self.buf.push_back(token);
        }
        &self.buf[0]
    }

    /// Consumes tokens up to and including the first one of `kind`.
    fn read_until(&mut self, kind: TokenKind) -> Result<Vec<Token>, TplError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.read();
            match token.kind {
                k if k == kind => {
                    tokens.push(token);
                    return Ok(tokens);
                }
                TokenKind::Error => return Err(lex_error(&token)),
                TokenKind::EndOfInput => {
                    return Err(syntax_error(
                        &token,
                        format!("unexpected end of input, expected {}", kind),
                    ));
                }
                _ => tokens.push(token),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, TplError> {
        let token = self.read();
        if token.kind == kind {
            return Ok(token);
        }
        match token.kind {
            TokenKind::Error => Err(lex_error(&token)),
            _ => Err(syntax_error(
                &token,
                format!("unexpected token {}, expected {}", token, kind),
            )),
        }
    }

    pub fn parse(mut self) -> Result<Vec<Node>, TplError> {
        let mut nodes = Vec::new();
        loop {
            let token = self.read();
            match token.kind {
                TokenKind::EndOfInput => break,
                TokenKind::Error => return Err(lex_error(&token)),
                TokenKind::Text => nodes.push(Node::Text(token.text)),
                TokenKind::LeftDelimiter => nodes.push(self.parse_tag()?),
                _ => {
                    return Err(syntax_error(
                        &token,
                        format!("unexpected token {}", token),
                    ));
                }
            }
        }
        Ok(nodes)
    }

    /// Parses a tag body. The left delimiter has already been read.
    fn parse_tag(&mut self) -> Result<Node, TplError> {
        let token = self.read();
        match token.kind {
            TokenKind::Identifier => {
                self.expect(TokenKind::RightDelimiter)?;
                Ok(Node::Variable {
                    name: token.text,
                    escape: true,
                })
            }
            TokenKind::RawStart => {
                let ident = self.expect(TokenKind::Identifier)?;
                self.expect(TokenKind::RawEnd)?;
                self.expect(TokenKind::RightDelimiter)?;
                Ok(Node::Variable {
                    name: ident.text,
                    escape: false,
                })
            }
            TokenKind::RawAlt => {
                let ident = self.expect(TokenKind::Identifier)?;
                self.expect(TokenKind::RightDelimiter)?;
                Ok(Node::Variable {
                    name: ident.text,
                    escape: false,
                })
            }
            TokenKind::Comment => self.parse_comment(),
            TokenKind::SectionStart => self.parse_section(false),
            TokenKind::SectionInverseStart => self.parse_section(true),
            TokenKind::Partial => {
                let ident = self.expect(TokenKind::Identifier)?;
                self.expect(TokenKind::RightDelimiter)?;
                Ok(Node::Partial { name: ident.text })
            }
            TokenKind::Error => Err(lex_error(&token)),
            _ => Err(syntax_error(
                &token,
                format!("unexpected token {} in tag", token),
            )),
        }
    }

    fn parse_comment(&mut self) -> Result<Node, TplError> {
        let mut comment = String::new();
        loop {
            let token = self.read();
            match token.kind {
                TokenKind::RightDelimiter => return Ok(Node::Comment(comment)),
                TokenKind::Error => return Err(lex_error(&token)),
                TokenKind::EndOfInput => {
                    return Err(syntax_error(&token, "unexpected end of input in comment"));
                }
                _ => comment.push_str(&token.text),
            }
        }
    }

    /// Collects the section body up to the close tag carrying the same name.
    ///
    /// Close tags of other sections are folded into the body. Openers of the
    /// same name inside the body raise the depth, so their closes are folded
    /// in as well.
    fn parse_section(&mut self, inverted: bool) -> Result<Node, TplError> {
        let name = self.expect(TokenKind::Identifier)?;
        if self.depth >= MAX_SECTION_DEPTH {
            return Err(syntax_error(
                &name,
                format!("sections nested deeper than {}", MAX_SECTION_DEPTH),
            ));
        }
        self.expect(TokenKind::RightDelimiter)?;

        let mut body = Vec::new();
        let mut depth = 0usize;
        loop {
            let mut span = match self.read_until(TokenKind::SectionEnd) {
                Ok(span) => span,
                Err(TplError::Syntax { .. }) => {
                    return Err(syntax_error(
                        &name,
                        format!("unclosed section {}", name.text),
                    ));
                }
                Err(e) => return Err(e),
            };
            depth += count_openers(&span, &name.text);

            let closes_name = {
                let next = self.peek();
                next.kind == TokenKind::Identifier && next.text == name.text
            };
            if closes_name {
                if depth == 0 {
                    let len = span.len();
                    if len < 2 || span[len - 2].kind != TokenKind::LeftDelimiter {
                        return Err(syntax_error(&span[len - 1], "malformed section end"));
                    }
                    span.truncate(len - 2);
                    body.append(&mut span);
                    break;
                }
                depth -= 1;
            }
            body.append(&mut span);
        }
        self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::RightDelimiter)?;

        let children = Parser::nested(TokenBuffer::new(body), self.depth + 1).parse()?;
        Ok(Node::Section {
            name: name.text,
            inverted,
            children,
        })
    }
}

fn count_openers(span: &[Token], name: &str) -> usize {
    span.windows(2)
        .filter(|pair| {
            matches!(
                pair[0].kind,
                TokenKind::SectionStart | TokenKind::SectionInverseStart
            ) && pair[1].kind == TokenKind::Identifier
                && pair[1].text == name
        })
        .count()
}

fn lex_error(token: &Token) -> TplError {
    TplError::Lex {
        line: token.line,
        column: token.column,
        message: token.text.clone(),
    }
}

fn syntax_error(token: &Token, message: impl Into<String>) -> TplError {
    TplError::Syntax {
        line: token.line,
        column: token.column,
        message: message.into(),
    }
}
