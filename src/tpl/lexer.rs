//! Streaming tokenizer for mustache templates.
//!
//! The lexer is a small state machine over the input's characters. Tokens are
//! produced on demand: each call to [`Lexer::next_token`] advances the machine
//! only until at least one token is available. Delimiter redefinition tags
//! (`{{=<% %>=}}`) are consumed here and never reach the parser.

use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_LEFT_DELIM: &str = "{{";
pub const DEFAULT_RIGHT_DELIM: &str = "}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Error,
    EndOfInput,
    Identifier,
    LeftDelimiter,
    RightDelimiter,
    Text,
    Comment,
    SectionStart,
    SectionInverseStart,
    SectionEnd,
    RawStart,
    RawEnd,
    RawAlt,
    Partial,
}

impl TokenKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, TokenKind::Error | TokenKind::EndOfInput)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Error => "error",
            TokenKind::EndOfInput => "end of input",
            TokenKind::Identifier => "identifier",
            TokenKind::LeftDelimiter => "left delimiter",
            TokenKind::RightDelimiter => "right delimiter",
            TokenKind::Text => "text",
            TokenKind::Comment => "comment",
            TokenKind::SectionStart => "section start",
            TokenKind::SectionInverseStart => "inverted section start",
            TokenKind::SectionEnd => "section end",
            TokenKind::RawStart => "raw start",
            TokenKind::RawEnd => "raw end",
            TokenKind::RawAlt => "raw alt",
            TokenKind::Partial => "partial",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.kind, self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    LeftDelim,
    RightDelim,
    Tag,
    Ident,
    Comment,
    SetDelim,
    Done,
}

pub struct Lexer<'a> {
    input: &'a str,
    left_delim: String,
    right_delim: String,
    state: State,
    pos: usize,
    start: usize,
    pending: VecDeque<Token>,
    terminal: Option<Token>,
    // Forward-only cursor for line/column bookkeeping.
    line: usize,
    line_start: usize,
    counted: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, left_delim: &str, right_delim: &str) -> Self {
        let mut lexer = Self {
            input,
            left_delim: left_delim.to_string(),
            right_delim: right_delim.to_string(),
            state: State::Text,
            pos: 0,
            start: 0,
            pending: VecDeque::with_capacity(2),
            terminal: None,
            line: 1,
            line_start: 0,
            counted: 0,
        };
        if left_delim.is_empty() || right_delim.is_empty() {
            lexer.state = lexer.error("delimiters must not be empty");
        }
        lexer
    }

    /// Returns the next token. Once the stream has ended with
    /// [`TokenKind::EndOfInput`] or [`TokenKind::Error`], every further call
    /// returns that same terminal token.
    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return token;
            }
            if let Some(terminal) = &self.terminal {
                return terminal.clone();
            }
            self.state = self.step();
        }
    }

    fn step(&mut self) -> State {
        match self.state {
            State::Text => self.lex_text(),
            State::LeftDelim => self.lex_left_delim(),
            State::RightDelim => self.lex_right_delim(),
            State::Tag => self.lex_tag(),
            State::Ident => self.lex_ident(),
            State::Comment => self.lex_comment(),
            State::SetDelim => self.lex_set_delim(),
            State::Done => {
                // Only reachable if a terminal token was never recorded.
                self.error("lexer stopped without a terminal token")
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Line and column (both 1-based) of a byte offset. Offsets must not move
    /// backwards between calls.
    fn position(&mut self, offset: usize) -> (usize, usize) {
        let offset = offset.max(self.counted);
        for (i, b) in self.input[self.counted..offset].bytes().enumerate() {
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.counted + i + 1;
            }
        }
        self.counted = offset;
        let column = self.input[self.line_start..offset].chars().count() + 1;
        (self.line, column)
    }

    fn emit(&mut self, kind: TokenKind) {
        let (line, column) = self.position(self.start);
        let text = &self.input[self.start..self.pos];
        let token = Token::new(kind, text, line, column);
        if kind.is_terminal() {
            self.terminal = Some(token.clone());
        }
        self.pending.push_back(token);
        self.start = self.pos;
    }

    fn ignore(&mut self) {
        self.start = self.pos;
    }

    fn error(&mut self, message: impl Into<String>) -> State {
        let (line, column) = self.position(self.pos);
        let token = Token::new(TokenKind::Error, message, line, column);
        self.terminal = Some(token.clone());
        self.pending.push_back(token);
        State::Done
    }

    fn lex_text(&mut self) -> State {
        match self.rest().find(self.left_delim.as_str()) {
            Some(i) => {
                self.pos += i;
                if self.pos > self.start {
                    self.emit(TokenKind::Text);
                }
                State::LeftDelim
            }
            None => {
                self.pos = self.input.len();
                if self.pos > self.start {
                    self.emit(TokenKind::Text);
                }
                self.emit(TokenKind::EndOfInput);
                State::Done
            }
        }
    }

    fn lex_left_delim(&mut self) -> State {
        self.pos += self.left_delim.len();
        if self.peek_char() == Some('=') {
            self.pos += 1;
            self.ignore();
            return State::SetDelim;
        }
        self.emit(TokenKind::LeftDelimiter);
        State::Tag
    }

    fn lex_right_delim(&mut self) -> State {
        self.pos += self.right_delim.len();
        self.emit(TokenKind::RightDelimiter);
        State::Text
    }

    fn at_raw_close(&self) -> bool {
        let rest = self.rest();
        rest.starts_with('}') && rest[1..].starts_with(self.right_delim.as_str())
    }

    fn lex_tag(&mut self) -> State {
        if self.at_raw_close() {
            self.pos += 1;
            self.emit(TokenKind::RawEnd);
            return State::RightDelim;
        }
        if self.rest().starts_with(self.right_delim.as_str()) {
            return State::RightDelim;
        }
        match self.next_char() {
            None | Some('\n') => return self.error("unclosed action"),
            Some(c) if is_space(c) => self.ignore(),
            Some('!') => {
                self.emit(TokenKind::Comment);
                return State::Comment;
            }
            Some('#') => self.emit(TokenKind::SectionStart),
            Some('^') => self.emit(TokenKind::SectionInverseStart),
            Some('/') => self.emit(TokenKind::SectionEnd),
            Some('&') => self.emit(TokenKind::RawAlt),
            Some('>') => self.emit(TokenKind::Partial),
            Some('{') => self.emit(TokenKind::RawStart),
            Some(c) if is_ident_start(c) => {
                self.pos -= c.len_utf8();
                return State::Ident;
            }
            Some(c) => {
                return self.error(format!("unrecognized character in action: {:?}", c));
            }
        }
        State::Tag
    }

    /// Identifiers run until whitespace or a closing sequence, so anything
    /// that is not a close (`a}a`, `x-y`) stays part of the name.
    fn lex_ident(&mut self) -> State {
        loop {
            if self.at_raw_close() || self.rest().starts_with(self.right_delim.as_str()) {
                break;
            }
            match self.peek_char() {
                Some(c) if !is_space(c) => {
                    self.pos += c.len_utf8();
                }
                _ => break,
            }
        }
        self.emit(TokenKind::Identifier);
        State::Tag
    }

    fn lex_comment(&mut self) -> State {
        match self.rest().find(self.right_delim.as_str()) {
            Some(i) => {
                self.pos += i;
                self.emit(TokenKind::Text);
                State::RightDelim
            }
            None => self.error("unclosed comment"),
        }
    }

    fn lex_set_delim(&mut self) -> State {
        let end = format!("={}", self.right_delim);
        let Some(i) = self.rest().find(&end) else {
            return self.error("unclosed set delimiter tag");
        };
        let body = &self.rest()[..i];
        let mut slots: [Option<&str>; 2] = [None, None];
        for (n, field) in body.split_whitespace().enumerate() {
            if n >= slots.len() {
                return self.error(format!("unexpected set delimiter field {:?}", field));
            }
            slots[n] = Some(field);
        }
        let [Some(left), Some(right)] = slots else {
            return self.error("set delimiters should be two fields separated by whitespace");
        };
        self.left_delim = left.to_string();
        self.right_delim = right.to_string();
        self.pos += i + end.len();
        self.ignore();
        State::Text
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '.' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(input: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new(input, DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind.is_terminal();
            out.push((token.kind, token.text));
            if done {
                return out;
            }
        }
    }

    fn t(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_raw_and_comment() {
        use TokenKind::*;
        assert_eq!(
            lex("foo {{{bar}}} baz {{! this is ignored }}"),
            vec![
                t(Text, "foo "),
                t(LeftDelimiter, "{{"),
                t(RawStart, "{"),
                t(Identifier, "bar"),
                t(RawEnd, "}"),
                t(RightDelimiter, "}}"),
                t(Text, " baz "),
                t(LeftDelimiter, "{{"),
                t(Comment, "!"),
                t(Text, " this is ignored "),
                t(RightDelimiter, "}}"),
                t(EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_set_delimiters_are_invisible() {
        use TokenKind::*;
        assert_eq!(
            lex("foo {{bar}} baz {{=| |=}} |foo| |={{ }}=| {{bar}}"),
            vec![
                t(Text, "foo "),
                t(LeftDelimiter, "{{"),
                t(Identifier, "bar"),
                t(RightDelimiter, "}}"),
                t(Text, " baz "),
                t(Text, " "),
                t(LeftDelimiter, "|"),
                t(Identifier, "foo"),
                t(RightDelimiter, "|"),
                t(Text, " "),
                t(Text, " "),
                t(LeftDelimiter, "{{"),
                t(Identifier, "bar"),
                t(RightDelimiter, "}}"),
                t(EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_sigils_and_whitespace() {
        use TokenKind::*;
        assert_eq!(
            lex("{{# list }}{{^ x}}{{/x}}{{& y}}{{> p}}"),
            vec![
                t(LeftDelimiter, "{{"),
                t(SectionStart, "#"),
                t(Identifier, "list"),
                t(RightDelimiter, "}}"),
                t(LeftDelimiter, "{{"),
                t(SectionInverseStart, "^"),
                t(Identifier, "x"),
                t(RightDelimiter, "}}"),
                t(LeftDelimiter, "{{"),
                t(SectionEnd, "/"),
                t(Identifier, "x"),
                t(RightDelimiter, "}}"),
                t(LeftDelimiter, "{{"),
                t(RawAlt, "&"),
                t(Identifier, "y"),
                t(RightDelimiter, "}}"),
                t(LeftDelimiter, "{{"),
                t(Partial, ">"),
                t(Identifier, "p"),
                t(RightDelimiter, "}}"),
                t(EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_permissive_identifier() {
        use TokenKind::*;
        assert_eq!(
            lex("{{a}a}}{{a.b_c}}"),
            vec![
                t(LeftDelimiter, "{{"),
                t(Identifier, "a}a"),
                t(RightDelimiter, "}}"),
                t(LeftDelimiter, "{{"),
                t(Identifier, "a.b_c"),
                t(RightDelimiter, "}}"),
                t(EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_unclosed_action() {
        let tokens = lex("{{foo}");
        let last = tokens.last().unwrap();
        assert_eq!(last.0, TokenKind::Error);
        assert_eq!(last.1, "unclosed action");

        let tokens = lex("{{foo\n}}");
        assert_eq!(tokens.last().unwrap().0, TokenKind::Error);
    }

    #[test]
    fn test_unrecognized_character() {
        let tokens = lex("{{%foo}}");
        let last = tokens.last().unwrap();
        assert_eq!(last.0, TokenKind::Error);
        assert!(last.1.contains("unrecognized character"));
    }

    #[test]
    fn test_unclosed_comment() {
        let tokens = lex("a {{! never closed");
        assert_eq!(tokens.last().unwrap(), &t(TokenKind::Error, "unclosed comment"));
    }

    #[test]
    fn test_set_delimiter_field_count() {
        assert_eq!(lex("{{=|=}}").last().unwrap().0, TokenKind::Error);
        assert_eq!(lex("{{=| | |=}}").last().unwrap().0, TokenKind::Error);
        assert_eq!(lex("{{=| |").last().unwrap().0, TokenKind::Error);
        assert_eq!(
            lex("{{=<% %>=}}<%x%>"),
            vec![
                t(TokenKind::LeftDelimiter, "<%"),
                t(TokenKind::Identifier, "x"),
                t(TokenKind::RightDelimiter, "%>"),
                t(TokenKind::EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_terminal_token_repeats() {
        let mut lexer = Lexer::new("text", DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM);
        assert_eq!(lexer.next_token().kind, TokenKind::Text);
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::EndOfInput);
        }

        let mut lexer = Lexer::new("{{", DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM);
        assert_eq!(lexer.next_token().kind, TokenKind::LeftDelimiter);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("ab\ncd {{x}}", DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM);
        let text = lexer.next_token();
        assert_eq!((text.line, text.column), (1, 1));
        let left = lexer.next_token();
        assert_eq!((left.line, left.column), (2, 4));
        let ident = lexer.next_token();
        assert_eq!((ident.line, ident.column), (2, 6));
    }

    #[test]
    fn test_empty_delimiters_rejected() {
        let mut lexer = Lexer::new("x", "", "}}");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
    }
}
