//! Lexer: tokenizes case model text
//!
//! Produces keywords, identifiers, string literals and braces, each with the
//! 1-based line and column it starts at.

use crate::errors::{DslError, DslResult};
use case_types::SourcePosition;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw text; the unquoted contents for string literals
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Case,
    FileModel,
    Item,
    Definition,
    Sentry,
    On,
    PlanItem,
    Entry,
    Exit,

    Identifier,
    StringLiteral,

    OpenBrace,
    CloseBrace,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Case => write!(f, "CASE"),
            Self::FileModel => write!(f, "FILEMODEL"),
            Self::Item => write!(f, "ITEM"),
            Self::Definition => write!(f, "DEFINITION"),
            Self::Sentry => write!(f, "SENTRY"),
            Self::On => write!(f, "ON"),
            Self::PlanItem => write!(f, "PLANITEM"),
            Self::Entry => write!(f, "ENTRY"),
            Self::Exit => write!(f, "EXIT"),
            Self::Identifier => write!(f, "identifier"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::OpenBrace => write!(f, "{{"),
            Self::CloseBrace => write!(f, "}}"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> DslResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> DslResult<Token> {
        let ch = self.input[self.pos];
        let (line, col) = (self.line, self.col);

        match ch {
            '{' => {
                self.advance();
                Ok(Token::new(TokenKind::OpenBrace, "{", line, col))
            }
            '}' => {
                self.advance();
                Ok(Token::new(TokenKind::CloseBrace, "}", line, col))
            }
            '"' => self.read_string_literal(),
            c if c.is_ascii_alphanumeric() || c == '_' => Ok(self.read_identifier_or_keyword()),
            _ => Err(DslError::ParseError {
                line,
                col,
                message: format!("Unexpected character: '{ch}'"),
            }),
        }
    }

    fn read_string_literal(&mut self) -> DslResult<Token> {
        let (line, col) = (self.line, self.col);
        self.advance();

        let mut text = String::new();
        while self.pos < self.input.len() && self.input[self.pos] != '"' {
            if self.input[self.pos] == '\\' && self.peek_at(1) == Some('"') {
                self.advance();
            }
            text.push(self.input[self.pos]);
            self.advance();
        }

        if self.pos >= self.input.len() {
            return Err(DslError::ParseError {
                line,
                col,
                message: "Unterminated string literal".into(),
            });
        }
        self.advance();
        Ok(Token::new(TokenKind::StringLiteral, text, line, col))
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while let Some(c) = self.peek_at(0) {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':') {
                break;
            }
            text.push(c);
            self.advance();
        }

        let kind = match text.as_str() {
            "CASE" => TokenKind::Case,
            "FILEMODEL" => TokenKind::FileModel,
            "ITEM" => TokenKind::Item,
            "DEFINITION" => TokenKind::Definition,
            "SENTRY" => TokenKind::Sentry,
            "ON" => TokenKind::On,
            "PLANITEM" => TokenKind::PlanItem,
            "ENTRY" => TokenKind::Entry,
            "EXIT" => TokenKind::Exit,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, text, line, col)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek_at(0) {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' || (ch == '/' && self.peek_at(1) == Some('/')) {
                while self.peek_at(0).is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("CASE FILEMODEL ITEM DEFINITION SENTRY ON PLANITEM ENTRY EXIT"),
            vec![
                TokenKind::Case,
                TokenKind::FileModel,
                TokenKind::Item,
                TokenKind::Definition,
                TokenKind::Sentry,
                TokenKind::On,
                TokenKind::PlanItem,
                TokenKind::Entry,
                TokenKind::Exit,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_keep_case() {
        let tokens = Lexer::new("addChild EXACTLY_ONE claim-1 def:v2").tokenize().unwrap();
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].text, "addChild");
        assert_eq!(tokens[2].text, "claim-1");
        assert_eq!(tokens[3].text, "def:v2");
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("CASE c {\n    ITEM x\n}").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[2].line, tokens[2].col), (1, 8));
        assert_eq!((tokens[3].line, tokens[3].col), (2, 5));
        assert_eq!(tokens[4].position(), SourcePosition::new(2, 10));
        assert_eq!(tokens[5].line, 3);
    }

    #[test]
    fn test_string_literal_and_comments() {
        let tokens = Lexer::new("# header\nCASE c \"Claims \\\"A\\\"\" // trailing\n")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Case);
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].text, "Claims \"A\"");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_errors_carry_position() {
        let err = Lexer::new("CASE c {\n  @").tokenize().unwrap_err();
        assert!(matches!(err, DslError::ParseError { line: 2, col: 3, .. }));
        assert!(Lexer::new("\"open").tokenize().is_err());
    }
}
