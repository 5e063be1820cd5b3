//! Parser: recursive descent over the token stream
//!
//! Produces a [`ParsedCase`], the intermediate representation the validator
//! checks and the compiler turns into a `CaseModel`. Every element keeps the
//! position of its first token.

use crate::errors::{DslError, DslResult};
use crate::lexer::{Lexer, Token, TokenKind};
use case_types::{CriterionKind, SourcePosition};

#[derive(Clone, Debug)]
pub struct ParsedCase {
    pub id: String,
    pub name: Option<String>,
    pub file_model: Option<ParsedFileModel>,
    pub sentries: Vec<ParsedSentry>,
    pub plan_items: Vec<ParsedPlanItem>,
    pub position: SourcePosition,
}

#[derive(Clone, Debug)]
pub struct ParsedFileModel {
    pub id: String,
    pub items: Vec<ParsedItem>,
    pub position: SourcePosition,
}

#[derive(Clone, Debug)]
pub struct ParsedItem {
    pub id: String,
    pub name: Option<String>,
    pub multiplicity: String,
    pub multiplicity_position: SourcePosition,
    pub definition_ref: Option<String>,
    pub children: Vec<ParsedItem>,
    pub position: SourcePosition,
}

#[derive(Clone, Debug)]
pub struct ParsedSentry {
    pub id: String,
    pub on_parts: Vec<ParsedOnPart>,
    pub position: SourcePosition,
}

/// `ON <source> <standard event>`; the source kind is resolved later
#[derive(Clone, Debug)]
pub struct ParsedOnPart {
    pub source_ref: String,
    pub standard_event: String,
    pub position: SourcePosition,
}

#[derive(Clone, Debug)]
pub struct ParsedPlanItem {
    pub id: String,
    pub name: Option<String>,
    pub definition_ref: Option<String>,
    pub criteria: Vec<ParsedCriterion>,
    pub position: SourcePosition,
}

#[derive(Clone, Debug)]
pub struct ParsedCriterion {
    pub kind: CriterionKind,
    pub id: String,
    pub sentry_ref: String,
    pub position: SourcePosition,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse case model text into a [`ParsedCase`]
    pub fn parse(input: &str) -> DslResult<ParsedCase> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        let case = parser.parse_case()?;
        parser.expect(TokenKind::Eof)?;
        Ok(case)
    }

    fn parse_case(&mut self) -> DslResult<ParsedCase> {
        // CASE id ["name"] {
        let position = self.expect(TokenKind::Case)?.position();
        let id = self.expect_text(TokenKind::Identifier)?;
        let name = self.optional_string();
        self.expect(TokenKind::OpenBrace)?;

        let mut case = ParsedCase {
            id,
            name,
            file_model: None,
            sentries: Vec::new(),
            plan_items: Vec::new(),
            position,
        };

        while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
            let kind = self.peek().kind;
            match kind {
                TokenKind::FileModel => {
                    if case.file_model.is_some() {
                        let tok = self.peek();
                        return Err(DslError::ParseError {
                            line: tok.line,
                            col: tok.col,
                            message: "a case declares at most one FILEMODEL".into(),
                        });
                    }
                    case.file_model = Some(self.parse_file_model()?);
                }
                TokenKind::Sentry => case.sentries.push(self.parse_sentry()?),
                TokenKind::PlanItem => case.plan_items.push(self.parse_plan_item()?),
                _ => return Err(self.unknown_keyword()),
            }
        }

        self.expect(TokenKind::CloseBrace)?;
        Ok(case)
    }

    fn parse_file_model(&mut self) -> DslResult<ParsedFileModel> {
        // FILEMODEL id { ITEM ... }
        let position = self.expect(TokenKind::FileModel)?.position();
        let id = self.expect_text(TokenKind::Identifier)?;
        let items = self.parse_item_block()?;
        Ok(ParsedFileModel { id, items, position })
    }

    fn parse_item_block(&mut self) -> DslResult<Vec<ParsedItem>> {
        self.expect(TokenKind::OpenBrace)?;
        let mut items = Vec::new();
        while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
            if !self.check(TokenKind::Item) {
                return Err(self.unknown_keyword());
            }
            items.push(self.parse_item()?);
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(items)
    }

    fn parse_item(&mut self) -> DslResult<ParsedItem> {
        // ITEM id ["name"] MULTIPLICITY [DEFINITION ref] [{ ITEM ... }]
        let position = self.expect(TokenKind::Item)?.position();
        let id = self.expect_text(TokenKind::Identifier)?;
        let name = self.optional_string();
        let multiplicity_token = self.expect(TokenKind::Identifier)?;
        let multiplicity = multiplicity_token.text.clone();
        let multiplicity_position = multiplicity_token.position();
        let definition_ref = self.optional_definition()?;
        let children = if self.check(TokenKind::OpenBrace) {
            self.parse_item_block()?
        } else {
            Vec::new()
        };
        Ok(ParsedItem {
            id,
            name,
            multiplicity,
            multiplicity_position,
            definition_ref,
            children,
            position,
        })
    }

    fn parse_sentry(&mut self) -> DslResult<ParsedSentry> {
        // SENTRY id { ON source event ... }
        let position = self.expect(TokenKind::Sentry)?.position();
        let id = self.expect_text(TokenKind::Identifier)?;
        self.expect(TokenKind::OpenBrace)?;

        let mut on_parts = Vec::new();
        while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
            if !self.check(TokenKind::On) {
                return Err(self.unknown_keyword());
            }
            let position = self.expect(TokenKind::On)?.position();
            let source_ref = self.expect_text(TokenKind::Identifier)?;
            let standard_event = self.expect_text(TokenKind::Identifier)?;
            on_parts.push(ParsedOnPart {
                source_ref,
                standard_event,
                position,
            });
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(ParsedSentry {
            id,
            on_parts,
            position,
        })
    }

    fn parse_plan_item(&mut self) -> DslResult<ParsedPlanItem> {
        // PLANITEM id ["name"] [DEFINITION ref] [{ ENTRY|EXIT id sentry ... }]
        let position = self.expect(TokenKind::PlanItem)?.position();
        let id = self.expect_text(TokenKind::Identifier)?;
        let name = self.optional_string();
        let definition_ref = self.optional_definition()?;

        let mut criteria = Vec::new();
        if self.check(TokenKind::OpenBrace) {
            self.advance();
            while !self.check(TokenKind::CloseBrace) && !self.check(TokenKind::Eof) {
                let keyword = self.peek().kind;
                let kind = match keyword {
                    TokenKind::Entry => CriterionKind::Entry,
                    TokenKind::Exit => CriterionKind::Exit,
                    _ => return Err(self.unknown_keyword()),
                };
                let position = self.advance().position();
                let id = self.expect_text(TokenKind::Identifier)?;
                let sentry_ref = self.expect_text(TokenKind::Identifier)?;
                criteria.push(ParsedCriterion {
                    kind,
                    id,
                    sentry_ref,
                    position,
                });
            }
            self.expect(TokenKind::CloseBrace)?;
        }

        Ok(ParsedPlanItem {
            id,
            name,
            definition_ref,
            criteria,
            position,
        })
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn optional_string(&mut self) -> Option<String> {
        if self.check(TokenKind::StringLiteral) {
            Some(self.advance().text.clone())
        } else {
            None
        }
    }

    fn optional_definition(&mut self) -> DslResult<Option<String>> {
        if self.check(TokenKind::Definition) {
            self.advance();
            Ok(Some(self.expect_text(TokenKind::Identifier)?))
        } else {
            Ok(None)
        }
    }

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof and the parser never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.tokens[index].kind != TokenKind::Eof {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn expect(&mut self, kind: TokenKind) -> DslResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            return Err(DslError::UnexpectedEof(kind.to_string()));
        }
        Err(DslError::UnexpectedToken {
            expected: kind.to_string(),
            found: tok.text.clone(),
            line: tok.line,
            col: tok.col,
        })
    }

    fn expect_text(&mut self, kind: TokenKind) -> DslResult<String> {
        Ok(self.expect(kind)?.text.clone())
    }

    fn unknown_keyword(&self) -> DslError {
        let tok = self.peek();
        if tok.kind == TokenKind::Eof {
            return DslError::UnexpectedEof("}".into());
        }
        DslError::UnknownKeyword {
            keyword: tok.text.clone(),
            line: tok.line,
            col: tok.col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIMS: &str = r#"
CASE claims "Claims handling" {
    FILEMODEL files {
        ITEM claim "Claim" EXACTLY_ONE
        ITEM evidence ZERO_OR_MORE DEFINITION document {
            ITEM page ONE_OR_MORE
        }
    }
    SENTRY ready {
        ON claim create
        ON evidence addChild
    }
    PLANITEM review "Review claim" {
        ENTRY review_entry ready
    }
    PLANITEM archive
}
"#;

    #[test]
    fn test_parse_full_case() {
        let case = Parser::parse(CLAIMS).unwrap();
        assert_eq!(case.id, "claims");
        assert_eq!(case.name.as_deref(), Some("Claims handling"));

        let files = case.file_model.unwrap();
        assert_eq!(files.items.len(), 2);
        assert_eq!(files.items[0].name.as_deref(), Some("Claim"));
        assert_eq!(files.items[1].definition_ref.as_deref(), Some("document"));
        assert_eq!(files.items[1].children[0].multiplicity, "ONE_OR_MORE");

        assert_eq!(case.sentries[0].on_parts.len(), 2);
        assert_eq!(case.sentries[0].on_parts[1].standard_event, "addChild");
        assert_eq!(case.plan_items.len(), 2);
        assert_eq!(case.plan_items[0].criteria[0].kind, CriterionKind::Entry);
        assert!(case.plan_items[1].criteria.is_empty());
    }

    #[test]
    fn test_positions_recorded() {
        let case = Parser::parse(CLAIMS).unwrap();
        assert_eq!(case.position, SourcePosition::new(2, 1));
        let files = case.file_model.unwrap();
        assert_eq!(files.items[0].position, SourcePosition::new(4, 9));
        assert_eq!(case.sentries[0].on_parts[0].position, SourcePosition::new(10, 9));
        assert_eq!(case.plan_items[0].criteria[0].position, SourcePosition::new(14, 9));
    }

    #[test]
    fn test_unknown_keyword() {
        let err = Parser::parse("CASE c {\n  NODE x\n}").unwrap_err();
        assert!(matches!(err, DslError::UnknownKeyword { line: 2, col: 3, .. }));
    }

    #[test]
    fn test_missing_brace() {
        assert!(matches!(
            Parser::parse("CASE c {").unwrap_err(),
            DslError::UnexpectedEof(_)
        ));
        assert!(Parser::parse("CASE c { } trailing").is_err());
    }

    #[test]
    fn test_second_file_model_rejected() {
        let err = Parser::parse("CASE c { FILEMODEL a { } FILEMODEL b { } }").unwrap_err();
        assert!(matches!(err, DslError::ParseError { .. }));
    }

    #[test]
    fn test_on_part_needs_event() {
        let err = Parser::parse("CASE c { SENTRY s { ON claim } }").unwrap_err();
        assert!(matches!(err, DslError::UnexpectedToken { .. }));
    }
}
