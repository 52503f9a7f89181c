//! Recursive descent parser for directive annotations.

use crate::ast::{Argument, Directive, Name, Value};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use typegraph_core::{diagnostics::codes, DiagnosticBag, Span};

/// Parser for directive annotations such as `@key(fields: "id") @shareable`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    pub directives: Vec<Directive>,
    pub diagnostics: DiagnosticBag,
}

/// Parses a source string into a list of directives.
pub fn parse_directives(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let directives = parser.parse_all();
    ParseResult {
        directives,
        diagnostics: parser.diagnostics,
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            diagnostics: DiagnosticBag::new(),
        }
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            self.error_expected(kind);
            false
        }
    }

    fn current_text(&self) -> &'a str {
        self.lexer.span_text(self.current.span)
    }

    fn error(&mut self, code: &'static str, message: &str) {
        self.diagnostics
            .error(code, message, self.current.span, message.to_string());
    }

    fn error_expected(&mut self, expected: TokenKind) {
        let code = if self.at_kind(TokenKind::Eof) {
            codes::UNEXPECTED_EOF
        } else {
            codes::UNEXPECTED_TOKEN
        };
        self.diagnostics.error(
            code,
            "unexpected token",
            self.current.span,
            format!("expected {}, found {}", expected, self.at()),
        );
    }

    /// Parses every directive until the end of input.
    pub fn parse_all(&mut self) -> Vec<Directive> {
        let mut directives = Vec::new();
        while !self.at_kind(TokenKind::Eof) {
            if !self.at_kind(TokenKind::At) {
                self.error(codes::TRAILING_INPUT, "expected a directive starting with `@`");
                break;
            }
            directives.push(self.parse_directive());
            if self.diagnostics.has_errors() {
                break;
            }
        }
        directives
    }

    fn parse_directive(&mut self) -> Directive {
        let start = self.current.span.start;
        self.advance(); // @

        let name = self.parse_name();
        let arguments = if self.at_kind(TokenKind::LParen) {
            self.advance();
            let args = self.parse_arguments();
            self.expect(TokenKind::RParen);
            args
        } else {
            Vec::new()
        };

        Directive {
            name,
            arguments,
            span: Span::new(start, self.current.span.start),
        }
    }

    fn parse_name(&mut self) -> Name {
        let span = self.current.span;
        // Keywords are valid names in directive position (`@null` is legal SDL).
        if self.at_kind(TokenKind::Ident) || self.at().is_keyword() {
            let value = self.current_text().to_string();
            self.advance();
            Name { value, span }
        } else {
            self.error_expected(TokenKind::Ident);
            Name { value: String::new(), span }
        }
    }

    fn parse_arguments(&mut self) -> Vec<Argument> {
        let mut args = Vec::new();
        while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
            let start = self.current.span.start;
            let name = self.parse_name();
            if !self.expect(TokenKind::Colon) {
                break;
            }
            let value = self.parse_value();
            args.push(Argument {
                name,
                value,
                span: Span::new(start, self.current.span.start),
            });
            if self.diagnostics.has_errors() {
                break;
            }
        }
        args
    }

    fn parse_value(&mut self) -> Value {
        match self.at() {
            TokenKind::IntLiteral => {
                let value = self.current_text().parse().ok();
                match value {
                    Some(v) => {
                        self.advance();
                        Value::Int(v)
                    }
                    None => self.invalid_value("integer literal out of range"),
                }
            }
            TokenKind::FloatLiteral => {
                let value = self.current_text().parse().unwrap_or(f64::NAN);
                self.advance();
                Value::Float(value)
            }
            TokenKind::StringLiteral => {
                let text = self.current_text();
                match unescape(&text[1..text.len() - 1]) {
                    Some(value) => {
                        self.advance();
                        Value::String(value)
                    }
                    None => self.invalid_value("invalid escape sequence in string"),
                }
            }
            TokenKind::BlockStringLiteral => {
                let text = self.current_text();
                let value = text[3..text.len() - 3].trim().to_string();
                self.advance();
                Value::String(value)
            }
            TokenKind::True => {
                self.advance();
                Value::Boolean(true)
            }
            TokenKind::False => {
                self.advance();
                Value::Boolean(false)
            }
            TokenKind::Null => {
                self.advance();
                Value::Null
            }
            TokenKind::Ident => {
                let name = self.parse_name();
                Value::Enum(name.value)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut values = Vec::new();
                while !self.at_kind(TokenKind::RBracket) && !self.at_kind(TokenKind::Eof) {
                    values.push(self.parse_value());
                    if self.diagnostics.has_errors() {
                        return Value::Null;
                    }
                }
                self.expect(TokenKind::RBracket);
                Value::List(values)
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
                    let name = self.parse_name();
                    if !self.expect(TokenKind::Colon) {
                        return Value::Null;
                    }
                    fields.push((name, self.parse_value()));
                    if self.diagnostics.has_errors() {
                        return Value::Null;
                    }
                }
                self.expect(TokenKind::RBrace);
                Value::Object(fields)
            }
            TokenKind::Dollar => {
                self.invalid_value("variables are not allowed in directive annotations")
            }
            TokenKind::Error if self.current_text().starts_with('"') => {
                self.error(codes::UNTERMINATED_STRING, "unterminated string");
                Value::Null
            }
            _ => self.invalid_value("expected value"),
        }
    }

    fn invalid_value(&mut self, message: &str) -> Value {
        self.error(codes::INVALID_SYNTAX, message);
        self.advance();
        Value::Null
    }
}

/// Resolves escape sequences of a quoted string body.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}
