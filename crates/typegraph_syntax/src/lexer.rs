//! Lexer for directive annotations.

use crate::token::{Token, TokenKind};
use typegraph_core::Span;

/// A lexer over directive source such as `@key(fields: "id")`.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Returns the current position.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn peek_at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn advance_by(&mut self, n: u32) {
        self.pos += n;
    }

    #[inline]
    fn slice_from(&self, start: u32) -> &'a str {
        &self.source[start as usize..self.pos as usize]
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b':' => self.single(TokenKind::Colon),
            b'@' => self.single(TokenKind::At),
            b'$' => self.single(TokenKind::Dollar),
            b'"' => self.scan_string(),
            b'-' | b'0'..=b'9' => self.scan_number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),
            _ => self.scan_unknown(),
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Consumes one unexpected character, keeping the token on a char boundary.
    fn scan_unknown(&mut self) -> TokenKind {
        let width = self.source[self.pos as usize..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.advance_by(width as u32);
        TokenKind::Error
    }

    /// Skips whitespace, insignificant commas, and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b',') => self.advance(),
                Some(b'#') => {
                    let rest = &self.bytes[self.pos as usize..];
                    match memchr::memchr(b'\n', rest) {
                        Some(offset) => self.advance_by(offset as u32),
                        None => self.pos = self.bytes.len() as u32,
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::from_keyword(self.slice_from(start)).unwrap_or(TokenKind::Ident)
    }

    fn scan_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.advance();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return TokenKind::Error;
        }
        if self.peek() == Some(b'0') {
            self.advance();
        } else {
            self.scan_digits();
        }

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.scan_digits();
        }

        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.advance();
            if let Some(b'+' | b'-') = self.peek() {
                self.advance();
            }
            self.scan_digits();
        }

        if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // Opening quote

        if self.peek() == Some(b'"') && self.peek_at(1) == Some(b'"') {
            self.advance_by(2);
            let rest = &self.bytes[self.pos as usize..];
            return match memchr::memmem::find(rest, b"\"\"\"") {
                Some(offset) => {
                    self.advance_by(offset as u32 + 3);
                    TokenKind::BlockStringLiteral
                }
                None => {
                    self.pos = self.bytes.len() as u32;
                    TokenKind::Error
                }
            };
        }

        loop {
            match self.peek() {
                None | Some(b'\n') => return TokenKind::Error,
                Some(b'"') => {
                    self.advance();
                    return TokenKind::StringLiteral;
                }
                Some(b'\\') => {
                    let step = if self.peek_at(1).is_some() { 2 } else { 1 };
                    self.advance_by(step);
                }
                _ => self.advance(),
            }
        }
    }

    /// Gets the text at the given span.
    pub fn span_text(&self, span: Span) -> &'a str {
        &self.source[span.start as usize..span.end as usize]
    }
}

/// Tokenizes the entire source.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    tokens
}
