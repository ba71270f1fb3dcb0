use crate::Real;
use crate::types::TokenKind;

/// Longest number literal the lexer accepts.
const MAX_TOKEN_LENGTH: usize = 1000;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<Real>,
    pub text: Option<String>,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str, position: usize) -> Self {
        Self {
            kind,
            value: None,
            text: Some(String::from(text)),
            position,
        }
    }

    fn number(value: Real, text: &str, position: usize) -> Self {
        Self {
            kind: TokenKind::Number,
            value: Some(value),
            text: Some(String::from(text)),
            position,
        }
    }

    /// The token text, or an empty string for tokens without one.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// The lexer struct, which produces tokens from an input string.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pub pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Peek at the current character.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Peek at the character after the current one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance the position by one character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Skip whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn advance_digits(&mut self) -> bool {
        let mut any = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                any = true;
                self.advance();
            } else {
                break;
            }
        }
        any
    }

    /// Scans `digits [. digits] [e|E [+|-] digits]` or `. digits [exponent]`.
    fn lex_number(&mut self, start_pos: usize) -> Token {
        let mut valid = self.advance_digits();
        if self.peek() == Some('.') {
            self.advance();
            valid |= self.advance_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            // Must have at least one digit after e/E
            valid &= self.advance_digits();
        }

        // A second dot right after a literal ("1..2", "1.2.3") is malformed
        if self.peek() == Some('.') {
            self.advance();
            valid = false;
        }

        let text = &self.input[start_pos..self.pos];
        if !valid || text.len() > MAX_TOKEN_LENGTH {
            return Token::new(TokenKind::Error, text, start_pos);
        }
        match text.parse::<Real>() {
            Ok(val) => Token::number(val, text, start_pos),
            Err(_) => Token::new(TokenKind::Error, text, start_pos),
        }
    }

    /// Get the next token from the input.
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start_pos = self.pos;
        let c = self.peek()?;

        // Number (integer or float, possibly scientific notation or a leading dot)
        if c.is_ascii_digit() || (c == '.' && self.peek_second().is_some_and(|d| d.is_ascii_digit()))
        {
            return Some(self.lex_number(start_pos));
        }

        // Operators, with ** as the only two-character one
        if "+-*/^%".contains(c) {
            self.advance();
            if c == '*' && self.peek() == Some('*') {
                self.advance();
                return Some(Token::new(TokenKind::Operator, "**", start_pos));
            }
            return Some(Token::new(
                TokenKind::Operator,
                &self.input[start_pos..self.pos],
                start_pos,
            ));
        }

        // Identifier (variable, function, constant), of any length and script
        if c.is_alphabetic() || c == '_' {
            while let Some(nc) = self.peek() {
                if nc.is_alphanumeric() || nc == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
            let ident = &self.input[start_pos..self.pos];
            return Some(Token::new(TokenKind::Variable, ident, start_pos));
        }

        // Other punctuation
        let kind = match c {
            '(' | '[' => TokenKind::Open,
            ')' | ']' => TokenKind::Close,
            ',' | ';' => TokenKind::Separator,
            _ => TokenKind::Error,
        };
        self.advance();
        Some(Token::new(kind, &self.input[start_pos..self.pos], start_pos))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
