//! Lexer for Ignis source text
//!
//! Pull-driven: the parser requests one token at a time and keeps a single
//! token of lookahead. The lexer itself looks one character ahead (a second
//! is available on demand for multi-character operators and comments).
//!
//! Comments come in two forms: `// …` to end of line, and `/* … */` block
//! comments that nest. Multi-character operators are matched greedily:
//! `===` before `==` before `=`, and likewise `!=`, `<=`, `>=`.

use crate::diagnostics::{Level, Reporter};

/// Token kind. Keyword kinds are produced by [`keyword_kind`] when an
/// identifier matches the reserved table exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character tokens
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Assign,
    Less,
    Greater,

    // Multi-character operators
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    TypeEq,

    // Keywords
    KwInt,
    KwChar,
    KwMut,
    KwConst,
    KwReturn,
    KwIf,
    KwElse,
    KwElif,
    KwWhile,
    KwLoop,
    KwFor,
    KwBreak,
    KwContinue,
    KwPtr,
    KwAddr,
    KwDeref,
    KwStruct,

    // Logical keywords and their complemented forms
    KwOr,
    KwAnd,
    KwNot,
    KwXor,
    KwNor,
    KwNand,
    KwNnot,
    KwXnor,

    // Bitwise keywords and their complemented forms
    KwBor,
    KwBand,
    KwBnot,
    KwBxor,
    KwNbor,
    KwNband,
    KwNbnot,
    KwNbxor,

    // Literals and identifiers
    Ident,
    Int,
    CharLit,
    Str,
    Eof,
}

/// A token with its decoded payload and 1-based source position.
///
/// `text` holds the identifier name, the decoded string value, or the raw
/// operator/keyword spelling. `value` holds the integer value for `Int` and
/// the decoded byte for `CharLit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: i64,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            value: 0,
            line,
            column,
        }
    }
}

/// Reserved keyword table.
pub fn keyword_kind(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match ident {
        "int" => KwInt,
        "char" => KwChar,
        "mut" => KwMut,
        "const" => KwConst,
        "return" => KwReturn,
        "struct" => KwStruct,
        "if" => KwIf,
        "else" => KwElse,
        "elif" => KwElif,
        "while" => KwWhile,
        "loop" => KwLoop,
        "for" => KwFor,
        "break" => KwBreak,
        "continue" => KwContinue,
        "ptr" => KwPtr,
        "addr" => KwAddr,
        "deref" => KwDeref,
        "or" => KwOr,
        "and" => KwAnd,
        "not" => KwNot,
        "xor" => KwXor,
        "bor" => KwBor,
        "band" => KwBand,
        "bnot" => KwBnot,
        "bxor" => KwBxor,
        "nor" => KwNor,
        "nand" => KwNand,
        "nnot" => KwNnot,
        "xnor" => KwXnor,
        "nbor" => KwNbor,
        "nband" => KwNband,
        "nbnot" => KwNbnot,
        "nbxor" => KwNbxor,
        _ => return None,
    };
    Some(kind)
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    reporter: &'a Reporter,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, reporter: &'a Reporter) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            reporter,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn err(&self, code: &str, message: &str, line: usize, column: usize) -> String {
        self.reporter.render(Level::Error, code, message, line, column)
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    /// Skip one comment starting at the current position. Block comments
    /// count opens and closes.
    fn skip_comment(&mut self) -> Result<(), String> {
        if self.current() == Some('/') && self.peek(1) == Some('/') {
            while self.current().is_some_and(|c| c != '\n') {
                self.advance();
            }
            return Ok(());
        }
        // Block comment
        let (line, column) = (self.line, self.column);
        self.advance();
        self.advance();
        let mut nesting = 1usize;
        while nesting > 0 {
            match self.current() {
                None => {
                    return Err(self.err("E015", "Unterminated multi-line comment", line, column));
                }
                Some('/') if self.peek(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    nesting += 1;
                }
                Some('*') if self.peek(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    nesting -= 1;
                }
                Some(_) => self.advance(),
            }
        }
        Ok(())
    }

    fn number(&mut self, line: usize, column: usize) -> Result<i64, String> {
        let mut digits = String::new();
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            digits.push(self.current().unwrap());
            self.advance();
        }
        digits
            .parse::<i64>()
            .map_err(|_| self.err("E023", "Integer literal out of range", line, column))
    }

    fn string_literal(&mut self, line: usize, column: usize) -> Result<String, String> {
        self.advance(); // opening "
        let mut result = String::new();
        loop {
            match self.current() {
                None => return Err(self.err("E022", "Unterminated string literal.", line, column)),
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => {
                            return Err(self.err("E022", "Unterminated string literal.", line, column));
                        }
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('\\') => result.push('\\'),
                        Some('"') => result.push('"'),
                        // Unknown escapes keep the backslash and the character
                        Some(other) => {
                            result.push('\\');
                            result.push(other);
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
        self.advance(); // closing "
        Ok(result)
    }

    fn char_literal(&mut self, line: usize, column: usize) -> Result<i64, String> {
        self.advance(); // opening '
        let value = match self.current() {
            None => {
                return Err(self.err("E021", "Unterminated or multi-character character literal", line, column));
            }
            Some('\\') => {
                self.advance();
                match self.current() {
                    None => {
                        return Err(self.err("E021", "Unterminated or multi-character character literal", line, column));
                    }
                    Some('n') => 10,
                    Some('t') => 9,
                    Some('\\') => 92,
                    Some('\'') => 39,
                    Some(other) => other as i64,
                }
            }
            Some(c) => c as i64,
        };
        self.advance();
        if self.current() != Some('\'') {
            return Err(self.err("E021", "Unterminated or multi-character character literal", line, column));
        }
        self.advance(); // closing '
        if !(0..=255).contains(&value) {
            return Err(self.err("E021", "Character literal does not fit in one byte", line, column));
        }
        Ok(value)
    }

    fn identifier(&mut self) -> String {
        let mut result = String::new();
        while self.current().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            result.push(self.current().unwrap());
            self.advance();
        }
        result
    }

    pub fn next_token(&mut self) -> Result<Token, String> {
        loop {
            self.skip_whitespace();
            let (line, column) = (self.line, self.column);
            let Some(c) = self.current() else {
                return Ok(Token::new(TokenKind::Eof, "", self.line, self.column));
            };

            if c == '/' && (self.peek(1) == Some('/') || self.peek(1) == Some('*')) {
                self.skip_comment()?;
                continue;
            }

            if c.is_ascii_digit() {
                let value = self.number(line, column)?;
                let mut tok = Token::new(TokenKind::Int, value.to_string(), line, column);
                tok.value = value;
                return Ok(tok);
            }
            if c == '"' {
                let text = self.string_literal(line, column)?;
                return Ok(Token::new(TokenKind::Str, text, line, column));
            }
            if c == '\'' {
                let value = self.char_literal(line, column)?;
                let mut tok = Token::new(TokenKind::CharLit, value.to_string(), line, column);
                tok.value = value;
                return Ok(tok);
            }
            if c.is_ascii_alphabetic() || c == '_' {
                let text = self.identifier();
                let kind = keyword_kind(&text).unwrap_or(TokenKind::Ident);
                return Ok(Token::new(kind, text, line, column));
            }

            // Greedy multi-character operators
            if c == '=' && self.peek(1) == Some('=') && self.peek(2) == Some('=') {
                self.advance();
                self.advance();
                self.advance();
                return Ok(Token::new(TokenKind::TypeEq, "===", line, column));
            }
            if c == '=' && self.peek(1) == Some('=') {
                self.advance();
                self.advance();
                return Ok(Token::new(TokenKind::EqEq, "==", line, column));
            }
            if c == '!' && self.peek(1) == Some('=') {
                self.advance();
                self.advance();
                return Ok(Token::new(TokenKind::NotEq, "!=", line, column));
            }
            if c == '<' && self.peek(1) == Some('=') {
                self.advance();
                self.advance();
                return Ok(Token::new(TokenKind::LessEq, "<=", line, column));
            }
            if c == '>' && self.peek(1) == Some('=') {
                self.advance();
                self.advance();
                return Ok(Token::new(TokenKind::GreaterEq, ">=", line, column));
            }

            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ';' => TokenKind::Semicolon,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '=' => TokenKind::Assign,
                '<' => TokenKind::Less,
                '>' => TokenKind::Greater,
                other => {
                    return Err(self.err("E016", &format!("Invalid character '{}'", other), line, column));
                }
            };
            self.advance();
            return Ok(Token::new(kind, c.to_string(), line, column));
        }
    }
}
