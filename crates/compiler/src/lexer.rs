//! Lexer
//!
//! Turns source text into a finite stream of tokens ending in `Eof`.
//! Handles case-insensitive identifiers, based numeric literals, quote-doubled
//! character/string literals, and `--` comments.

use std::path::PathBuf;

/// A file-relative source span: a byte range plus the owning file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(file: FileId, start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            file,
            start,
            end,
            line,
            column,
        }
    }
}

/// Identifies a source file within a compilation; interned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier {
        /// Original spelling as written.
        text: String,
        /// Case-folded canonical form; all downstream equality uses this.
        canonical: String,
    },
    Reserved(ReservedWord),
    Integer {
        text: String,
        value: i128,
    },
    Real {
        text: String,
        value: f64,
    },
    CharLiteral(char),
    StringLiteral(String),
    /// A delimiter or compound symbol: `( ) ; : , . => .. ** := /= <= >= << >> | ' .`
    Delimiter(&'static str),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedWord {
    Package,
    Body,
    Is,
    End,
    Procedure,
    Function,
    Generic,
    Private,
    Limited,
    Type,
    Subtype,
    Range,
    Array,
    Of,
    Record,
    Case,
    When,
    Others,
    Access,
    Constant,
    Renames,
    Use,
    With,
    Exception,
    Task,
    Entry,
    Accept,
    Select,
    Or,
    Else,
    Delay,
    Terminate,
    Then,
    If,
    Elsif,
    Loop,
    While,
    For,
    In,
    Out,
    Exit,
    Return,
    Raise,
    Begin,
    Declare,
    Null,
    New,
    Not,
    And,
    Xor,
    Abs,
    Mod,
    Rem,
    Pragma,
    Reverse,
    Digits,
    Delta,
    Do,
}

impl ReservedWord {
    /// Reserved word spellings, canonical (lowercase) form.
    const TABLE: &'static [(&'static str, ReservedWord)] = &[
        ("package", ReservedWord::Package),
        ("body", ReservedWord::Body),
        ("is", ReservedWord::Is),
        ("end", ReservedWord::End),
        ("procedure", ReservedWord::Procedure),
        ("function", ReservedWord::Function),
        ("generic", ReservedWord::Generic),
        ("private", ReservedWord::Private),
        ("limited", ReservedWord::Limited),
        ("type", ReservedWord::Type),
        ("subtype", ReservedWord::Subtype),
        ("range", ReservedWord::Range),
        ("array", ReservedWord::Array),
        ("of", ReservedWord::Of),
        ("record", ReservedWord::Record),
        ("case", ReservedWord::Case),
        ("when", ReservedWord::When),
        ("others", ReservedWord::Others),
        ("access", ReservedWord::Access),
        ("constant", ReservedWord::Constant),
        ("renames", ReservedWord::Renames),
        ("use", ReservedWord::Use),
        ("with", ReservedWord::With),
        ("exception", ReservedWord::Exception),
        ("task", ReservedWord::Task),
        ("entry", ReservedWord::Entry),
        ("accept", ReservedWord::Accept),
        ("select", ReservedWord::Select),
        ("or", ReservedWord::Or),
        ("else", ReservedWord::Else),
        ("delay", ReservedWord::Delay),
        ("terminate", ReservedWord::Terminate),
        ("then", ReservedWord::Then),
        ("if", ReservedWord::If),
        ("elsif", ReservedWord::Elsif),
        ("loop", ReservedWord::Loop),
        ("while", ReservedWord::While),
        ("for", ReservedWord::For),
        ("in", ReservedWord::In),
        ("out", ReservedWord::Out),
        ("exit", ReservedWord::Exit),
        ("return", ReservedWord::Return),
        ("raise", ReservedWord::Raise),
        ("begin", ReservedWord::Begin),
        ("declare", ReservedWord::Declare),
        ("null", ReservedWord::Null),
        ("new", ReservedWord::New),
        ("not", ReservedWord::Not),
        ("and", ReservedWord::And),
        ("xor", ReservedWord::Xor),
        ("abs", ReservedWord::Abs),
        ("mod", ReservedWord::Mod),
        ("rem", ReservedWord::Rem),
        ("pragma", ReservedWord::Pragma),
        ("reverse", ReservedWord::Reverse),
        ("digits", ReservedWord::Digits),
        ("delta", ReservedWord::Delta),
        ("do", ReservedWord::Do),
    ];

    fn lookup(canonical: &str) -> Option<ReservedWord> {
        Self::TABLE
            .iter()
            .find(|(spelling, _)| *spelling == canonical)
            .map(|(_, kw)| *kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Fixed set of multi-character delimiters, longest first so the scanner
/// greedily matches `:=` before `:`, `**` before `*`, etc.
const COMPOUND_DELIMS: &[&str] = &["**", ":=", "=>", "..", "/=", "<=", ">=", "<<", ">>", "<>"];
const SIMPLE_DELIMS: &str = "()+-*/=<>;:,.|&'";

pub struct Lexer<'a> {
    file: FileId,
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(file: FileId, src: &'a str) -> Self {
        Lexer {
            file,
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 0,
            col: 0,
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start_line = self.line;
            let start_col = self.col;
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: self.span(start, self.pos, start_line, start_col),
                });
                break;
            };

            if c.is_ascii_digit() {
                tokens.push(self.lex_number(start, start_line, start_col));
            } else if is_ident_start(c) {
                tokens.push(self.lex_identifier(start, start_line, start_col));
            } else if c == '"' {
                match self.lex_string(start, start_line, start_col) {
                    Ok(tok) => tokens.push(tok),
                    Err(()) => self.resync(),
                }
            } else if c == '\'' && self.looks_like_char_literal() {
                tokens.push(self.lex_char(start, start_line, start_col));
            } else if let Some(delim) = self.match_compound_delim() {
                tokens.push(Token {
                    kind: TokenKind::Delimiter(delim),
                    span: self.span(start, self.pos, start_line, start_col),
                });
            } else if SIMPLE_DELIMS.contains(c) {
                self.advance();
                tokens.push(Token {
                    kind: TokenKind::Delimiter(simple_delim_str(c)),
                    span: self.span(start, self.pos, start_line, start_col),
                });
            } else {
                self.errors.push(LexError {
                    message: format!("illegal character '{}'", c),
                    span: self.span(start, start + c.len_utf8(), start_line, start_col),
                });
                self.advance();
            }
        }
        (tokens, self.errors)
    }

    fn span(&self, start: usize, end: usize, line: usize, col: usize) -> Span {
        Span::new(self.file, start, end, line, col)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Resynchronize at the next whitespace or delimiter after a lex error,
    /// per §4.1.
    fn resync(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || SIMPLE_DELIMS.contains(c) {
                break;
            }
            self.advance();
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn match_compound_delim(&mut self) -> Option<&'static str> {
        for delim in COMPOUND_DELIMS {
            if self.src[self.pos..].starts_with(delim) {
                for _ in 0..delim.chars().count() {
                    self.advance();
                }
                return Some(delim);
            }
        }
        None
    }

    fn lex_identifier(&mut self, start: usize, line: usize, col: usize) -> Token {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.src[start..self.pos].to_string();
        let canonical = text.to_ascii_lowercase();

        if text.ends_with('_') || text.contains("__") {
            self.errors.push(LexError {
                message: format!("malformed identifier '{}': trailing or doubled underscore", text),
                span: self.span(start, self.pos, line, col),
            });
        }

        let kind = match ReservedWord::lookup(&canonical) {
            Some(kw) => TokenKind::Reserved(kw),
            None => TokenKind::Identifier { text, canonical },
        };
        Token {
            kind,
            span: self.span(start, self.pos, line, col),
        }
    }

    /// Numeric literal: decimal with optional underscores and exponent, or a
    /// based literal `base#digits#[E exp]` with base in 2..16.
    fn lex_number(&mut self, start: usize, line: usize, col: usize) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        if self.peek() == Some('#') {
            return self.lex_based_number(start, line, col);
        }

        let mut is_real = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_real |= self.lex_exponent();
        }

        let text = self.src[start..self.pos].to_string();
        let digits: String = text.chars().filter(|c| *c != '_').collect();

        if digits.starts_with('_') || digits.ends_with('_') || text.contains("__") {
            self.errors.push(LexError {
                message: format!("malformed numeric literal '{}': stray underscore", text),
                span: self.span(start, self.pos, line, col),
            });
        }

        let kind = if is_real {
            match digits.parse::<f64>() {
                Ok(value) => TokenKind::Real { text, value },
                Err(_) => {
                    self.errors.push(LexError {
                        message: format!("malformed real literal '{}'", text),
                        span: self.span(start, self.pos, line, col),
                    });
                    TokenKind::Real { text, value: 0.0 }
                }
            }
        } else {
            match digits.parse::<i128>() {
                Ok(value) => TokenKind::Integer { text, value },
                Err(_) => {
                    self.errors.push(LexError {
                        message: format!("malformed integer literal '{}'", text),
                        span: self.span(start, self.pos, line, col),
                    });
                    TokenKind::Integer { text, value: 0 }
                }
            }
        };
        Token {
            kind,
            span: self.span(start, self.pos, line, col),
        }
    }

    /// Consumes `E[+/-]digits`; returns true (the literal became a real) iff
    /// the exponent is negative.
    fn lex_exponent(&mut self) -> bool {
        let save = self.pos;
        self.advance(); // E/e
        let mut negative = false;
        if matches!(self.peek(), Some('+') | Some('-')) {
            negative = self.peek() == Some('-');
            self.advance();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos = save; // not actually an exponent
            return false;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        negative
    }

    fn lex_based_number(&mut self, start: usize, line: usize, col: usize) -> Token {
        let base_text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let base: u32 = base_text.parse().unwrap_or(0);
        self.advance(); // '#'

        let digits_start = self.pos;
        let alphabet_ok = |c: char, base: u32| c.to_digit(base.max(2).min(16)).is_some();
        while let Some(c) = self.peek() {
            if c == '_' || alphabet_ok(c, base) {
                self.advance();
            } else {
                break;
            }
        }
        let digits_text = self.src[digits_start..self.pos].to_string();

        let mut ok = (2..=16).contains(&base);
        if digits_text.is_empty()
            || digits_text.starts_with('_')
            || digits_text.ends_with('_')
            || digits_text.contains("__")
        {
            ok = false;
        }

        if self.peek() != Some('#') {
            ok = false;
        } else {
            self.advance();
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            self.lex_exponent();
        }

        let text = self.src[start..self.pos].to_string();
        if !ok {
            self.errors.push(LexError {
                message: format!("malformed based literal '{}'", text),
                span: self.span(start, self.pos, line, col),
            });
            return Token {
                kind: TokenKind::Integer { text, value: 0 },
                span: self.span(start, self.pos, line, col),
            };
        }

        let clean_digits: String = digits_text.chars().filter(|c| *c != '_').collect();
        let value = i128::from_str_radix(&clean_digits, base).unwrap_or(0);
        Token {
            kind: TokenKind::Integer { text, value },
            span: self.span(start, self.pos, line, col),
        }
    }

    /// A `'` starts a character literal iff exactly one character precedes a
    /// matching `'` two positions ahead: `'x'`. Otherwise it's an attribute tick.
    fn looks_like_char_literal(&self) -> bool {
        self.peek_at(1).is_some() && self.peek_at(2) == Some('\'')
    }

    fn lex_char(&mut self, start: usize, line: usize, col: usize) -> Token {
        self.advance(); // opening '
        let c = self.advance().unwrap_or('\0');
        self.advance(); // closing '
        Token {
            kind: TokenKind::CharLiteral(c),
            span: self.span(start, self.pos, line, col),
        }
    }

    /// String literal; a doubled `""` denotes one embedded `"`.
    fn lex_string(&mut self, start: usize, line: usize, col: usize) -> Result<Token, ()> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.errors.push(LexError {
                        message: "unterminated string literal".to_string(),
                        span: self.span(start, self.pos, line, col),
                    });
                    return Err(());
                }
                Some('"') => {
                    self.advance();
                    if self.peek() == Some('"') {
                        value.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral(value),
            span: self.span(start, self.pos, line, col),
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn simple_delim_str(c: char) -> &'static str {
    match c {
        '(' => "(",
        ')' => ")",
        '+' => "+",
        '-' => "-",
        '*' => "*",
        '/' => "/",
        '=' => "=",
        '<' => "<",
        '>' => ">",
        ';' => ";",
        ':' => ":",
        ',' => ",",
        '.' => ".",
        '|' => "|",
        '&' => "&",
        '\'' => "'",
        _ => unreachable!("simple_delim_str called with non-delimiter"),
    }
}

pub fn tokenize(file: FileId, src: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(file, src).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(FileId(0), src);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn identifiers_are_case_folded() {
        let (tokens, _) = tokenize(FileId(0), "Hello_World");
        match &tokens[0].kind {
            TokenKind::Identifier { text, canonical } => {
                assert_eq!(text, "Hello_World");
                assert_eq!(canonical, "hello_world");
            }
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn reserved_words_recognized_case_insensitively() {
        let ks = kinds("BEGIN End");
        assert_eq!(
            ks,
            vec![
                TokenKind::Reserved(ReservedWord::Begin),
                TokenKind::Reserved(ReservedWord::End),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn decimal_literal_with_underscores() {
        let ks = kinds("1_000_000");
        assert_eq!(
            ks[0],
            TokenKind::Integer {
                text: "1_000_000".to_string(),
                value: 1_000_000,
            }
        );
    }

    #[test]
    fn based_literal() {
        let ks = kinds("16#FF#");
        assert_eq!(
            ks[0],
            TokenKind::Integer {
                text: "16#FF#".to_string(),
                value: 255,
            }
        );
    }

    #[test]
    fn based_literal_with_exponent() {
        let (tokens, errors) = tokenize(FileId(0), "2#1010#E2");
        assert!(errors.is_empty());
        match &tokens[0].kind {
            TokenKind::Integer { value, .. } => assert_eq!(*value, 10),
            other => panic!("expected integer, got {:?}", other),
        }
    }

    #[test]
    fn real_literal_with_exponent() {
        let ks = kinds("3.14E2");
        match &ks[0] {
            TokenKind::Real { value, .. } => assert!((*value - 314.0).abs() < 1e-9),
            other => panic!("expected real, got {:?}", other),
        }
    }

    #[test]
    fn string_literal_with_doubled_quote() {
        let ks = kinds("\"He said \"\"hi\"\"\"");
        assert_eq!(ks[0], TokenKind::StringLiteral("He said \"hi\"".to_string()));
    }

    #[test]
    fn empty_string_literal() {
        let ks = kinds("\"\"");
        assert_eq!(ks[0], TokenKind::StringLiteral(String::new()));
    }

    #[test]
    fn char_literal_vs_tick_attribute() {
        let ks = kinds("'x'");
        assert_eq!(ks[0], TokenKind::CharLiteral('x'));

        let ks2 = kinds("X'First");
        assert!(matches!(ks2[1], TokenKind::Delimiter("'")));
    }

    #[test]
    fn unterminated_string_reports_error_and_resyncs() {
        let (tokens, errors) = tokenize(FileId(0), "\"oops\nX");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated"));
        // Lexing continues after the bad literal.
        assert!(tokens.iter().any(|t| matches!(
            &t.kind,
            TokenKind::Identifier { canonical, .. } if canonical == "x"
        )));
    }

    #[test]
    fn malformed_based_literal_reports_error() {
        let (_, errors) = tokenize(FileId(0), "1#FF#");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("based"));
    }

    #[test]
    fn compound_delimiters_are_greedy() {
        let ks = kinds(":= .. ** /= <= >=");
        assert_eq!(
            ks,
            vec![
                TokenKind::Delimiter(":="),
                TokenKind::Delimiter(".."),
                TokenKind::Delimiter("**"),
                TokenKind::Delimiter("/="),
                TokenKind::Delimiter("<="),
                TokenKind::Delimiter(">="),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let ks = kinds("-- a comment\n42");
        assert_eq!(
            ks[0],
            TokenKind::Integer {
                text: "42".to_string(),
                value: 42,
            }
        );
    }
}
