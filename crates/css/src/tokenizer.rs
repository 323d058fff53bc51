//! CSS Tokenizer
//!
//! Tokenizes CSS input according to CSS Syntax Module Level 3. Tokenization
//! never fails: malformed input becomes flagged tokens (`BadString`,
//! `BadUrl`, a `\` delimiter) and, when requested, [`ErrorToken`]s.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{ErrorCode, ErrorToken, SourceLocation};

/// Largest valid code point; escapes above it decode to U+FFFD
const MAX_CODEPOINT: u32 = 0x10FFFF;

/// A CSS token together with the position where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub col: usize,
}

/// CSS Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier (e.g., property names, keywords)
    Ident(String),
    /// Function token (identifier followed by '(')
    Function(String),
    /// At-keyword (e.g., @media, @import)
    AtKeyword(String),
    /// Hash token (e.g., #id, #fff)
    Hash(String, HashType),
    /// String token
    String(String),
    /// String interrupted by a newline; holds the text read so far
    BadString(String),
    /// Unquoted URL token
    Url(String),
    /// Malformed unquoted URL
    BadUrl,
    /// Number (without unit)
    Number(Numeric),
    /// Percentage
    Percentage(Numeric),
    /// Dimension (number with unit)
    Dimension(Numeric, String),
    /// Whitespace run
    Whitespace,
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,
    /// Colon ':'
    Colon,
    /// Semicolon ';'
    Semicolon,
    /// Comma ','
    Comma,
    /// Left bracket '['
    LeftBracket,
    /// Right bracket ']'
    RightBracket,
    /// Left paren '('
    LeftParen,
    /// Right paren ')'
    RightParen,
    /// Left brace '{'
    LeftBrace,
    /// Right brace '}'
    RightBrace,
    /// `~=`
    IncludeMatch,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
    /// `||`
    Column,
    /// Delim (any other single character)
    Delim(char),
    /// End of file
    Eof,
}

/// Hash token type (id or unrestricted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    /// Could be an ID selector
    Id,
    /// Unrestricted (e.g., color)
    Unrestricted,
}

/// Whether a numeric token was written as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Integer,
    Number,
}

/// Value of a number, percentage or dimension token
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric {
    pub value: f64,
    /// Source text of the number, e.g. `+.5e3`
    pub repr: String,
    pub kind: NumberKind,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self {
            kind,
            line: location.line,
            col: location.col,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// Copy of this token's position carrying a different kind
    pub fn with_kind(&self, kind: TokenKind) -> Self {
        Self {
            kind,
            line: self.line,
            col: self.col,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace)
    }

    /// ASCII case-insensitive identifier match
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(name))
    }
}

impl TokenKind {
    /// Closing token kind for a grouping token, if this is one
    pub fn mirror(&self) -> Option<TokenKind> {
        match self {
            TokenKind::LeftBrace => Some(TokenKind::RightBrace),
            TokenKind::LeftBracket => Some(TokenKind::RightBracket),
            TokenKind::LeftParen | TokenKind::Function(_) => Some(TokenKind::RightParen),
            _ => None,
        }
    }

    /// Name of the token type as used in JSON output
    pub fn type_name(&self) -> &'static str {
        match self {
            TokenKind::Ident(_) => "IDENT",
            TokenKind::Function(_) => "FUNCTION_TOKEN",
            TokenKind::AtKeyword(_) => "AT_KEYWORD",
            TokenKind::Hash(..) => "HASH",
            TokenKind::String(_) => "STRING",
            TokenKind::BadString(_) => "BAD_STRING",
            TokenKind::Url(_) => "URL",
            TokenKind::BadUrl => "BAD_URL",
            TokenKind::Number(_) => "NUMBER",
            TokenKind::Percentage(_) => "PERCENTAGE",
            TokenKind::Dimension(..) => "DIMENSION",
            TokenKind::Whitespace => "WHITESPACE",
            TokenKind::Cdo => "CDO",
            TokenKind::Cdc => "CDC",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::LeftBracket => "OPEN_SQUARE",
            TokenKind::RightBracket => "CLOSE_SQUARE",
            TokenKind::LeftParen => "OPEN_PAREN",
            TokenKind::RightParen => "CLOSE_PAREN",
            TokenKind::LeftBrace => "OPEN_CURLY",
            TokenKind::RightBrace => "CLOSE_CURLY",
            TokenKind::IncludeMatch => "INCLUDE_MATCH",
            TokenKind::DashMatch => "DASH_MATCH",
            TokenKind::PrefixMatch => "PREFIX_MATCH",
            TokenKind::SuffixMatch => "SUFFIX_MATCH",
            TokenKind::SubstringMatch => "SUBSTRING_MATCH",
            TokenKind::Column => "COLUMN",
            TokenKind::Delim(_) => "DELIM",
            TokenKind::Eof => "EOF_TOKEN",
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("col", &self.col)?;
        map.serialize_entry("type", self.kind.type_name())?;

        match &self.kind {
            TokenKind::Ident(s)
            | TokenKind::Function(s)
            | TokenKind::AtKeyword(s)
            | TokenKind::String(s)
            | TokenKind::BadString(s)
            | TokenKind::Url(s) => map.serialize_entry("value", s)?,
            TokenKind::Hash(s, hash_type) => {
                map.serialize_entry("value", s)?;
                let kind = match hash_type {
                    HashType::Id => "id",
                    HashType::Unrestricted => "unrestricted",
                };
                map.serialize_entry("kind", kind)?;
            }
            TokenKind::Number(n) | TokenKind::Percentage(n) => serialize_numeric(&mut map, n)?,
            TokenKind::Dimension(n, unit) => {
                serialize_numeric(&mut map, n)?;
                map.serialize_entry("unit", unit)?;
            }
            TokenKind::Delim(c) => map.serialize_entry("value", &c.to_string())?,
            _ => {}
        }

        map.end()
    }
}

fn serialize_numeric<M: SerializeMap>(map: &mut M, n: &Numeric) -> Result<(), M::Error> {
    map.serialize_entry("value", &n.value)?;
    map.serialize_entry("repr", &n.repr)?;
    let kind = match n.kind {
        NumberKind::Integer => "integer",
        NumberKind::Number => "number",
    };
    map.serialize_entry("kind", kind)
}

/// Tokenize `input`, discarding diagnostics
///
/// The returned list is never empty: its last element is always an `Eof`
/// token positioned just past the input.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).tokenize_all()
}

/// Tokenize `input` starting at the given position, appending lexical
/// problems (unterminated strings and comments, bad urls, stray
/// backslashes) to `errors`
pub fn tokenize_with_errors(
    input: &str,
    line: usize,
    col: usize,
    errors: &mut Vec<ErrorToken>,
) -> Vec<Token> {
    let mut tokenizer = Tokenizer::with_position(input, line, col);
    let tokens = tokenizer.tokenize_all();
    errors.append(&mut tokenizer.errors);
    tokens
}

/// CSS Tokenizer
pub struct Tokenizer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    col: usize,
    token_start: SourceLocation,
    errors: Vec<ErrorToken>,
}

impl Tokenizer {
    /// Create a new tokenizer
    pub fn new(input: &str) -> Self {
        Self::with_position(input, 1, 0)
    }

    /// Create a tokenizer whose first character sits at `line`/`col`
    pub fn with_position(input: &str, line: usize, col: usize) -> Self {
        Self {
            chars: preprocess(input),
            position: 0,
            line,
            col,
            token_start: SourceLocation::new(line, col),
            errors: Vec::new(),
        }
    }

    /// Get the current source location
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// Lexical errors collected so far
    pub fn errors(&self) -> &[ErrorToken] {
        &self.errors
    }

    /// Peek `n` characters ahead without consuming
    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.position + n).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// Consume the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn error(&mut self, code: ErrorCode, location: SourceLocation) {
        self.errors.push(ErrorToken::style(code, location));
    }

    /// Consume any run of comments
    fn consume_comments(&mut self) {
        while self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            let start = self.location();
            self.advance_by(2);

            loop {
                match self.advance() {
                    Some('*') if self.peek() == Some('/') => {
                        self.advance();
                        break;
                    }
                    Some(_) => continue,
                    None => {
                        self.error(ErrorCode::CssSyntaxUnterminatedComment, start);
                        return;
                    }
                }
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.consume_comments();
        let start = self.location();
        self.token_start = start;
        let kind = self.consume_token_kind(start);
        Token::new(kind, start)
    }

    fn consume_token_kind(&mut self, start: SourceLocation) -> TokenKind {
        let c = match self.peek() {
            Some(c) => c,
            None => return TokenKind::Eof,
        };

        match c {
            c if is_whitespace(c) => {
                while self.peek().is_some_and(is_whitespace) {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            '"' | '\'' => self.consume_string(start),
            '#' => {
                self.advance();
                if self.peek().is_some_and(is_name_char)
                    || is_valid_escape(self.peek(), self.peek_at(1))
                {
                    let hash_type =
                        if would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2)) {
                            HashType::Id
                        } else {
                            HashType::Unrestricted
                        };
                    TokenKind::Hash(self.consume_name(), hash_type)
                } else {
                    TokenKind::Delim('#')
                }
            }
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semicolon),
            '$' => self.match_or_delim(TokenKind::SuffixMatch),
            '*' => self.match_or_delim(TokenKind::SubstringMatch),
            '^' => self.match_or_delim(TokenKind::PrefixMatch),
            '~' => self.match_or_delim(TokenKind::IncludeMatch),
            '|' => {
                if self.peek_at(1) == Some('|') {
                    self.advance_by(2);
                    TokenKind::Column
                } else {
                    self.match_or_delim(TokenKind::DashMatch)
                }
            }
            '+' | '.' => {
                if self.starts_number() {
                    self.consume_numeric()
                } else {
                    self.single(TokenKind::Delim(c))
                }
            }
            '-' => {
                if self.starts_number() {
                    self.consume_numeric()
                } else if self.peek_at(1) == Some('-') && self.peek_at(2) == Some('>') {
                    self.advance_by(3);
                    TokenKind::Cdc
                } else if self.starts_identifier() {
                    self.consume_ident_like()
                } else {
                    self.single(TokenKind::Delim('-'))
                }
            }
            '<' => {
                if self.peek_at(1) == Some('!')
                    && self.peek_at(2) == Some('-')
                    && self.peek_at(3) == Some('-')
                {
                    self.advance_by(4);
                    TokenKind::Cdo
                } else {
                    self.single(TokenKind::Delim('<'))
                }
            }
            '@' => {
                self.advance();
                if would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2)) {
                    TokenKind::AtKeyword(self.consume_name())
                } else {
                    TokenKind::Delim('@')
                }
            }
            '\\' => {
                if is_valid_escape(Some('\\'), self.peek_at(1)) {
                    self.consume_ident_like()
                } else {
                    // Backslash directly before a newline
                    self.error(ErrorCode::CssSyntaxStrayTrailingBackslash, start);
                    self.single(TokenKind::Delim('\\'))
                }
            }
            '0'..='9' => self.consume_numeric(),
            c if is_name_start(c) => self.consume_ident_like(),
            c => self.single(TokenKind::Delim(c)),
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// `X=` match operators; a lone `X` is a delimiter
    fn match_or_delim(&mut self, kind: TokenKind) -> TokenKind {
        let c = self.advance().unwrap_or('\u{FFFD}');
        if self.peek() == Some('=') {
            self.advance();
            kind
        } else {
            TokenKind::Delim(c)
        }
    }

    fn starts_number(&self) -> bool {
        would_start_number(self.peek(), self.peek_at(1), self.peek_at(2))
    }

    fn starts_identifier(&self) -> bool {
        would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2))
    }

    /// Consume a string token; the opening quote is the next character
    fn consume_string(&mut self, start: SourceLocation) -> TokenKind {
        let quote = self.advance().unwrap_or('"');
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return TokenKind::String(value),
                Some(c) if c == quote => {
                    self.advance();
                    return TokenKind::String(value);
                }
                Some('\n') => {
                    // The newline is left for the next token
                    self.error(ErrorCode::CssSyntaxUnterminatedString, start);
                    return TokenKind::BadString(value);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        None => {}
                        Some('\n') => {
                            self.advance();
                        }
                        Some(_) => value.push(self.consume_escape()),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
    }

    /// Consume an escape; the backslash has already been consumed
    fn consume_escape(&mut self) -> char {
        let c = match self.advance() {
            Some(c) => c,
            None => return '\u{FFFD}',
        };

        if !c.is_ascii_hexdigit() {
            return c;
        }

        let mut hex = String::from(c);
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.extend(self.advance());
        }
        if self.peek().is_some_and(is_whitespace) {
            self.advance();
        }

        match u32::from_str_radix(&hex, 16) {
            Ok(0) => '\u{FFFD}',
            Ok(code) if code <= MAX_CODEPOINT => char::from_u32(code).unwrap_or('\u{FFFD}'),
            _ => '\u{FFFD}',
        }
    }

    /// Consume an identifier name
    fn consume_name(&mut self) -> String {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some(c) if is_name_char(c) => {
                    self.advance();
                    name.push(c);
                }
                c if is_valid_escape(c, self.peek_at(1)) => {
                    self.advance();
                    name.push(self.consume_escape());
                }
                _ => return name,
            }
        }
    }

    /// Consume an identifier-like token (ident, function, or url)
    fn consume_ident_like(&mut self) -> TokenKind {
        let name = self.consume_name();

        if self.peek() != Some('(') {
            return TokenKind::Ident(name);
        }
        self.advance();

        if !name.eq_ignore_ascii_case("url") {
            return TokenKind::Function(name);
        }

        while self.peek().is_some_and(is_whitespace) && self.peek_at(1).is_some_and(is_whitespace)
        {
            self.advance();
        }
        let quoted = |c: Option<char>| matches!(c, Some('"') | Some('\''));
        if quoted(self.peek()) || (self.peek().is_some_and(is_whitespace) && quoted(self.peek_at(1)))
        {
            // Quoted URL - return as function, let parser handle it
            return TokenKind::Function(name);
        }

        self.consume_url()
    }

    /// Consume an unquoted URL after `url(`
    fn consume_url(&mut self) -> TokenKind {
        let mut url = String::new();

        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }

        loop {
            match self.advance() {
                None | Some(')') => return TokenKind::Url(url),
                Some(c) if is_whitespace(c) => {
                    while self.peek().is_some_and(is_whitespace) {
                        self.advance();
                    }
                    match self.peek() {
                        None => return TokenKind::Url(url),
                        Some(')') => {
                            self.advance();
                            return TokenKind::Url(url);
                        }
                        Some(_) => return self.consume_bad_url(),
                    }
                }
                Some('"') | Some('\'') | Some('(') => return self.consume_bad_url(),
                Some(c) if is_non_printable(c) => return self.consume_bad_url(),
                Some('\\') => {
                    if is_valid_escape(Some('\\'), self.peek()) {
                        url.push(self.consume_escape());
                    } else {
                        return self.consume_bad_url();
                    }
                }
                Some(c) => url.push(c),
            }
        }
    }

    /// Consume the remnants of a bad url up to and including `)`
    fn consume_bad_url(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                None | Some(')') => break,
                Some('\\') if is_valid_escape(Some('\\'), self.peek()) => {
                    self.consume_escape();
                }
                Some(_) => {}
            }
        }
        self.error(ErrorCode::CssSyntaxBadUrl, self.token_start);
        TokenKind::BadUrl
    }

    /// Consume a number, percentage or dimension
    fn consume_numeric(&mut self) -> TokenKind {
        let number = self.consume_number();

        if self.starts_identifier() {
            let unit = self.consume_name();
            return TokenKind::Dimension(number, unit);
        }

        if self.peek() == Some('%') {
            self.advance();
            return TokenKind::Percentage(number);
        }

        TokenKind::Number(number)
    }

    fn consume_digits(&mut self, repr: &mut String) {
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            self.advance();
            repr.push(c);
        }
    }

    fn consume_number(&mut self) -> Numeric {
        let mut repr = String::new();
        let mut kind = NumberKind::Integer;

        // Optional sign
        if let Some(c) = self.peek().filter(|c| *c == '+' || *c == '-') {
            self.advance();
            repr.push(c);
        }

        // Integer part
        self.consume_digits(&mut repr);

        // Decimal part
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            repr.push('.');
            kind = NumberKind::Number;
            self.consume_digits(&mut repr);
        }

        // Exponent part
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    repr.extend(self.advance());
                }
                kind = NumberKind::Number;
                self.consume_digits(&mut repr);
            }
        }

        let value = repr.parse::<f64>().unwrap_or(0.0);
        Numeric { value, repr, kind }
    }

    /// Tokenize all remaining input, including the trailing `Eof` token
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.is_eof() {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }
}

/// Normalize newlines and replace NUL characters
fn preprocess(input: &str) -> Vec<char> {
    let mut chars = Vec::with_capacity(input.len());
    let mut iter = input.chars().peekable();
    while let Some(c) = iter.next() {
        match c {
            '\r' => {
                if iter.peek() == Some(&'\n') {
                    iter.next();
                }
                chars.push('\n');
            }
            '\x0C' => chars.push('\n'),
            '\0' => chars.push('\u{FFFD}'),
            c => chars.push(c),
        }
    }
    chars
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\n' | '\t' | ' ')
}

fn is_non_printable(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0B' | '\x0E'..='\x1F' | '\x7F')
}

/// Check if character can start an identifier
pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c > '\x7F'
}

/// Check if character can be part of an identifier
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

fn is_valid_escape(c1: Option<char>, c2: Option<char>) -> bool {
    c1 == Some('\\') && c2 != Some('\n')
}

pub(crate) fn would_start_identifier(c1: Option<char>, c2: Option<char>, c3: Option<char>) -> bool {
    match c1 {
        Some('-') => {
            c2.is_some_and(is_name_start) || c2 == Some('-') || is_valid_escape(c2, c3)
        }
        Some('\\') => is_valid_escape(c1, c2),
        Some(c) => is_name_start(c),
        None => false,
    }
}

pub(crate) fn would_start_number(c1: Option<char>, c2: Option<char>, c3: Option<char>) -> bool {
    let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    match c1 {
        Some('+') | Some('-') => digit(c2) || (c2 == Some('.') && digit(c3)),
        Some('.') => digit(c2),
        c => digit(c),
    }
}
