//! CSS Parser
//!
//! Turns a token list into a [`Stylesheet`], following the "consume a list
//! of rules" family of algorithms from CSS Syntax Level 3. Parsing never
//! fails: malformed input yields partial nodes and [`ErrorToken`]s.

use log::{debug, trace};
use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::ast::{AtRule, AtRuleBlock, Declaration, QualifiedRule, Rule, Stylesheet};
use crate::error::{ErrorCode, ErrorToken, SourceLocation};
use crate::tokenizer::{tokenize, Token, TokenKind};
use crate::vendor::canonical_name;

/// Deepest run of open blocks and functions kept in the tree. Anything
/// nested deeper is skipped to the end of the enclosing outermost block.
pub const MAX_NESTING_DEPTH: usize = 100;

/// How to parse the block of an at-rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// Qualified rules and at-rules, e.g. `@media`
    ParseAsRules,
    /// Declarations, e.g. `@font-face`
    ParseAsDeclarations,
    /// Keep the raw tokens
    ParseAsIgnore,
}

/// Block types per at-rule name
///
/// Names are matched after ASCII lowercasing and vendor-prefix stripping,
/// so an entry for `keyframes` also covers `@-webkit-keyframes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    pub at_rules: FxHashMap<String, BlockType>,
    pub default: BlockType,
}

impl ParserConfig {
    /// Config with no named at-rules
    pub fn new(default: BlockType) -> Self {
        Self {
            at_rules: FxHashMap::default(),
            default,
        }
    }

    pub fn with_at_rule(mut self, name: impl Into<String>, block_type: BlockType) -> Self {
        self.at_rules.insert(name.into(), block_type);
        self
    }

    /// Block type for an at-rule as written in the source
    pub fn block_type(&self, name: &str) -> BlockType {
        self.at_rules
            .get(&canonical_name(name))
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new(BlockType::ParseAsIgnore)
            .with_at_rule("media", BlockType::ParseAsRules)
            .with_at_rule("supports", BlockType::ParseAsRules)
            .with_at_rule("document", BlockType::ParseAsRules)
            .with_at_rule("keyframes", BlockType::ParseAsRules)
            .with_at_rule("font-face", BlockType::ParseAsDeclarations)
            .with_at_rule("page", BlockType::ParseAsDeclarations)
    }
}

/// Cursor over a token list
///
/// Reading past the end yields an `Eof` token positioned at the last token.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    /// Number of consumed tokens; the current token is `tokens[pos - 1]`
    pos: usize,
    eof: Token,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let location = tokens.last().map(Token::location).unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            eof: Token::new(TokenKind::Eof, location),
        }
    }

    fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    /// The most recently consumed token
    pub fn current(&self) -> &Token {
        match self.pos.checked_sub(1) {
            Some(index) => self.token_at(index),
            None => &self.eof,
        }
    }

    /// The token the next `consume` will make current
    pub fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    pub fn consume(&mut self) {
        if self.pos <= self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Step back so the current token is consumed again
    pub fn reconsume(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }
}

/// How a component value ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Closed,
    EndOfInput,
    TooDeep,
}

/// Consume the component value starting at the current token into `out`
///
/// Blocks and functions are walked with an explicit stack of expected
/// closers, so input depth never turns into call depth.
fn consume_component_value(stream: &mut TokenStream<'_>, out: &mut Vec<Token>) -> Nesting {
    let start = stream.current().clone();
    let Some(closer) = start.kind.mirror() else {
        out.push(start);
        return Nesting::Closed;
    };
    out.push(start);

    let mut expected: SmallVec<[TokenKind; 16]> = smallvec![closer];
    loop {
        stream.consume();
        let token = stream.current();

        if token.is_eof() {
            return Nesting::EndOfInput;
        }

        if expected.last() == Some(&token.kind) {
            out.push(token.clone());
            expected.pop();
            if expected.is_empty() {
                return Nesting::Closed;
            }
            continue;
        }

        if let Some(closer) = token.kind.mirror() {
            expected.push(closer);
            if expected.len() > MAX_NESTING_DEPTH {
                skip_nested(stream, &expected);
                return Nesting::TooDeep;
            }
        }
        out.push(token.clone());
    }
}

/// Skip to the close of the outermost open block or end of input
///
/// `open` holds the expected closers, innermost last. As in
/// [`consume_component_value`], only the innermost closer ends a block and
/// any other closer is skipped as an ordinary token. Closers are kept as
/// runs so that deep input costs one entry per change of bracket kind.
fn skip_nested(stream: &mut TokenStream<'_>, open: &[TokenKind]) {
    debug!(
        "Nesting deeper than {} at {}, skipping block",
        MAX_NESTING_DEPTH,
        stream.current().location()
    );

    let mut runs: Vec<(TokenKind, usize)> = Vec::new();
    for closer in open {
        push_closer(&mut runs, closer.clone());
    }

    let mut skipped = 0usize;
    while !runs.is_empty() {
        stream.consume();
        let token = stream.current();
        if token.is_eof() {
            break;
        }
        if let Some(closer) = token.kind.mirror() {
            push_closer(&mut runs, closer);
        } else if runs.last().is_some_and(|(closer, _)| *closer == token.kind) {
            pop_closer(&mut runs);
        }
        skipped += 1;
    }
    trace!("Skipped {} tokens of nested input", skipped);
}

fn push_closer(runs: &mut Vec<(TokenKind, usize)>, closer: TokenKind) {
    match runs.last_mut() {
        Some((last, count)) if *last == closer => *count += 1,
        _ => runs.push((closer, 1)),
    }
}

fn pop_closer(runs: &mut Vec<(TokenKind, usize)>) {
    if let Some((_, count)) = runs.last_mut() {
        *count -= 1;
        if *count == 0 {
            runs.pop();
        }
    }
}

/// Consume one component value, reporting excessive nesting
fn consume_value_into(
    stream: &mut TokenStream<'_>,
    out: &mut Vec<Token>,
    errors: &mut Vec<ErrorToken>,
) {
    if consume_component_value(stream, out) == Nesting::TooDeep {
        errors.push(ErrorToken::style(
            ErrorCode::CssExcessivelyNested,
            stream.current().location(),
        ));
    }
}

/// Consume the simple block opened by the current token
///
/// Returns its contents without the opening and closing tokens, terminated
/// by an `Eof` token at the position of the closer (or end of input).
pub fn extract_a_simple_block(
    stream: &mut TokenStream<'_>,
    errors: &mut Vec<ErrorToken>,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    let nesting = consume_component_value(stream, &mut tokens);
    let end = stream.current().location();

    if nesting == Nesting::TooDeep {
        errors.push(ErrorToken::style(ErrorCode::CssExcessivelyNested, end));
    }
    if nesting == Nesting::Closed {
        tokens.pop();
    }
    if !tokens.is_empty() {
        tokens.remove(0);
    }
    tokens.push(Token::new(TokenKind::Eof, end));
    tokens
}

/// Consume the function opened by the current token
///
/// Returns the function token and its arguments, with the closing paren
/// replaced by an `Eof` token.
pub fn extract_a_function(stream: &mut TokenStream<'_>, errors: &mut Vec<ErrorToken>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let nesting = consume_component_value(stream, &mut tokens);
    let end = stream.current().location();

    if nesting == Nesting::TooDeep {
        errors.push(ErrorToken::style(ErrorCode::CssExcessivelyNested, end));
    }
    if nesting == Nesting::Closed && tokens.len() > 1 {
        tokens.pop();
    }
    tokens.push(Token::new(TokenKind::Eof, end));
    tokens
}

fn at_declaration_end(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Semicolon | TokenKind::Eof)
}

/// Remove a trailing `! important` from a declaration value
fn strip_important(value: &mut Vec<Token>) -> bool {
    let mut found = false;
    for i in (0..value.len()).rev() {
        match &value[i].kind {
            TokenKind::Whitespace => continue,
            TokenKind::Ident(s) if !found && s.eq_ignore_ascii_case("important") => found = true,
            TokenKind::Delim('!') if found => {
                value.truncate(i);
                return true;
            }
            _ => return false,
        }
    }
    false
}

/// CSS Parser
pub struct CssParser<'c> {
    config: &'c ParserConfig,
}

impl<'c> CssParser<'c> {
    pub fn new(config: &'c ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a list of rules; at the top level `<!--` and `-->` are skipped
    pub fn parse_rule_list(
        &self,
        tokens: &[Token],
        top_level: bool,
        errors: &mut Vec<ErrorToken>,
    ) -> Vec<Rule> {
        let mut stream = TokenStream::new(tokens);
        let mut rules = Vec::new();

        loop {
            stream.consume();
            match stream.current().kind {
                TokenKind::Whitespace => continue,
                TokenKind::Eof => return rules,
                TokenKind::Cdo | TokenKind::Cdc if top_level => continue,
                TokenKind::AtKeyword(_) => {
                    rules.push(Rule::At(self.parse_at_rule(&mut stream, errors)));
                }
                _ => self.parse_qualified_rule(&mut stream, &mut rules, errors),
            }
        }
    }

    fn parse_at_rule(&self, stream: &mut TokenStream<'_>, errors: &mut Vec<ErrorToken>) -> AtRule {
        let start = stream.current().clone();
        let name = match &start.kind {
            TokenKind::AtKeyword(name) => name.clone(),
            _ => String::new(),
        };
        let mut rule = AtRule {
            name,
            prelude: Vec::new(),
            block: None,
            line: start.line,
            col: start.col,
        };

        loop {
            stream.consume();
            match stream.current().kind {
                TokenKind::Semicolon | TokenKind::Eof => return rule,
                TokenKind::LeftBrace => {
                    let contents = extract_a_simple_block(stream, errors);
                    let block = match self.config.block_type(&rule.name) {
                        BlockType::ParseAsRules => {
                            AtRuleBlock::Rules(self.parse_rule_list(&contents, false, errors))
                        }
                        BlockType::ParseAsDeclarations => {
                            AtRuleBlock::Declarations(self.parse_declaration_list(&contents, errors))
                        }
                        BlockType::ParseAsIgnore => {
                            let mut contents = contents;
                            contents.pop();
                            AtRuleBlock::Ignored(contents)
                        }
                    };
                    rule.block = Some(block);
                    return rule;
                }
                _ => consume_value_into(stream, &mut rule.prelude, errors),
            }
        }
    }

    fn parse_qualified_rule(
        &self,
        stream: &mut TokenStream<'_>,
        rules: &mut Vec<Rule>,
        errors: &mut Vec<ErrorToken>,
    ) {
        let start = stream.current().location();
        let mut prelude = Vec::new();
        stream.reconsume();

        loop {
            stream.consume();
            match stream.current().kind {
                TokenKind::Eof => {
                    errors.push(ErrorToken::style(
                        ErrorCode::CssSyntaxEofInPreludeOfQualifiedRule,
                        start,
                    ));
                    return;
                }
                TokenKind::LeftBrace => {
                    let contents = extract_a_simple_block(stream, errors);
                    let declarations = self.parse_declaration_list(&contents, errors);
                    rules.push(Rule::Qualified(QualifiedRule {
                        prelude,
                        declarations,
                        line: start.line,
                        col: start.col,
                    }));
                    return;
                }
                _ => consume_value_into(stream, &mut prelude, errors),
            }
        }
    }

    /// Parse the contents of a declaration block
    ///
    /// At-rules are not allowed here: they are consumed and reported.
    pub fn parse_declaration_list(
        &self,
        tokens: &[Token],
        errors: &mut Vec<ErrorToken>,
    ) -> Vec<Declaration> {
        let mut stream = TokenStream::new(tokens);
        let mut declarations = Vec::new();
        let mut skipped = Vec::new();

        loop {
            stream.consume();
            match stream.current().kind {
                TokenKind::Whitespace | TokenKind::Semicolon => continue,
                TokenKind::Eof => return declarations,
                TokenKind::AtKeyword(_) => {
                    let at_rule = self.parse_at_rule(&mut stream, errors);
                    errors.push(ErrorToken::new(
                        ErrorCode::CssSyntaxInvalidAtRule,
                        at_rule.location(),
                        vec!["style".to_string(), at_rule.name],
                    ));
                }
                TokenKind::Ident(_) => {
                    self.parse_declaration(&mut stream, &mut declarations, errors);
                }
                _ => {
                    errors.push(ErrorToken::style(
                        ErrorCode::CssSyntaxInvalidDeclaration,
                        stream.current().location(),
                    ));
                    stream.reconsume();
                    while !at_declaration_end(stream.peek()) {
                        stream.consume();
                        skipped.clear();
                        consume_value_into(&mut stream, &mut skipped, errors);
                    }
                }
            }
        }
    }

    fn parse_declaration(
        &self,
        stream: &mut TokenStream<'_>,
        declarations: &mut Vec<Declaration>,
        errors: &mut Vec<ErrorToken>,
    ) {
        let start = stream.current().clone();
        let name = match &start.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => String::new(),
        };

        while stream.peek().is_whitespace() {
            stream.consume();
        }

        stream.consume();
        if !matches!(stream.current().kind, TokenKind::Colon) {
            errors.push(ErrorToken::style(
                ErrorCode::CssSyntaxIncompleteDeclaration,
                start.location(),
            ));
            stream.reconsume();
            let mut skipped = Vec::new();
            while !at_declaration_end(stream.peek()) {
                stream.consume();
                skipped.clear();
                consume_value_into(stream, &mut skipped, errors);
            }
            return;
        }

        let mut value = Vec::new();
        while !at_declaration_end(stream.peek()) {
            stream.consume();
            consume_value_into(stream, &mut value, errors);
        }
        let important = strip_important(&mut value);

        declarations.push(Declaration {
            name,
            value,
            important,
            line: start.line,
            col: start.col,
        });
    }
}

/// Parse a stylesheet from tokens
pub fn parse_stylesheet(
    tokens: &[Token],
    config: &ParserConfig,
    errors: &mut Vec<ErrorToken>,
) -> Stylesheet {
    let parser = CssParser::new(config);
    let rules = parser.parse_rule_list(tokens, true, errors);

    let start = tokens.first().map(Token::location).unwrap_or_default();
    let eof = match tokens.last() {
        Some(token) if token.is_eof() => token.clone(),
        Some(token) => token.with_kind(TokenKind::Eof),
        None => Token::new(TokenKind::Eof, SourceLocation::default()),
    };

    debug!("Parsed stylesheet: {} top-level rules", rules.len());
    Stylesheet {
        rules,
        line: start.line,
        col: start.col,
        eof,
    }
}

/// Tokenize and parse `css` with the default config, discarding errors
pub fn parse(css: &str) -> Stylesheet {
    let mut errors = Vec::new();
    parse_stylesheet(&tokenize(css), &ParserConfig::default(), &mut errors)
}

/// Parse the declarations of a `style` attribute
pub fn parse_inline_style(tokens: &[Token], errors: &mut Vec<ErrorToken>) -> Vec<Declaration> {
    let config = ParserConfig::new(BlockType::ParseAsDeclarations);
    CssParser::new(&config).parse_declaration_list(tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_with_errors;

    fn parse_with_errors(css: &str) -> (Stylesheet, Vec<ErrorToken>) {
        let mut errors = Vec::new();
        let tokens = tokenize_with_errors(css, 1, 0, &mut errors);
        let sheet = parse_stylesheet(&tokens, &ParserConfig::default(), &mut errors);
        (sheet, errors)
    }

    fn qualified(rule: &Rule) -> &QualifiedRule {
        match rule {
            Rule::Qualified(rule) => rule,
            Rule::At(at) => panic!("expected qualified rule, got @{}", at.name),
        }
    }

    fn at_rule(rule: &Rule) -> &AtRule {
        match rule {
            Rule::At(rule) => rule,
            Rule::Qualified(_) => panic!("expected at-rule"),
        }
    }

    fn codes(errors: &[ErrorToken]) -> Vec<ErrorCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn test_empty_stylesheet() {
        let sheet = parse("");
        assert!(sheet.rules.is_empty());
        assert!(sheet.eof.is_eof());
        assert_eq!((sheet.line, sheet.col), (1, 0));
    }

    #[test]
    fn test_simple_rule() {
        let (sheet, errors) = parse_with_errors("div { color: red; }");
        assert!(errors.is_empty());
        assert_eq!(sheet.rules.len(), 1);

        let rule = qualified(&sheet.rules[0]);
        assert_eq!(rule.rule_name(), "div");
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(rule.declarations[0].name, "color");
        assert_eq!(rule.declarations[0].first_ident(), "red");
        assert!(!rule.declarations[0].important);
    }

    #[test]
    fn test_multiple_declarations() {
        let sheet = parse("p { margin: 0; padding: 10px 20px; border: 1px solid black }");
        let rule = qualified(&sheet.rules[0]);
        let names: Vec<&str> = rule.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["margin", "padding", "border"]);
    }

    #[test]
    fn test_important() {
        let sheet = parse("a { color: red ! IMPORTANT ; top: 0 }");
        let rule = qualified(&sheet.rules[0]);
        let color = &rule.declarations[0];
        assert!(color.important);
        assert!(!color.value.iter().any(|t| t.kind == TokenKind::Delim('!')));
        assert_eq!(color.first_ident(), "red");
        assert!(!rule.declarations[1].important);
    }

    #[test]
    fn test_important_must_be_last() {
        let sheet = parse("a { color: red !important blue }");
        let decl = &qualified(&sheet.rules[0]).declarations[0];
        assert!(!decl.important);
    }

    #[test]
    fn test_import_has_no_block() {
        let sheet = parse("@import url(foo.css) screen; a {}");
        assert_eq!(sheet.rules.len(), 2);
        let import = at_rule(&sheet.rules[0]);
        assert_eq!(import.name, "import");
        assert!(import.block.is_none());
        assert!(import
            .prelude
            .iter()
            .any(|t| matches!(&t.kind, TokenKind::Url(u) if u == "foo.css")));
    }

    #[test]
    fn test_media_rule() {
        let sheet = parse("@media screen and (min-width: 768px) { .container { width: 750px; } }");
        let media = at_rule(&sheet.rules[0]);
        assert_eq!(media.name, "media");
        assert_eq!(media.rules().len(), 1);
        assert_eq!(qualified(&media.rules()[0]).declarations[0].name, "width");
    }

    #[test]
    fn test_font_face_declarations() {
        let sheet = parse("@font-face { font-family: 'MyFont'; src: url(font.woff2) }");
        let font_face = at_rule(&sheet.rules[0]);
        assert!(matches!(font_face.block, Some(AtRuleBlock::Declarations(_))));
        assert_eq!(font_face.declarations().len(), 2);
    }

    #[test]
    fn test_unknown_at_rule_ignored() {
        let sheet = parse("@viewport { width: device-width }");
        let viewport = at_rule(&sheet.rules[0]);
        match &viewport.block {
            Some(AtRuleBlock::Ignored(tokens)) => {
                assert!(tokens.iter().any(|t| t.is_ident("device-width")));
                assert!(!tokens.iter().any(Token::is_eof));
            }
            other => panic!("expected ignored block, got {:?}", other),
        }
    }

    #[test]
    fn test_vendor_prefixed_at_rule_uses_base_block_type() {
        let sheet = parse("@-webkit-keyframes spin { from { top: 0 } to { top: 10px } }");
        let keyframes = at_rule(&sheet.rules[0]);
        assert_eq!(keyframes.name, "-webkit-keyframes");
        assert_eq!(keyframes.rules().len(), 2);
    }

    #[test]
    fn test_unterminated_at_rule_block() {
        let (sheet, _) = parse_with_errors("@media screen { .a { color: red");
        assert_eq!(sheet.rules.len(), 1);
        let media = at_rule(&sheet.rules[0]);
        assert_eq!(media.name, "media");
        assert_eq!(media.rules().len(), 1);

        let inner = qualified(&media.rules()[0]);
        assert_eq!(inner.rule_name(), ".a");
        assert_eq!(inner.declarations.len(), 1);
        assert_eq!(inner.declarations[0].name, "color");
        assert_eq!(inner.declarations[0].first_ident(), "red");
    }

    #[test]
    fn test_eof_in_prelude() {
        let (sheet, errors) = parse_with_errors("a {} b c");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(codes(&errors), vec![ErrorCode::CssSyntaxEofInPreludeOfQualifiedRule]);
        assert_eq!((errors[0].line, errors[0].col), (1, 5));
    }

    #[test]
    fn test_incomplete_declaration() {
        let (sheet, errors) = parse_with_errors("a { b; c: d }");
        let rule = qualified(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(rule.declarations[0].name, "c");
        assert_eq!(codes(&errors), vec![ErrorCode::CssSyntaxIncompleteDeclaration]);
        assert_eq!(errors[0].col, 4);
    }

    #[test]
    fn test_invalid_declaration() {
        let (sheet, errors) = parse_with_errors("a { 1px; c: d }");
        let rule = qualified(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(codes(&errors), vec![ErrorCode::CssSyntaxInvalidDeclaration]);
        assert_eq!(errors[0].col, 4);
    }

    #[test]
    fn test_at_rule_in_declaration_list() {
        let (sheet, errors) = parse_with_errors("a { @apply --x; c: d }");
        let rule = qualified(&sheet.rules[0]);
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::CssSyntaxInvalidAtRule);
        assert_eq!(errors[0].params, vec!["style", "apply"]);
        assert_eq!(errors[0].col, 4);
    }

    #[test]
    fn test_braces_inside_function_are_nested() {
        let sheet = parse("a { b: f(x{y;}z); c: d }");
        let rule = qualified(&sheet.rules[0]);
        let names: Vec<&str> = rule.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_cdo_cdc_skipped_at_top_level() {
        let sheet = parse("<!-- a { b: c } -->");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = MAX_NESTING_DEPTH - 1;
        let css = format!("a {{ b: {}{} }}", "(".repeat(depth), ")".repeat(depth));
        let (sheet, errors) = parse_with_errors(&css);
        assert!(errors.is_empty());
        assert_eq!(qualified(&sheet.rules[0]).declarations.len(), 1);
    }

    #[test]
    fn test_excessive_nesting_skips_rest_of_block() {
        let depth = MAX_NESTING_DEPTH + 5;
        let css = format!("a {{ b: {}{}; c: d }} e {{}}", "[".repeat(depth), "]".repeat(depth));
        let (sheet, errors) = parse_with_errors(&css);
        assert_eq!(codes(&errors), vec![ErrorCode::CssExcessivelyNested]);
        assert_eq!(sheet.rules.len(), 2);
        let names: Vec<&str> = qualified(&sheet.rules[0])
            .declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["b"]);
        assert_eq!(qualified(&sheet.rules[1]).rule_name(), "e");
    }

    #[test]
    fn test_stray_closer_inside_deep_nesting_is_skipped() {
        let depth = MAX_NESTING_DEPTH + 1;
        let css = String::from("a { b: ")
            + &"(".repeat(depth)
            + "}"
            + &")".repeat(depth)
            + "; c: d } e { f: g }";
        let (sheet, errors) = parse_with_errors(&css);
        assert_eq!(codes(&errors), vec![ErrorCode::CssExcessivelyNested]);
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(qualified(&sheet.rules[1]).rule_name(), "e");
        assert_eq!(qualified(&sheet.rules[1]).declarations[0].name, "f");
    }

    #[test]
    fn test_hundred_thousand_open_braces() {
        let css = "{".repeat(100_000);
        let (sheet, errors) = parse_with_errors(&css);
        let nested = errors
            .iter()
            .filter(|e| e.code == ErrorCode::CssExcessivelyNested)
            .count();
        assert_eq!(nested, 1);
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn test_block_types_from_config() {
        let config = ParserConfig::new(BlockType::ParseAsIgnore)
            .with_at_rule("media", BlockType::ParseAsDeclarations);
        let mut errors = Vec::new();
        let tokens = tokenize("@MEDIA x { a: b } @supports y { c {} }");
        let sheet = parse_stylesheet(&tokens, &config, &mut errors);
        assert!(matches!(at_rule(&sheet.rules[0]).block, Some(AtRuleBlock::Declarations(_))));
        assert!(matches!(at_rule(&sheet.rules[1]).block, Some(AtRuleBlock::Ignored(_))));
    }

    #[test]
    fn test_default_block_types() {
        let config = ParserConfig::default();
        assert_eq!(config.block_type("media"), BlockType::ParseAsRules);
        assert_eq!(config.block_type("-moz-document"), BlockType::ParseAsRules);
        assert_eq!(config.block_type("page"), BlockType::ParseAsDeclarations);
        assert_eq!(config.block_type("import"), BlockType::ParseAsIgnore);
    }

    #[test]
    fn test_parse_inline_style() {
        let mut errors = Vec::new();
        let tokens = tokenize("color: red; display: none !important");
        let declarations = parse_inline_style(&tokens, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(declarations.len(), 2);
        assert!(declarations[1].important);
        assert_eq!(declarations[1].first_ident(), "none");
    }

    #[test]
    fn test_extract_a_function() {
        let tokens = tokenize("f(a, (b)) c");
        let mut stream = TokenStream::new(&tokens);
        let mut errors = Vec::new();
        stream.consume();
        let function = extract_a_function(&mut stream, &mut errors);
        let names: Vec<&str> = function.iter().map(|t| t.kind.type_name()).collect();
        assert_eq!(names, vec![
            "FUNCTION_TOKEN",
            "IDENT",
            "COMMA",
            "WHITESPACE",
            "OPEN_PAREN",
            "IDENT",
            "CLOSE_PAREN",
            "EOF_TOKEN",
        ]);
        assert_eq!(stream.current().kind, TokenKind::RightParen);
        assert!(stream.peek().is_whitespace());
    }

    #[test]
    fn test_extract_a_simple_block() {
        let tokens = tokenize("{ a [b] }");
        let mut stream = TokenStream::new(&tokens);
        let mut errors = Vec::new();
        stream.consume();
        let block = extract_a_simple_block(&mut stream, &mut errors);
        assert_eq!(block.len(), 8);
        assert!(block[block.len() - 1].is_eof());
        assert_eq!(block[block.len() - 1].col, 8);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_declaration_positions() {
        let (sheet, _) = parse_with_errors("a {\n  color: red;\n  top: 0\n}");
        let rule = qualified(&sheet.rules[0]);
        let positions: Vec<(usize, usize)> =
            rule.declarations.iter().map(|d| (d.line, d.col)).collect();
        assert_eq!(positions, vec![(2, 2), (3, 2)]);
    }
}
