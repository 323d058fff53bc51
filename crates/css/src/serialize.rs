//! Serialization back to CSS text
//!
//! Output is compact rather than pretty. Tokenizing and parsing the output
//! of a well-formed stylesheet gives back the same tree, apart from source
//! positions. An empty comment is written between two tokens whenever they
//! would otherwise run together into a different token.

use std::fmt::{self, Write};

use crate::ast::{AtRule, AtRuleBlock, Declaration, QualifiedRule, Rule, Stylesheet};
use crate::tokenizer::{is_name_char, HashType, Token, TokenKind};

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_token(f, &self.kind)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ident(f, &self.name)?;
        f.write_char(':')?;
        let last = write_tokens(f, &self.value, Some(&TokenKind::Colon))?.unwrap_or(TokenKind::Colon);
        if self.important {
            if needs_separator(&last, &TokenKind::Delim('!')) {
                f.write_str("/**/")?;
            }
            f.write_str("!important")?;
        }
        Ok(())
    }
}

impl fmt::Display for QualifiedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tokens(f, &self.prelude, None)?;
        f.write_char('{')?;
        write_declarations(f, &self.declarations)?;
        f.write_char('}')
    }
}

impl fmt::Display for AtRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = TokenKind::AtKeyword(self.name.clone());
        write_token(f, &keyword)?;
        write_tokens(f, &self.prelude, Some(&keyword))?;

        match &self.block {
            None => f.write_char(';'),
            Some(block) => {
                f.write_char('{')?;
                match block {
                    AtRuleBlock::Rules(rules) => write_rules(f, rules, " ")?,
                    AtRuleBlock::Declarations(declarations) => write_declarations(f, declarations)?,
                    AtRuleBlock::Ignored(tokens) => {
                        write_tokens(f, tokens, Some(&TokenKind::LeftBrace))?;
                    }
                }
                f.write_char('}')
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Qualified(rule) => fmt::Display::fmt(rule, f),
            Rule::At(rule) => fmt::Display::fmt(rule, f),
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rules(f, &self.rules, "\n")
    }
}

fn write_rules(f: &mut fmt::Formatter<'_>, rules: &[Rule], separator: &str) -> fmt::Result {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", rule)?;
    }
    Ok(())
}

fn write_declarations(f: &mut fmt::Formatter<'_>, declarations: &[Declaration]) -> fmt::Result {
    for (i, declaration) in declarations.iter().enumerate() {
        if i > 0 {
            f.write_str("; ")?;
        }
        write!(f, "{}", declaration)?;
    }
    Ok(())
}

/// Write a token sequence, returning the kind of the last token written
fn write_tokens(
    f: &mut fmt::Formatter<'_>,
    tokens: &[Token],
    previous: Option<&TokenKind>,
) -> Result<Option<TokenKind>, fmt::Error> {
    let mut previous = previous.cloned();
    for token in tokens {
        if token.is_eof() {
            continue;
        }
        if let Some(prev) = &previous {
            if needs_separator(prev, &token.kind) {
                f.write_str("/**/")?;
            }
        }
        write_token(f, &token.kind)?;
        previous = Some(token.kind.clone());
    }
    Ok(previous)
}

fn write_token<W: Write>(out: &mut W, kind: &TokenKind) -> fmt::Result {
    match kind {
        TokenKind::Ident(name) => write_ident(out, name),
        TokenKind::Function(name) => {
            write_ident(out, name)?;
            out.write_char('(')
        }
        TokenKind::AtKeyword(name) => {
            out.write_char('@')?;
            write_ident(out, name)
        }
        TokenKind::Hash(name, hash_type) => {
            out.write_char('#')?;
            match hash_type {
                HashType::Id => write_ident(out, name),
                HashType::Unrestricted => write_name(out, name),
            }
        }
        TokenKind::String(value) | TokenKind::BadString(value) => write_string(out, value),
        TokenKind::Url(url) => {
            out.write_str("url(")?;
            write_url(out, url)?;
            out.write_char(')')
        }
        TokenKind::BadUrl => out.write_str("url(\\\n)"),
        TokenKind::Number(n) => out.write_str(&n.repr),
        TokenKind::Percentage(n) => {
            out.write_str(&n.repr)?;
            out.write_char('%')
        }
        TokenKind::Dimension(n, unit) => {
            out.write_str(&n.repr)?;
            write_unit(out, unit)
        }
        TokenKind::Whitespace => out.write_char(' '),
        TokenKind::Cdo => out.write_str("<!--"),
        TokenKind::Cdc => out.write_str("-->"),
        TokenKind::Colon => out.write_char(':'),
        TokenKind::Semicolon => out.write_char(';'),
        TokenKind::Comma => out.write_char(','),
        TokenKind::LeftBracket => out.write_char('['),
        TokenKind::RightBracket => out.write_char(']'),
        TokenKind::LeftParen => out.write_char('('),
        TokenKind::RightParen => out.write_char(')'),
        TokenKind::LeftBrace => out.write_char('{'),
        TokenKind::RightBrace => out.write_char('}'),
        TokenKind::IncludeMatch => out.write_str("~="),
        TokenKind::DashMatch => out.write_str("|="),
        TokenKind::PrefixMatch => out.write_str("^="),
        TokenKind::SuffixMatch => out.write_str("$="),
        TokenKind::SubstringMatch => out.write_str("*="),
        TokenKind::Column => out.write_str("||"),
        // A backslash only stays a delimiter when a newline follows it
        TokenKind::Delim('\\') => out.write_str("\\\n"),
        TokenKind::Delim(c) => out.write_char(*c),
        TokenKind::Eof => Ok(()),
    }
}

fn write_hex_escape<W: Write>(out: &mut W, c: char) -> fmt::Result {
    write!(out, "\\{:x} ", c as u32)
}

/// Write an identifier so it tokenizes back to the same identifier
fn write_ident<W: Write>(out: &mut W, ident: &str) -> fmt::Result {
    if ident == "-" {
        return out.write_str("\\-");
    }

    let dashed = ident.starts_with('-');
    for (i, c) in ident.chars().enumerate() {
        // A digit may not open an identifier, even after a single dash
        if c.is_ascii_digit() && (i == 0 || (i == 1 && dashed)) {
            write_hex_escape(out, c)?;
        } else {
            write_name_char(out, c)?;
        }
    }
    Ok(())
}

/// Write a name (hash or unit body) escaping anything that is not a name char
fn write_name<W: Write>(out: &mut W, name: &str) -> fmt::Result {
    name.chars().try_for_each(|c| write_name_char(out, c))
}

fn write_name_char<W: Write>(out: &mut W, c: char) -> fmt::Result {
    if is_name_char(c) {
        out.write_char(c)
    } else if c == '\0' {
        out.write_char('\u{FFFD}')
    } else if c.is_control() {
        write_hex_escape(out, c)
    } else {
        out.write_char('\\')?;
        out.write_char(c)
    }
}

/// Write a dimension unit; a leading `e` that would read as an exponent is escaped
fn write_unit<W: Write>(out: &mut W, unit: &str) -> fmt::Result {
    let mut chars = unit.chars();
    let first = chars.next();
    let rest = chars.as_str();
    let mut lookahead = rest.chars();
    let exponent_like = match lookahead.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };

    match first {
        Some(c @ ('e' | 'E')) if exponent_like => {
            write_hex_escape(out, c)?;
            write_name(out, rest)
        }
        _ => write_ident(out, unit),
    }
}

fn write_string<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            '\0' => out.write_char('\u{FFFD}')?,
            c if c.is_control() => write_hex_escape(out, c)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

fn write_url<W: Write>(out: &mut W, url: &str) -> fmt::Result {
    for c in url.chars() {
        match c {
            '"' | '\'' | '(' | ')' | '\\' => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c if c.is_control() || c == ' ' => write_hex_escape(out, c)?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

/// Whether writing `next` straight after `prev` would change how either tokenizes
fn needs_separator(prev: &TokenKind, next: &TokenKind) -> bool {
    use TokenKind::*;

    let starts_name_like = matches!(
        next,
        Ident(_) | Function(_) | Url(_) | BadUrl | Number(_) | Percentage(_) | Dimension(..)
    ) || matches!(next, Delim('-'));

    match prev {
        Ident(_) => starts_name_like || matches!(next, Cdc | LeftParen),
        AtKeyword(_) | Hash(..) | Dimension(..) => starts_name_like || matches!(next, Cdc),
        Delim('#') | Delim('-') => starts_name_like,
        Delim('@') => matches!(next, Ident(_) | Function(_) | Url(_) | BadUrl | Cdc | Delim('-')),
        Number(_) => {
            matches!(
                next,
                Ident(_) | Function(_) | Url(_) | BadUrl | Number(_) | Percentage(_) | Dimension(..)
            ) || matches!(next, Delim('%'))
        }
        Delim('.') | Delim('+') => matches!(next, Number(_) | Percentage(_) | Dimension(..)),
        Delim('$') | Delim('*') | Delim('^') | Delim('~') => matches!(next, Delim('=')),
        Delim('|') => matches!(next, Delim('=') | Delim('|') | DashMatch | Column),
        Delim('/') => matches!(next, Delim('*') | SubstringMatch),
        Delim('<') => matches!(next, Delim('!')),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;
    use serde_json::Value;

    /// Tree with source positions removed
    fn shape(sheet: &Stylesheet) -> Value {
        fn strip(value: &mut Value) {
            match value {
                Value::Object(map) => {
                    map.remove("line");
                    map.remove("col");
                    map.values_mut().for_each(strip);
                }
                Value::Array(items) => items.iter_mut().for_each(strip),
                _ => {}
            }
        }
        let mut value = serde_json::to_value(sheet).unwrap();
        strip(&mut value);
        value
    }

    fn assert_round_trip(css: &str) {
        let sheet = parse(css);
        let text = sheet.to_string();
        let reparsed = parse(&text);
        assert_eq!(shape(&sheet), shape(&reparsed), "serialized as {:?}", text);
    }

    fn kinds(css: &str) -> Vec<TokenKind> {
        tokenize(css).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_stylesheet() {
        let sheet = parse("a { color: red; top: 0 }");
        assert_eq!(sheet.to_string(), "a {color: red; top: 0 }");
    }

    #[test]
    fn test_at_rules() {
        let sheet = parse("@import 'a.css';\n@media print { b { c: d } }");
        assert_eq!(sheet.to_string(), "@import \"a.css\";\n@media print {b {c: d }}");
    }

    #[test]
    fn test_important() {
        let sheet = parse("a { color: red!important }");
        assert_eq!(sheet.to_string(), "a {color: red!important}");
    }

    #[test]
    fn test_token_display() {
        let tokens = tokenize("#fff 1.5em 50% url(x) \"q\\\"\"");
        let text: Vec<String> = tokens
            .iter()
            .filter(|t| !t.is_whitespace() && !t.is_eof())
            .map(Token::to_string)
            .collect();
        assert_eq!(text, vec!["#fff", "1.5em", "50%", "url(x)", "\"q\\\"\""]);
    }

    #[test]
    fn test_separator_between_merging_tokens() {
        let tokens = vec![
            Token::new(TokenKind::Ident("a".into()), Default::default()),
            Token::new(TokenKind::Ident("b".into()), Default::default()),
        ];
        let decl = Declaration {
            name: "x".to_string(),
            value: tokens,
            important: false,
            line: 1,
            col: 0,
        };
        assert_eq!(decl.to_string(), "x:a/**/b");
    }

    #[test]
    fn test_escaped_identifiers() {
        let mut out = String::new();
        write_ident(&mut out, "1a").unwrap();
        assert_eq!(kinds(&out)[0], TokenKind::Ident("1a".to_string()));

        let mut out = String::new();
        write_ident(&mut out, "a b").unwrap();
        assert_eq!(kinds(&out)[0], TokenKind::Ident("a b".to_string()));
    }

    #[test]
    fn test_exponent_like_unit_escaped() {
        let sheet = parse("a { b: 1\\65 5 }");
        let text = sheet.to_string();
        let reparsed = parse(&text);
        assert_eq!(shape(&sheet), shape(&reparsed), "serialized as {:?}", text);
    }

    #[test]
    fn test_round_trip() {
        for css in [
            "",
            "a { color: red }",
            "a, b > c:hover::before { margin: 0 auto; padding: 1px 2px 3px 4px }",
            "#id.cls[href^='http'] { background: url(img.png) no-repeat, url(\"x y.png\") }",
            "@media screen and (min-width: 100px) { .a { color: red !important } }",
            "@font-face { font-family: 'My Font'; src: url(a.woff2) format('woff2') }",
            "@-webkit-keyframes spin { from { transform: rotate(0deg) } to { transform: rotate(360deg) } }",
            "@import url(a.css) screen; @charset \"utf-8\";",
            "@viewport { width: device-width }",
            "a { width: calc(100% - 2*3em); b: -1px+2; c: a-1 }",
            "a { content: \"\\\"\\\\\" ; x: --y; --custom: { a: b } }",
            "<!-- a { b: c } -->",
            "a { b: 1e3 1E-2 .5 +.5 -0.5e+1 }",
            "a|b, *|c, d||e { f: g }",
        ] {
            assert_round_trip(css);
        }
    }
}
