//! URL extraction from declaration values, and checks of the URLs found

use serde::Serialize;
use url::{ParseError, Url};

use crate::ast::{AtRule, Declaration, QualifiedRule, RuleVisitor, Stylesheet};
use crate::error::{ErrorCode, ErrorToken, SourceLocation};
use crate::profile::{CssProfile, UrlSpec};
use crate::tokenizer::{Token, TokenKind};

/// A URL found in a stylesheet, from `url(x)` or `url("x")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCssUrl {
    /// Decoded URL, without quotes or escapes
    pub url: String,
    /// Name of the enclosing at-rule, empty at the top level
    pub at_rule_scope: String,
    pub line: usize,
    pub col: usize,
}

impl ParsedCssUrl {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }
}

/// Collect URLs used in declaration values
///
/// A `url(` function whose argument is not a single string reports
/// `CSS_SYNTAX_BAD_URL`; if any error is reported, every URL this call
/// appended is removed again.
pub fn extract_urls(
    stylesheet: &Stylesheet,
    urls: &mut Vec<ParsedCssUrl>,
    errors: &mut Vec<ErrorToken>,
) {
    let urls_before = urls.len();
    let errors_before = errors.len();

    let mut visitor = UrlVisitor {
        urls,
        errors,
        at_rule_scope: String::new(),
    };
    stylesheet.accept(&mut visitor);

    if errors.len() != errors_before {
        urls.truncate(urls_before);
    }
}

struct UrlVisitor<'a> {
    urls: &'a mut Vec<ParsedCssUrl>,
    errors: &'a mut Vec<ErrorToken>,
    at_rule_scope: String,
}

impl UrlVisitor<'_> {
    fn push(&mut self, url: String, token: &Token) {
        self.urls.push(ParsedCssUrl {
            url,
            at_rule_scope: self.at_rule_scope.clone(),
            line: token.line,
            col: token.col,
        });
    }
}

impl RuleVisitor for UrlVisitor<'_> {
    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        self.at_rule_scope = at_rule.name.clone();
    }

    fn leave_at_rule(&mut self, _at_rule: &AtRule) {
        self.at_rule_scope.clear();
    }

    fn visit_qualified_rule(&mut self, _rule: &QualifiedRule) {
        self.at_rule_scope.clear();
    }

    fn visit_declaration(&mut self, declaration: &Declaration) {
        let tokens = &declaration.value;
        let mut index = 0;

        while let Some(token) = tokens.get(index) {
            match &token.kind {
                TokenKind::Url(url) => {
                    self.push(url.clone(), token);
                    index += 1;
                }
                TokenKind::Function(name) if name.eq_ignore_ascii_case("url") => {
                    match parse_url_function(tokens, index) {
                        Some((url, next)) => {
                            self.push(url, token);
                            index = next;
                        }
                        None => {
                            self.errors
                                .push(ErrorToken::style(ErrorCode::CssSyntaxBadUrl, token.location()));
                            return;
                        }
                    }
                }
                _ => index += 1,
            }
        }
    }
}

/// Parse `url( <string> )` starting at the function token
///
/// Returns the string and the index just past the closing paren.
fn parse_url_function(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let skip_whitespace = |mut index: usize| {
        while tokens.get(index).is_some_and(Token::is_whitespace) {
            index += 1;
        }
        index
    };

    let index = skip_whitespace(start + 1);
    let url = match tokens.get(index).map(|t| &t.kind) {
        Some(TokenKind::String(url)) => url.clone(),
        _ => return None,
    };

    let index = skip_whitespace(index + 1);
    match tokens.get(index).map(|t| &t.kind) {
        Some(TokenKind::RightParen) => Some((url, index + 1)),
        _ => None,
    }
}

/// Check URLs against the profile's URL specs
///
/// URLs in `@font-face` use `font_url_spec`, all others `image_url_spec`.
/// A URL reports at most one error, at its own position.
pub fn validate_urls(urls: &[ParsedCssUrl], profile: &CssProfile, errors: &mut Vec<ErrorToken>) {
    for url in urls {
        let Some(spec) = profile.url_spec(&url.at_rule_scope) else {
            continue;
        };
        if let Some((code, param)) = check_url(&url.url, spec) {
            let mut params = vec!["style".to_string()];
            params.extend(param);
            errors.push(ErrorToken::new(code, url.location(), params));
        }
    }
}

fn check_url(raw: &str, spec: &UrlSpec) -> Option<(ErrorCode, Option<String>)> {
    if raw.chars().all(char::is_whitespace) && !spec.allow_empty {
        return Some((ErrorCode::CssSyntaxMissingUrl, None));
    }

    let parsed = match Url::parse(raw) {
        Ok(parsed) => Some(parsed),
        Err(ParseError::RelativeUrlWithoutBase) => None,
        Err(_) => return Some((ErrorCode::CssSyntaxInvalidUrl, Some(raw.to_string()))),
    };

    let protocol = leading_protocol(raw)
        .or_else(|| parsed.as_ref().map(|url| url.scheme().to_string()))
        .unwrap_or_default();
    if !protocol.is_empty() && !spec.is_allowed_protocol(&protocol) {
        return Some((ErrorCode::CssSyntaxInvalidUrlProtocol, Some(protocol)));
    }

    let host = match &parsed {
        Some(url) => url.host_str().map(str::to_string),
        None if !spec.allow_relative => {
            return Some((ErrorCode::CssSyntaxDisallowedRelativeUrl, Some(raw.to_string())));
        }
        // Protocol-relative URLs still name a host
        None if raw.trim_start().starts_with("//") => {
            Url::parse(&format!("https:{}", raw.trim_start()))
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
        }
        None => None,
    };

    let domain = host?.to_lowercase();
    if !domain.is_empty() && spec.is_disallowed_domain(&domain) {
        return Some((ErrorCode::CssSyntaxDisallowedDomain, Some(domain)));
    }
    None
}

/// Protocol as old browsers read it: anything before the first `:` that
/// has no `/ ? # .`, even when it holds whitespace
fn leading_protocol(raw: &str) -> Option<String> {
    let (scheme, _) = raw.split_once(':')?;
    if scheme.is_empty() || scheme.contains(|c| matches!(c, '/' | '?' | '#' | '.')) {
        return None;
    }
    Some(scheme.to_lowercase().trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn extract(css: &str) -> (Vec<ParsedCssUrl>, Vec<ErrorToken>) {
        let sheet = parse(css);
        let mut urls = Vec::new();
        let mut errors = Vec::new();
        extract_urls(&sheet, &mut urls, &mut errors);
        (urls, errors)
    }

    #[test]
    fn test_url_tokens_and_functions() {
        let (urls, errors) = extract(
            "a { background: url(a.png) no-repeat, url( \"b.png\" ) }\n\
             @font-face { src: URL('f.woff') format('woff') }",
        );
        assert!(errors.is_empty());
        let found: Vec<(&str, &str)> = urls
            .iter()
            .map(|u| (u.url.as_str(), u.at_rule_scope.as_str()))
            .collect();
        assert_eq!(found, vec![("a.png", ""), ("b.png", ""), ("f.woff", "font-face")]);
        assert_eq!((urls[0].line, urls[0].col), (1, 16));
        assert_eq!((urls[2].line, urls[2].col), (2, 18));
    }

    #[test]
    fn test_scope_resets_after_at_rule() {
        let (urls, _) = extract("@media print { a { b: url(x) } } c { d: url(y) }");
        assert_eq!(urls[0].at_rule_scope, "");
        assert_eq!(urls[1].at_rule_scope, "");

        let (urls, _) = extract("@font-face { src: url(x) } c { d: url(y) }");
        assert_eq!(urls[0].at_rule_scope, "font-face");
        assert_eq!(urls[1].at_rule_scope, "");
    }

    #[test]
    fn test_bad_url_function_drops_urls() {
        let (urls, errors) = extract("a { b: url(ok.png) } c { d: url('x' 'y') }");
        assert!(urls.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::CssSyntaxBadUrl);
        assert_eq!(errors[0].col, 28);
    }

    #[test]
    fn test_url_function_needs_string() {
        let (urls, errors) = extract("a { b: url(\"x\" }");
        assert!(urls.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_keeps_earlier_urls_on_success() {
        let sheet = parse("a { b: url(y) }");
        let mut urls = vec![ParsedCssUrl {
            url: "x".to_string(),
            at_rule_scope: String::new(),
            line: 1,
            col: 0,
        }];
        let mut errors = Vec::new();
        extract_urls(&sheet, &mut urls, &mut errors);
        assert_eq!(urls.len(), 2);
    }

    fn check(css: &str, profile: &CssProfile) -> Vec<ErrorToken> {
        let (urls, mut errors) = extract(css);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        validate_urls(&urls, profile, &mut errors);
        errors
    }

    fn url_profile() -> CssProfile {
        CssProfile::from_json_str(
            r#"{
                "image_url_spec": {
                    "allowed_protocols": ["http", "https", "data"],
                    "disallowed_domains": ["tracker.example"]
                },
                "font_url_spec": { "allowed_protocols": ["https"], "allow_relative": false }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_urls_pass() {
        let css = "a { b: url(img.png) url(https://cdn.test/x.png) url('data:image/png;base64,AAAA') }\n\
                   @font-face { src: url(https://fonts.test/a.woff2) }";
        assert!(check(css, &url_profile()).is_empty());
    }

    #[test]
    fn test_no_url_spec_means_no_checks() {
        let css = "a { b: url('javascript:alert(1)') } @font-face { src: url('') }";
        assert!(check(css, &CssProfile::default()).is_empty());
    }

    #[test]
    fn test_missing_url() {
        let errors = check("a { b: url('') }", &url_profile());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::CssSyntaxMissingUrl);
        assert_eq!(errors[0].params, vec!["style"]);
        assert_eq!((errors[0].line, errors[0].col), (1, 7));
    }

    #[test]
    fn test_invalid_url() {
        let errors = check("a { b: url('http://') }", &url_profile());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::CssSyntaxInvalidUrl);
        assert_eq!(errors[0].params, vec!["style", "http://"]);
    }

    #[test]
    fn test_invalid_protocol() {
        let errors = check("a { b: url('JavaScript:alert(1)') }", &url_profile());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::CssSyntaxInvalidUrlProtocol);
        assert_eq!(errors[0].params, vec!["style", "javascript"]);
        assert!(errors[0].message().contains("'javascript:'"));
    }

    #[test]
    fn test_font_face_uses_font_spec() {
        let css = "@font-face { src: url(font.woff), url(http://fonts.test/a.woff) } a { b: url(font.woff) }";
        let errors = check(css, &url_profile());
        let found: Vec<(ErrorCode, &str)> = errors
            .iter()
            .map(|e| (e.code, e.params[1].as_str()))
            .collect();
        assert_eq!(found, vec![
            (ErrorCode::CssSyntaxDisallowedRelativeUrl, "font.woff"),
            (ErrorCode::CssSyntaxInvalidUrlProtocol, "http"),
        ]);
    }

    #[test]
    fn test_disallowed_domain() {
        let css = "a { b: url(https://pixel.Tracker.example/p.gif) url(//tracker.example/q.gif) \
                   url(https://nottracker.example/r.gif) }";
        let errors = check(css, &url_profile());
        let domains: Vec<&str> = errors.iter().map(|e| e.params[1].as_str()).collect();
        assert!(errors.iter().all(|e| e.code == ErrorCode::CssSyntaxDisallowedDomain));
        assert_eq!(domains, vec!["pixel.tracker.example", "tracker.example"]);
    }
}
