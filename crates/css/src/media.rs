//! Media query checking for `@media` preludes
//!
//! Implements the CSS3 media query grammar:
//!
//! ```text
//! media_query_list : S* [media_query [ ',' S* media_query ]* ]?
//! media_query      : [ONLY | NOT]? S* media_type S* [ AND S* expression ]*
//!                  | expression [ AND S* expression ]*
//! expression       : '(' S* media_feature S* [ ':' S* expr ]? ')' S*
//! ```

use crate::ast::{AtRule, RuleVisitor, Stylesheet};
use crate::error::{ErrorCode, ErrorToken};
use crate::parser::TokenStream;
use crate::profile::MediaQuerySpec;
use crate::tokenizer::{Token, TokenKind};
use crate::vendor::{canonical_name, strip_min_max};

/// Collect media types and features used by `@media` rules
///
/// Types and features are the identifier tokens as written. A prelude that
/// does not match the grammar reports `CSS_SYNTAX_MALFORMED_MEDIA_QUERY` at
/// the at-rule.
pub fn parse_media_queries(
    stylesheet: &Stylesheet,
    media_types: &mut Vec<Token>,
    media_features: &mut Vec<Token>,
    errors: &mut Vec<ErrorToken>,
) {
    let mut visitor = MediaQueryVisitor {
        media_types,
        media_features,
        errors,
    };
    stylesheet.accept(&mut visitor);
}

/// Report media types and features that `spec` does not list
///
/// Types are compared lowercased and vendor-stripped; features also lose a
/// `min-`/`max-` prefix. Errors sit at the offending identifier.
pub fn validate_media_queries(
    stylesheet: &Stylesheet,
    spec: &MediaQuerySpec,
    errors: &mut Vec<ErrorToken>,
) {
    let mut media_types = Vec::new();
    let mut media_features = Vec::new();
    parse_media_queries(stylesheet, &mut media_types, &mut media_features, errors);

    for token in &media_types {
        if let TokenKind::Ident(name) = &token.kind {
            let media_type = canonical_name(name);
            if !spec.types.iter().any(|t| *t == media_type) {
                errors.push(ErrorToken::new(
                    ErrorCode::CssSyntaxDisallowedMediaType,
                    token.location(),
                    vec!["style".to_string(), name.clone()],
                ));
            }
        }
    }

    for token in &media_features {
        if let TokenKind::Ident(name) = &token.kind {
            let canonical = canonical_name(name);
            let feature = strip_min_max(&canonical);
            if !spec.features.iter().any(|f| f == feature) {
                errors.push(ErrorToken::new(
                    ErrorCode::CssSyntaxDisallowedMediaFeature,
                    token.location(),
                    vec!["style".to_string(), name.clone()],
                ));
            }
        }
    }
}

struct MediaQueryVisitor<'a> {
    media_types: &'a mut Vec<Token>,
    media_features: &'a mut Vec<Token>,
    errors: &'a mut Vec<ErrorToken>,
}

impl RuleVisitor for MediaQueryVisitor<'_> {
    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        if !at_rule.name.eq_ignore_ascii_case("media") {
            return;
        }

        let mut stream = TokenStream::new(&at_rule.prelude);
        stream.consume();
        if !self.parse_media_query_list(&mut stream) {
            self.errors.push(ErrorToken::style(
                ErrorCode::CssSyntaxMalformedMediaQuery,
                at_rule.location(),
            ));
        }
    }
}

impl MediaQueryVisitor<'_> {
    /// Skip at most one whitespace token
    ///
    /// A comment between two runs of whitespace leaves two tokens, so such
    /// a prelude can still be reported as malformed.
    fn skip_whitespace(stream: &mut TokenStream<'_>) {
        if stream.current().is_whitespace() {
            stream.consume();
        }
    }

    fn parse_media_query_list(&mut self, stream: &mut TokenStream<'_>) -> bool {
        Self::skip_whitespace(stream);
        if !stream.current().is_eof() {
            if !self.parse_media_query(stream) {
                return false;
            }
            while matches!(stream.current().kind, TokenKind::Comma) {
                stream.consume();
                Self::skip_whitespace(stream);
                if !self.parse_media_query(stream) {
                    return false;
                }
            }
        }
        stream.current().is_eof()
    }

    fn parse_media_query(&mut self, stream: &mut TokenStream<'_>) -> bool {
        if matches!(stream.current().kind, TokenKind::LeftParen) {
            if !self.parse_media_expression(stream) {
                return false;
            }
        } else {
            if stream.current().is_ident("only") || stream.current().is_ident("not") {
                stream.consume();
            }
            Self::skip_whitespace(stream);
            if !self.parse_media_type(stream) {
                return false;
            }
            Self::skip_whitespace(stream);
        }

        while stream.current().is_ident("and") {
            stream.consume();
            Self::skip_whitespace(stream);
            if !self.parse_media_expression(stream) {
                return false;
            }
        }
        true
    }

    fn parse_media_type(&mut self, stream: &mut TokenStream<'_>) -> bool {
        if matches!(stream.current().kind, TokenKind::Ident(_)) {
            self.media_types.push(stream.current().clone());
            stream.consume();
            return true;
        }
        false
    }

    fn parse_media_expression(&mut self, stream: &mut TokenStream<'_>) -> bool {
        if !matches!(stream.current().kind, TokenKind::LeftParen) {
            return false;
        }
        stream.consume();
        Self::skip_whitespace(stream);
        if !self.parse_media_feature(stream) {
            return false;
        }
        Self::skip_whitespace(stream);

        if matches!(stream.current().kind, TokenKind::Colon) {
            stream.consume();
            Self::skip_whitespace(stream);
            // Feature values are single tokens or ratios; they are not checked
            while !matches!(stream.current().kind, TokenKind::Eof | TokenKind::RightParen) {
                stream.consume();
            }
        }

        if !matches!(stream.current().kind, TokenKind::RightParen) {
            return false;
        }
        stream.consume();
        Self::skip_whitespace(stream);
        true
    }

    fn parse_media_feature(&mut self, stream: &mut TokenStream<'_>) -> bool {
        if matches!(stream.current().kind, TokenKind::Ident(_)) {
            self.media_features.push(stream.current().clone());
            stream.consume();
            return true;
        }
        false
    }
}
