//! Semantic checks for restricted (ad creative) stylesheets
//!
//! The pass reads a parsed [`Stylesheet`] and appends an [`ErrorToken`] for
//! every construct the [`CssProfile`] forbids. It never modifies the tree
//! and reports findings in source order.

use log::debug;

use crate::ast::{AtRule, Declaration, QualifiedRule, RuleVisitor, Stylesheet};
use crate::error::{ErrorCode, ErrorToken};
use crate::media::validate_media_queries;
use crate::profile::{AtRuleType, CssProfile};
use crate::tokenizer::{Token, TokenKind};
use crate::urls::{extract_urls, validate_urls, ParsedCssUrl};
use crate::vendor::canonical_name;

/// Run every stylesheet check the profile configures
///
/// URLs are extracted and checked, `@media` preludes are checked when the
/// profile has a media query spec, then [`validate_a4a_css`] runs. The new
/// errors are sorted by position; errors already in `errors` stay first.
/// Returns the extracted URLs.
pub fn validate_stylesheet(
    stylesheet: &Stylesheet,
    profile: &CssProfile,
    errors: &mut Vec<ErrorToken>,
) -> Vec<ParsedCssUrl> {
    let before = errors.len();

    let mut urls = Vec::new();
    extract_urls(stylesheet, &mut urls, errors);
    validate_urls(&urls, profile, errors);

    if let Some(spec) = &profile.media_query_spec {
        validate_media_queries(stylesheet, spec, errors);
    }

    validate_a4a_css(stylesheet, profile, errors);

    errors[before..].sort_by_key(|e| (e.line, e.col));
    debug!(
        "Checked stylesheet: {} urls, {} errors",
        urls.len(),
        errors.len() - before
    );
    urls
}

/// Check `stylesheet` against `profile`, appending violations to `errors`
pub fn validate_a4a_css(stylesheet: &Stylesheet, profile: &CssProfile, errors: &mut Vec<ErrorToken>) {
    let before = errors.len();
    let mut visitor = A4aVisitor {
        profile,
        errors,
        at_rules: Vec::new(),
        qualified_prelude: None,
    };
    stylesheet.accept(&mut visitor);
    debug!("A4A validation: {} errors", visitor.errors.len() - before);
}

struct A4aVisitor<'a> {
    profile: &'a CssProfile,
    errors: &'a mut Vec<ErrorToken>,
    /// Canonical names of the enclosing at-rules, innermost last
    at_rules: Vec<String>,
    /// Prelude of the enclosing qualified rule
    qualified_prelude: Option<Vec<Token>>,
}

impl A4aVisitor<'_> {
    fn report(&mut self, code: ErrorCode, declaration: &Declaration, extra: Vec<String>) {
        let mut params = vec!["style".to_string(), declaration.name.clone()];
        params.extend(extra);
        self.errors
            .push(ErrorToken::new(code, declaration.location(), params));
    }

    fn check_value(&mut self, property: &str, declaration: &Declaration) {
        let value = declaration.first_ident();

        if let Some(disallowed) = self.profile.disallowed_property_values.get(property) {
            if contains_ignore_case(disallowed, value) {
                self.report(
                    ErrorCode::CssSyntaxDisallowedPropertyValue,
                    declaration,
                    vec![value.to_string()],
                );
                return;
            }
        }

        if let Some(allowed) = self.profile.property_value_allowlists.get(property) {
            if !contains_ignore_case(allowed, value) {
                self.report(
                    ErrorCode::CssSyntaxDisallowedPropertyValueWithHint,
                    declaration,
                    vec![value.to_string(), allowed.join(", ")],
                );
            }
        }
    }

    fn check_at_rule_scope(&mut self, property: &str, declaration: &Declaration) {
        let Some(at_rule) = self.at_rules.last() else {
            return;
        };
        let Some(allowed) = self.profile.at_rule_property_allowlists.get(at_rule) else {
            return;
        };
        if !contains_ignore_case(allowed, property) {
            let extra = vec![at_rule.clone(), allowed.join(", ")];
            self.report(
                ErrorCode::CssSyntaxPropertyDisallowedWithinAtRule,
                declaration,
                extra,
            );
        }
    }

    fn check_qualification(&mut self, property: &str, declaration: &Declaration) {
        let Some(qualifier) = self.profile.qualified_properties.get(property) else {
            return;
        };
        let Some(prelude) = &self.qualified_prelude else {
            return;
        };
        if !prelude_has_class(prelude, qualifier.trim_start_matches('.')) {
            let extra = vec![qualifier.clone()];
            self.report(
                ErrorCode::CssSyntaxPropertyRequiresQualification,
                declaration,
                extra,
            );
        }
    }
}

impl RuleVisitor for A4aVisitor<'_> {
    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        if self.profile.at_rule_type(&at_rule.name) == AtRuleType::Error {
            self.errors.push(ErrorToken::new(
                ErrorCode::CssSyntaxInvalidAtRule,
                at_rule.location(),
                vec!["style".to_string(), at_rule.name.clone()],
            ));
        }
        self.at_rules.push(canonical_name(&at_rule.name));
    }

    fn leave_at_rule(&mut self, _at_rule: &AtRule) {
        self.at_rules.pop();
    }

    fn visit_qualified_rule(&mut self, rule: &QualifiedRule) {
        self.qualified_prelude = Some(rule.prelude.clone());
    }

    fn leave_qualified_rule(&mut self, _rule: &QualifiedRule) {
        self.qualified_prelude = None;
    }

    fn visit_declaration(&mut self, declaration: &Declaration) {
        let property = canonical_name(&declaration.name);

        self.check_value(&property, declaration);
        self.check_at_rule_scope(&property, declaration);
        self.check_qualification(&property, declaration);

        if declaration.important && !self.profile.allow_important {
            self.report(ErrorCode::CssSyntaxDisallowedImportant, declaration, Vec::new());
        }
    }
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

/// Whether a selector prelude contains `.class`
fn prelude_has_class(prelude: &[Token], class: &str) -> bool {
    prelude.windows(2).any(|pair| {
        matches!(
            (&pair[0].kind, &pair[1].kind),
            (TokenKind::Delim('.'), TokenKind::Ident(name)) if name == class
        )
    })
}
