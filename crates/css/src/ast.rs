//! Stylesheet syntax tree
//!
//! Nodes keep raw tokens for preludes and values. Nothing here is normalized;
//! name folding and vendor-prefix stripping happen in the passes that read
//! the tree.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::SourceLocation;
use crate::tokenizer::{Token, TokenKind};

/// A parsed stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    pub line: usize,
    pub col: usize,
    /// End-of-input token, positioned just past the last character
    pub eof: Token,
}

/// A top-level or nested rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Qualified(QualifiedRule),
    At(AtRule),
}

/// A rule with a selector prelude and one declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedRule {
    pub prelude: Vec<Token>,
    pub declarations: Vec<Declaration>,
    pub line: usize,
    pub col: usize,
}

/// An at-rule such as `@media` or `@import`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// At-keyword without the `@`, exactly as written
    pub name: String,
    pub prelude: Vec<Token>,
    /// `None` when the rule ended with `;` or end of input
    pub block: Option<AtRuleBlock>,
    pub line: usize,
    pub col: usize,
}

/// Contents of an at-rule block, shaped by the rule's block type
#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleBlock {
    Rules(Vec<Rule>),
    Declarations(Vec<Declaration>),
    /// Unparsed block contents
    Ignored(Vec<Token>),
}

/// A `name: value` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    /// Tokens after the colon, without a trailing `!important`
    pub value: Vec<Token>,
    pub important: bool,
    pub line: usize,
    pub col: usize,
}

impl Stylesheet {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    pub fn accept(&self, visitor: &mut dyn RuleVisitor) {
        visitor.visit_stylesheet(self);
        for rule in &self.rules {
            rule.accept(visitor);
        }
        visitor.leave_stylesheet(self);
    }
}

impl Rule {
    pub fn location(&self) -> SourceLocation {
        match self {
            Rule::Qualified(rule) => rule.location(),
            Rule::At(rule) => rule.location(),
        }
    }

    pub fn accept(&self, visitor: &mut dyn RuleVisitor) {
        match self {
            Rule::Qualified(rule) => rule.accept(visitor),
            Rule::At(rule) => rule.accept(visitor),
        }
    }
}

impl QualifiedRule {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// Concatenated values of the prelude tokens, e.g. `.foo` or `body`
    ///
    /// Whitespace and punctuation tokens contribute nothing, and a hash
    /// contributes its name without the `#`.
    pub fn rule_name(&self) -> String {
        let mut name = String::new();
        for token in &self.prelude {
            match &token.kind {
                TokenKind::Ident(s)
                | TokenKind::Function(s)
                | TokenKind::AtKeyword(s)
                | TokenKind::Hash(s, _)
                | TokenKind::String(s)
                | TokenKind::Url(s) => name.push_str(s),
                TokenKind::Number(n) | TokenKind::Percentage(n) | TokenKind::Dimension(n, _) => {
                    name.push_str(&n.repr)
                }
                TokenKind::Delim(c) => name.push(*c),
                _ => {}
            }
        }
        name
    }

    pub fn accept(&self, visitor: &mut dyn RuleVisitor) {
        visitor.visit_qualified_rule(self);
        for declaration in &self.declarations {
            declaration.accept(visitor);
        }
        visitor.leave_qualified_rule(self);
    }
}

impl AtRule {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// Nested rules, empty unless the block was parsed as rules
    pub fn rules(&self) -> &[Rule] {
        match &self.block {
            Some(AtRuleBlock::Rules(rules)) => rules,
            _ => &[],
        }
    }

    /// Nested declarations, empty unless the block was parsed as declarations
    pub fn declarations(&self) -> &[Declaration] {
        match &self.block {
            Some(AtRuleBlock::Declarations(declarations)) => declarations,
            _ => &[],
        }
    }

    pub fn accept(&self, visitor: &mut dyn RuleVisitor) {
        visitor.visit_at_rule(self);
        for rule in self.rules() {
            rule.accept(visitor);
        }
        for declaration in self.declarations() {
            declaration.accept(visitor);
        }
        visitor.leave_at_rule(self);
    }
}

impl Declaration {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// The value's identifier when it is the first non-whitespace token;
    /// empty otherwise
    pub fn first_ident(&self) -> &str {
        let first = self.value.iter().find(|t| !t.is_whitespace());
        match first.map(|t| &t.kind) {
            Some(TokenKind::Ident(s)) => s,
            _ => "",
        }
    }

    pub fn accept(&self, visitor: &mut dyn RuleVisitor) {
        visitor.visit_declaration(self);
        visitor.leave_declaration(self);
    }
}

/// Pre-order walker over a stylesheet
///
/// `visit_*` runs before a node's children and `leave_*` after them.
/// Children are visited in source order; for an at-rule, nested rules come
/// before nested declarations.
pub trait RuleVisitor {
    fn visit_stylesheet(&mut self, _stylesheet: &Stylesheet) {}
    fn leave_stylesheet(&mut self, _stylesheet: &Stylesheet) {}
    fn visit_at_rule(&mut self, _at_rule: &AtRule) {}
    fn leave_at_rule(&mut self, _at_rule: &AtRule) {}
    fn visit_qualified_rule(&mut self, _qualified_rule: &QualifiedRule) {}
    fn leave_qualified_rule(&mut self, _qualified_rule: &QualifiedRule) {}
    fn visit_declaration(&mut self, _declaration: &Declaration) {}
    fn leave_declaration(&mut self, _declaration: &Declaration) {}
}

impl Serialize for Stylesheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "STYLESHEET")?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("col", &self.col)?;
        map.serialize_entry("rules", &self.rules)?;
        map.serialize_entry("eof", &self.eof)?;
        map.end()
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rule::Qualified(rule) => rule.serialize(serializer),
            Rule::At(rule) => rule.serialize(serializer),
        }
    }
}

impl Serialize for QualifiedRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "QUALIFIED_RULE")?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("col", &self.col)?;
        map.serialize_entry("prelude", &self.prelude)?;
        map.serialize_entry("declarations", &self.declarations)?;
        map.end()
    }
}

impl Serialize for AtRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "AT_RULE")?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("col", &self.col)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("prelude", &self.prelude)?;
        map.serialize_entry("block", &self.block)?;
        map.end()
    }
}

impl Serialize for AtRuleBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            AtRuleBlock::Rules(rules) => map.serialize_entry("rules", rules)?,
            AtRuleBlock::Declarations(declarations) => {
                map.serialize_entry("declarations", declarations)?
            }
            AtRuleBlock::Ignored(tokens) => map.serialize_entry("ignored", tokens)?,
        }
        map.end()
    }
}

impl Serialize for Declaration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "DECLARATION")?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("col", &self.col)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("important", &self.important)?;
        map.serialize_entry("value", &self.value)?;
        map.end()
    }
}
