//! AMP Validator CSS
//!
//! CSS Syntax Level 3 tokenizer and rule parser, plus the checks the
//! validator runs over parsed stylesheets: URL extraction and checking,
//! media query checking and restricted-profile (A4A) validation.
//!
//! Every stage reports problems by appending [`ErrorToken`]s to a caller
//! supplied list and keeps going, so one pass over the input collects all
//! errors.

mod ast;
mod error;
mod media;
mod parser;
mod profile;
mod serialize;
mod tokenizer;
mod urls;
mod validate;
mod vendor;

pub use ast::{AtRule, AtRuleBlock, Declaration, QualifiedRule, Rule, RuleVisitor, Stylesheet};
pub use error::{CssError, CssResult, ErrorCode, ErrorToken, SourceLocation};
pub use media::{parse_media_queries, validate_media_queries};
pub use parser::{
    extract_a_function, extract_a_simple_block, parse, parse_inline_style, parse_stylesheet,
    BlockType, CssParser, ParserConfig, TokenStream, MAX_NESTING_DEPTH,
};
pub use profile::{AtRuleType, CssProfile, MediaQuerySpec, UrlSpec};
pub use tokenizer::{
    tokenize, tokenize_with_errors, HashType, NumberKind, Numeric, Token, TokenKind, Tokenizer,
};
pub use urls::{extract_urls, validate_urls, ParsedCssUrl};
pub use validate::{validate_a4a_css, validate_stylesheet};
pub use vendor::{canonical_name, strip_min_max, strip_vendor_prefix};
