//! Error types
//!
//! Malformed CSS is ordinary input, so problems found in a stylesheet are
//! reported as [`ErrorToken`] values appended to a caller-owned list. The
//! [`CssError`] enum is reserved for failures outside the CSS text itself,
//! such as an unreadable or malformed validation profile.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type for operations that can fail outside of CSS input handling
pub type CssResult<T> = Result<T, CssError>;

/// Source location in CSS
///
/// Lines are 1-indexed, columns are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub col: usize,
}

impl SourceLocation {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self { line: 1, col: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Failures that are not findings about the stylesheet
#[derive(Debug, Error)]
pub enum CssError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile: {0}")]
    InvalidProfile(#[from] serde_json::Error),
}

/// Kind of problem reported by the tokenizer, the parser or a validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    CssSyntaxStrayTrailingBackslash,
    CssSyntaxUnterminatedComment,
    CssSyntaxUnterminatedString,
    CssSyntaxBadUrl,
    CssSyntaxEofInPreludeOfQualifiedRule,
    CssSyntaxInvalidDeclaration,
    CssSyntaxIncompleteDeclaration,
    CssSyntaxInvalidAtRule,
    CssExcessivelyNested,
    CssSyntaxMalformedMediaQuery,
    CssSyntaxDisallowedPropertyValue,
    CssSyntaxDisallowedPropertyValueWithHint,
    CssSyntaxPropertyDisallowedWithinAtRule,
    CssSyntaxPropertyRequiresQualification,
    CssSyntaxDisallowedImportant,
    CssSyntaxMissingUrl,
    CssSyntaxInvalidUrl,
    CssSyntaxInvalidUrlProtocol,
    CssSyntaxDisallowedRelativeUrl,
    CssSyntaxDisallowedDomain,
    CssSyntaxDisallowedMediaType,
    CssSyntaxDisallowedMediaFeature,
}

impl ErrorCode {
    /// Identifier used in reports and JSON output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CssSyntaxStrayTrailingBackslash => "CSS_SYNTAX_STRAY_TRAILING_BACKSLASH",
            Self::CssSyntaxUnterminatedComment => "CSS_SYNTAX_UNTERMINATED_COMMENT",
            Self::CssSyntaxUnterminatedString => "CSS_SYNTAX_UNTERMINATED_STRING",
            Self::CssSyntaxBadUrl => "CSS_SYNTAX_BAD_URL",
            Self::CssSyntaxEofInPreludeOfQualifiedRule => {
                "CSS_SYNTAX_EOF_IN_PRELUDE_OF_QUALIFIED_RULE"
            }
            Self::CssSyntaxInvalidDeclaration => "CSS_SYNTAX_INVALID_DECLARATION",
            Self::CssSyntaxIncompleteDeclaration => "CSS_SYNTAX_INCOMPLETE_DECLARATION",
            Self::CssSyntaxInvalidAtRule => "CSS_SYNTAX_INVALID_AT_RULE",
            Self::CssExcessivelyNested => "CSS_EXCESSIVELY_NESTED",
            Self::CssSyntaxMalformedMediaQuery => "CSS_SYNTAX_MALFORMED_MEDIA_QUERY",
            Self::CssSyntaxDisallowedPropertyValue => "CSS_SYNTAX_DISALLOWED_PROPERTY_VALUE",
            Self::CssSyntaxDisallowedPropertyValueWithHint => {
                "CSS_SYNTAX_DISALLOWED_PROPERTY_VALUE_WITH_HINT"
            }
            Self::CssSyntaxPropertyDisallowedWithinAtRule => {
                "CSS_SYNTAX_PROPERTY_DISALLOWED_WITHIN_AT_RULE"
            }
            Self::CssSyntaxPropertyRequiresQualification => {
                "CSS_SYNTAX_PROPERTY_REQUIRES_QUALIFICATION"
            }
            Self::CssSyntaxDisallowedImportant => "CSS_SYNTAX_DISALLOWED_IMPORTANT",
            Self::CssSyntaxMissingUrl => "CSS_SYNTAX_MISSING_URL",
            Self::CssSyntaxInvalidUrl => "CSS_SYNTAX_INVALID_URL",
            Self::CssSyntaxInvalidUrlProtocol => "CSS_SYNTAX_INVALID_URL_PROTOCOL",
            Self::CssSyntaxDisallowedRelativeUrl => "CSS_SYNTAX_DISALLOWED_RELATIVE_URL",
            Self::CssSyntaxDisallowedDomain => "CSS_SYNTAX_DISALLOWED_DOMAIN",
            Self::CssSyntaxDisallowedMediaType => "CSS_SYNTAX_DISALLOWED_MEDIA_TYPE",
            Self::CssSyntaxDisallowedMediaFeature => "CSS_SYNTAX_DISALLOWED_MEDIA_FEATURE",
        }
    }

    /// Message template; `%1`, `%2`, ... are replaced by the error params
    fn template(self) -> &'static str {
        match self {
            Self::CssSyntaxStrayTrailingBackslash => {
                "CSS syntax error in tag '%1' - stray trailing backslash."
            }
            Self::CssSyntaxUnterminatedComment => {
                "CSS syntax error in tag '%1' - unterminated comment."
            }
            Self::CssSyntaxUnterminatedString => {
                "CSS syntax error in tag '%1' - unterminated string."
            }
            Self::CssSyntaxBadUrl => "CSS syntax error in tag '%1' - bad url.",
            Self::CssSyntaxEofInPreludeOfQualifiedRule => {
                "CSS syntax error in tag '%1' - end of stylesheet encountered in prelude of a qualified rule."
            }
            Self::CssSyntaxInvalidDeclaration => {
                "CSS syntax error in tag '%1' - invalid declaration."
            }
            Self::CssSyntaxIncompleteDeclaration => {
                "CSS syntax error in tag '%1' - incomplete declaration."
            }
            Self::CssSyntaxInvalidAtRule => {
                "CSS syntax error in tag '%1' - saw invalid at rule '@%2'."
            }
            Self::CssExcessivelyNested => "CSS excessively nested in tag '%1'.",
            Self::CssSyntaxMalformedMediaQuery => {
                "CSS syntax error in tag '%1' - malformed media query."
            }
            Self::CssSyntaxDisallowedPropertyValue => {
                "CSS syntax error in tag '%1' - the property '%2' is set to the disallowed value '%3'."
            }
            Self::CssSyntaxDisallowedPropertyValueWithHint => {
                "CSS syntax error in tag '%1' - the property '%2' is set to the disallowed value '%3'. Allowed values: %4."
            }
            Self::CssSyntaxPropertyDisallowedWithinAtRule => {
                "CSS syntax error in tag '%1' - the property '%2' is disallowed within @%3. Allowed properties: %4."
            }
            Self::CssSyntaxPropertyRequiresQualification => {
                "CSS syntax error in tag '%1' - the property '%2' is disallowed unless the enclosing rule is prefixed with the '%3' qualification."
            }
            Self::CssSyntaxDisallowedImportant => {
                "CSS syntax error in tag '%1' - the property '%2' is set with the disallowed '!important' annotation."
            }
            Self::CssSyntaxMissingUrl => "CSS syntax error in tag '%1' - missing url.",
            Self::CssSyntaxInvalidUrl => "CSS syntax error in tag '%1' - invalid url '%2'.",
            Self::CssSyntaxInvalidUrlProtocol => {
                "CSS syntax error in tag '%1' - invalid url protocol '%2:'."
            }
            Self::CssSyntaxDisallowedRelativeUrl => {
                "CSS syntax error in tag '%1' - disallowed relative url '%2'."
            }
            Self::CssSyntaxDisallowedDomain => {
                "CSS syntax error in tag '%1' - disallowed domain '%2'."
            }
            Self::CssSyntaxDisallowedMediaType => {
                "CSS syntax error in tag '%1' - the media type '%2' is disallowed."
            }
            Self::CssSyntaxDisallowedMediaFeature => {
                "CSS syntax error in tag '%1' - the media feature '%2' is disallowed."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding about a stylesheet
///
/// `params[0]` names the context the CSS came from. It is always `"style"`
/// here; an HTML-level caller replaces it with the owning tag's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorToken {
    pub code: ErrorCode,
    pub line: usize,
    pub col: usize,
    pub params: Vec<String>,
}

impl ErrorToken {
    pub fn new(code: ErrorCode, location: SourceLocation, params: Vec<String>) -> Self {
        Self {
            code,
            line: location.line,
            col: location.col,
            params,
        }
    }

    /// Error with the default `["style"]` parameter list
    pub fn style(code: ErrorCode, location: SourceLocation) -> Self {
        Self::new(code, location, vec!["style".to_string()])
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col)
    }

    /// Render the human-readable message for this error
    pub fn message(&self) -> String {
        let template = self.code.template();
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            match digits.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    out.push_str(self.params.get(n - 1).map(String::as_str).unwrap_or(""));
                }
                _ => {
                    out.push('%');
                    out.push_str(&digits);
                }
            }
        }

        out
    }
}

impl fmt::Display for ErrorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message())
    }
}
