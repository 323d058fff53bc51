//! Restricted CSS profiles
//!
//! A profile says which at-rules are allowed and how their blocks parse,
//! and which property values, properties and annotations are forbidden.
//! Profiles are data: they are loaded from JSON rather than compiled in.
//!
//! ```json
//! {
//!   "at_rules": { "media": "rules", "font-face": "declarations", "import": "error" },
//!   "default_at_rule": "error",
//!   "disallowed_property_values": { "position": ["fixed", "sticky"] },
//!   "property_value_allowlists": { "transition": ["opacity", "transform"] },
//!   "at_rule_property_allowlists": { "keyframes": ["opacity", "transform"] },
//!   "qualified_properties": { "transition": ".amp-animate" },
//!   "allow_important": false,
//!   "image_url_spec": { "allowed_protocols": ["http", "https", "data"] },
//!   "font_url_spec": { "allowed_protocols": ["https"], "allow_relative": false },
//!   "media_query_spec": { "types": ["all", "screen"], "features": ["width"] }
//! }
//! ```
//!
//! Keys are compared against names that have been lowercased and stripped
//! of a vendor prefix, so they should be written in that form.

use std::fs;
use std::path::Path;

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CssError, CssResult};
use crate::parser::{BlockType, ParserConfig};
use crate::vendor::canonical_name;

/// Treatment of an at-rule under a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtRuleType {
    /// Allowed, block holds rules
    Rules,
    /// Allowed, block holds declarations
    Declarations,
    /// Allowed, block kept as raw tokens
    Ignore,
    /// Not allowed; the block is kept as raw tokens
    Error,
}

impl AtRuleType {
    pub fn block_type(self) -> BlockType {
        match self {
            AtRuleType::Rules => BlockType::ParseAsRules,
            AtRuleType::Declarations => BlockType::ParseAsDeclarations,
            AtRuleType::Ignore | AtRuleType::Error => BlockType::ParseAsIgnore,
        }
    }
}

/// Which URLs a stylesheet may reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlSpec {
    /// Lowercase protocol names without the colon
    pub allowed_protocols: Vec<String>,
    pub allow_relative: bool,
    pub allow_empty: bool,
    /// A host matches an entry when it is the entry or a subdomain of it
    pub disallowed_domains: Vec<String>,
}

impl Default for UrlSpec {
    fn default() -> Self {
        Self {
            allowed_protocols: vec!["http".to_string(), "https".to_string(), "data".to_string()],
            allow_relative: true,
            allow_empty: false,
            disallowed_domains: Vec::new(),
        }
    }
}

impl UrlSpec {
    pub fn is_allowed_protocol(&self, protocol: &str) -> bool {
        self.allowed_protocols.iter().any(|p| p == protocol)
    }

    pub fn is_disallowed_domain(&self, domain: &str) -> bool {
        // Only the first entry that is a suffix decides
        let Some(entry) = self
            .disallowed_domains
            .iter()
            .find(|entry| domain.ends_with(entry.as_str()))
        else {
            return false;
        };
        domain.len() == entry.len() || domain[..domain.len() - entry.len()].ends_with('.')
    }
}

/// Media types and features allowed in `@media` preludes
///
/// Entries are lowercase; features are compared without a vendor prefix or
/// a `min-`/`max-` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaQuerySpec {
    pub types: Vec<String>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CssProfile {
    pub at_rules: FxHashMap<String, AtRuleType>,
    /// Type of at-rules missing from `at_rules`
    pub default_at_rule: AtRuleType,
    /// Property → values its first identifier must not be
    pub disallowed_property_values: FxHashMap<String, Vec<String>>,
    /// Property → the only values its first identifier may be
    pub property_value_allowlists: FxHashMap<String, Vec<String>>,
    /// At-rule → the only properties allowed directly inside it
    pub at_rule_property_allowlists: FxHashMap<String, Vec<String>>,
    /// Property → class selector (e.g. `.amp-animate`) its rule must carry
    pub qualified_properties: FxHashMap<String, String>,
    pub allow_important: bool,
    /// Checks for URLs inside `@font-face`; unchecked when absent
    pub font_url_spec: Option<UrlSpec>,
    /// Checks for every other URL; unchecked when absent
    pub image_url_spec: Option<UrlSpec>,
    /// Checks for `@media` types and features; unchecked when absent
    pub media_query_spec: Option<MediaQuerySpec>,
}

impl Default for CssProfile {
    /// A profile that forbids nothing and parses blocks like
    /// [`ParserConfig::default`]
    fn default() -> Self {
        let parser = ParserConfig::default();
        let at_rules = parser
            .at_rules
            .iter()
            .map(|(name, block_type)| {
                let at_rule_type = match block_type {
                    BlockType::ParseAsRules => AtRuleType::Rules,
                    BlockType::ParseAsDeclarations => AtRuleType::Declarations,
                    BlockType::ParseAsIgnore => AtRuleType::Ignore,
                };
                (name.clone(), at_rule_type)
            })
            .collect();

        Self {
            at_rules,
            default_at_rule: AtRuleType::Ignore,
            disallowed_property_values: FxHashMap::default(),
            property_value_allowlists: FxHashMap::default(),
            at_rule_property_allowlists: FxHashMap::default(),
            qualified_properties: FxHashMap::default(),
            allow_important: true,
            font_url_spec: None,
            image_url_spec: None,
            media_query_spec: None,
        }
    }
}

impl CssProfile {
    /// Parse a profile from JSON text; missing fields take their defaults
    pub fn from_json_str(json: &str) -> CssResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> CssResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| CssError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_json_str(&data)?;
        debug!(
            "Loaded CSS profile from {} ({} at-rules)",
            path.display(),
            profile.at_rules.len()
        );
        Ok(profile)
    }

    /// Type of an at-rule as written in the source
    pub fn at_rule_type(&self, name: &str) -> AtRuleType {
        self.at_rules
            .get(&canonical_name(name))
            .copied()
            .unwrap_or(self.default_at_rule)
    }

    /// URL spec for a URL found in the given at-rule scope
    pub fn url_spec(&self, at_rule_scope: &str) -> Option<&UrlSpec> {
        if canonical_name(at_rule_scope) == "font-face" {
            self.font_url_spec.as_ref()
        } else {
            self.image_url_spec.as_ref()
        }
    }

    /// Parser config that shapes blocks the way this profile expects
    pub fn parser_config(&self) -> ParserConfig {
        let mut config = ParserConfig::new(self.default_at_rule.block_type());
        for (name, at_rule_type) in &self.at_rules {
            config.at_rules.insert(name.clone(), at_rule_type.block_type());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_allows_everything() {
        let profile = CssProfile::default();
        assert_eq!(profile.at_rule_type("media"), AtRuleType::Rules);
        assert_eq!(profile.at_rule_type("font-face"), AtRuleType::Declarations);
        assert_eq!(profile.at_rule_type("import"), AtRuleType::Ignore);
        assert!(profile.allow_important);
        assert_eq!(profile.parser_config(), ParserConfig::default());
    }

    #[test]
    fn test_from_json_str() {
        let profile = CssProfile::from_json_str(
            r#"{
                "at_rules": { "media": "rules", "import": "error" },
                "default_at_rule": "error",
                "disallowed_property_values": { "position": ["fixed"] },
                "allow_important": false
            }"#,
        )
        .unwrap();

        assert_eq!(profile.at_rule_type("-webkit-media"), AtRuleType::Rules);
        assert_eq!(profile.at_rule_type("IMPORT"), AtRuleType::Error);
        assert_eq!(profile.at_rule_type("page"), AtRuleType::Error);
        assert_eq!(profile.disallowed_property_values["position"], vec!["fixed"]);
        assert!(profile.property_value_allowlists.is_empty());
        assert!(!profile.allow_important);
    }

    #[test]
    fn test_parser_config_maps_error_to_ignore() {
        let profile =
            CssProfile::from_json_str(r#"{ "at_rules": { "import": "error", "page": "declarations" } }"#)
                .unwrap();
        let config = profile.parser_config();
        assert_eq!(config.block_type("import"), BlockType::ParseAsIgnore);
        assert_eq!(config.block_type("page"), BlockType::ParseAsDeclarations);
        assert_eq!(config.block_type("media"), BlockType::ParseAsIgnore);
    }

    #[test]
    fn test_url_specs() {
        let profile = CssProfile::from_json_str(
            r#"{
                "font_url_spec": { "allowed_protocols": ["https"], "allow_relative": false },
                "image_url_spec": {}
            }"#,
        )
        .unwrap();

        let font = profile.url_spec("font-face").unwrap();
        assert!(font.is_allowed_protocol("https"));
        assert!(!font.is_allowed_protocol("http"));
        assert!(!font.allow_relative);

        let image = profile.url_spec("").unwrap();
        assert_eq!(image, &UrlSpec::default());
        assert!(image.allow_relative);
        assert!(CssProfile::default().url_spec("media").is_none());
    }

    #[test]
    fn test_disallowed_domain_matches_subdomains_only() {
        let spec = UrlSpec {
            disallowed_domains: vec!["example.com".to_string()],
            ..UrlSpec::default()
        };
        assert!(spec.is_disallowed_domain("example.com"));
        assert!(spec.is_disallowed_domain("www.example.com"));
        assert!(!spec.is_disallowed_domain("someexample.com"));
        assert!(!spec.is_disallowed_domain("example.org"));
    }

    #[test]
    fn test_invalid_profile() {
        let err = CssProfile::from_json_str(r#"{ "default_at_rule": "sometimes" }"#).unwrap_err();
        assert!(matches!(err, CssError::InvalidProfile(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ampvalidator-profile-{}.json", std::process::id()));
        fs::write(&path, r#"{ "allow_important": false }"#).unwrap();
        let profile = CssProfile::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(!profile.allow_important);
        assert_eq!(profile.default_at_rule, AtRuleType::Ignore);
    }

    #[test]
    fn test_missing_file() {
        let err = CssProfile::from_file("/nonexistent/ampvalidator/profile.json").unwrap_err();
        match err {
            CssError::Io { path, .. } => {
                assert!(path.ends_with("profile.json"));
            }
            other => panic!("expected io error, got {}", other),
        }
    }
}
