//! Identifier normalization

/// Remove a single leading vendor prefix (`-moz-`, `-webkit-`, ...)
///
/// A prefix is `-`, one or more lowercase ASCII letters, then `-`. The name
/// comes back unchanged when nothing would follow the prefix, or when what
/// follows starts with another `-`, so custom properties such as
/// `--custom-prop` are never touched and stripping twice is a no-op.
pub fn strip_vendor_prefix(name: &str) -> &str {
    let Some(rest) = name.strip_prefix('-') else {
        return name;
    };

    let letters = rest.bytes().take_while(u8::is_ascii_lowercase).count();
    if letters == 0 {
        return name;
    }

    match rest[letters..].strip_prefix('-') {
        Some(stripped) if !stripped.is_empty() && !stripped.starts_with('-') => stripped,
        _ => name,
    }
}

/// Lowercased, prefix-stripped form used to compare property and at-rule names
pub fn canonical_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    strip_vendor_prefix(&lower).to_string()
}

/// Remove a leading `min-` or `max-` from a media feature name
pub fn strip_min_max(name: &str) -> &str {
    name.strip_prefix("min-")
        .or_else(|| name.strip_prefix("max-"))
        .unwrap_or(name)
}
