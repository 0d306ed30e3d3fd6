//! Sanitization of feed-supplied HTML.
//!
//! Everything a feed hands us — article bodies, descriptions — is untrusted
//! markup that downstream consumers render as trusted HTML. This boundary
//! strips script-bearing and otherwise unsafe constructs; it is a security
//! contract, not a cosmetic cleanup, and normalization is allowed to alter
//! the markup (no byte-for-byte mirroring).

use ammonia::clean;

/// Sanitizes a feed-supplied HTML fragment for trusted rendering.
///
/// Uses ammonia's allowlist defaults: scripts, event handlers, `style`
/// blocks and `javascript:` URLs are removed; common formatting tags,
/// links and images survive.
pub fn clean_html(raw: &str) -> String {
    clean(raw)
}

/// Sanitizes an optional fragment, mapping empty results to `None` so a
/// description that was nothing but unsafe markup doesn't survive as an
/// empty string.
pub fn clean_optional(raw: Option<&str>) -> Option<String> {
    let cleaned = clean_html(raw?);
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
