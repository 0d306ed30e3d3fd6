use std::collections::HashSet;

use deunicode::deunicode_char;

/// Maximum slug length in bytes. Slugs are ASCII by construction, so this
/// is also a character bound. Collision suffixes may push a slug slightly
/// past it; lookups compare full strings either way.
const SLUG_MAX_LEN: usize = 80;

/// Derives a URL-safe slug from an arbitrary title.
///
/// The derivation is deterministic and idempotent:
/// - transliterate to ASCII (diacritics stripped, non-Latin scripts
///   romanized)
/// - lowercase
/// - collapse every run of non-alphanumeric characters into a single `-`
/// - trim separators from both ends
/// - truncate to [`SLUG_MAX_LEN`] and re-trim
///
/// Returns an empty string when the input contains no representable
/// characters (e.g. a title that is all punctuation); callers are expected
/// to fall back to another identifier source in that case.
///
/// # Examples
///
/// ```
/// use feedgate::util::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
/// assert_eq!(slugify("  --spaced--  "), "spaced");
/// ```
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;

    for ch in input.chars() {
        // Unmappable characters act as separators rather than vanishing,
        // so "a\u{fffd}b" and "a b" slugify the same way.
        let Some(mapped) = deunicode_char(ch) else {
            pending_sep = true;
            continue;
        };

        for m in mapped.chars() {
            let m = m.to_ascii_lowercase();
            if m.is_ascii_alphanumeric() {
                if pending_sep && !slug.is_empty() {
                    slug.push('-');
                }
                pending_sep = false;
                slug.push(m);
            } else {
                pending_sep = true;
            }
        }
    }

    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

/// Tracks slugs claimed during a single parse pass and resolves collisions
/// by suffixing `-2`, `-3`, … — two entries titled "x" become `x` and `x-2`.
///
/// Dedup state is scoped to one feed snapshot; a fresh parse starts clean,
/// which keeps the derivation deterministic for an unchanged document.
#[derive(Debug, Default)]
pub struct SlugDeduper {
    claimed: HashSet<String>,
}

impl SlugDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `base` (or the first free suffixed variant) and returns it.
    pub fn claim(&mut self, base: &str) -> String {
        if self.claimed.insert(base.to_string()) {
            return base.to_string();
        }

        let mut n = 2u32;
        loop {
            let candidate = format!("{base}-{n}");
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
