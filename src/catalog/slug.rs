// URL slug derivation for product names

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum slug length, in characters, before collision suffixes
pub const MAX_SLUG_LEN: usize = 50;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Derive the base slug for a product name
///
/// Lowercases, strips diacritics, collapses every run of characters outside
/// ASCII `a-z0-9` into a single hyphen and trims to [`MAX_SLUG_LEN`]
/// characters. Returns an empty string when nothing ASCII survives, as for a
/// name written only in a non-Latin script.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let hyphenated = NON_ALNUM.replace_all(&folded, "-");
    let trimmed: String = hyphenated
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_LEN)
        .collect();

    trimmed.trim_end_matches('-').to_string()
}

/// The `n`th collision candidate for a base slug: `base`, `base-1`, `base-2`, ...
pub fn candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}
