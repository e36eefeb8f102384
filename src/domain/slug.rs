//! Deterministic, idempotent slug normalization.
//!
//! Display titles become lower-case identifiers that are safe for URLs and
//! for the cache key namespace: runs of punctuation collapse to a single
//! separator, apostrophes vanish outright, and the result never starts or
//! ends with a separator. Applying the transform to its own output is a
//! no-op, so slugs can be re-derived at any time without drift.

pub const DEFAULT_SEPARATOR: char = '-';

/// Characters whose maximal runs are replaced by a single separator.
const BREAK_SET: [char; 11] = ['.', '_', '\\', '/', '!', '?', '#', '$', '%', ',', ' '];

/// Normalize `input` using the default `-` separator.
pub fn slugify(input: &str) -> String {
    slugify_with(input, DEFAULT_SEPARATOR)
}

/// Normalize `input`, joining word runs with `separator`.
///
/// The separator itself is treated like the break characters, which is what
/// makes the transform idempotent: feeding a slug back in collapses and
/// trims any separators it already carries.
pub fn slugify_with(input: &str, separator: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending = false;

    for ch in input.chars() {
        if ch == '\'' {
            continue;
        }
        if ch == separator || BREAK_SET.contains(&ch) {
            // A separator is only owed once something precedes it, which
            // strips leading runs for free.
            pending = !out.is_empty();
            continue;
        }
        if pending {
            out.push(separator);
            pending = false;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
    }

    out
}
