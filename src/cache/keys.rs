//! Composite cache keys.
//!
//! Keys are human-debuggable: `book:<slug>:<id>`, `author:<slug>:<id>`,
//! `page:<id>`. The slug half never contains `:` (guaranteed by the slug
//! alphabet) and the id half is the canonical UUID form, so either half can
//! be replaced with `*` and resolved by a pattern scan. The wire format is
//! stable; existing deployments pattern-match on it.

use uuid::Uuid;

use super::CacheError;

pub const BOOK_PREFIX: &str = "book";
pub const AUTHOR_PREFIX: &str = "author";
pub const PAGE_PREFIX: &str = "page";

pub fn book_key(slug: &str, id: Uuid) -> String {
    format!("{BOOK_PREFIX}:{slug}:{id}")
}

pub fn book_pattern_by_id(id: Uuid) -> String {
    format!("{BOOK_PREFIX}:*:{id}")
}

pub fn book_pattern_by_slug(slug: &str) -> String {
    format!("{BOOK_PREFIX}:{slug}:*")
}

pub fn author_key(slug: &str, id: Uuid) -> String {
    format!("{AUTHOR_PREFIX}:{slug}:{id}")
}

pub fn author_pattern_by_id(id: Uuid) -> String {
    format!("{AUTHOR_PREFIX}:*:{id}")
}

pub fn author_pattern_by_slug(slug: &str) -> String {
    format!("{AUTHOR_PREFIX}:{slug}:*")
}

/// Pages are flat: nothing looks them up by a secondary human key.
pub fn page_key(id: Uuid) -> String {
    format!("{PAGE_PREFIX}:{id}")
}

pub fn page_pattern_all() -> String {
    format!("{PAGE_PREFIX}:*")
}

/// Collapse a scan result to the single key the pattern must identify.
///
/// An ambiguous match means duplicate or stale entries; the caller gets a
/// hard error rather than an arbitrary winner.
pub(crate) fn resolve_single(mut matches: Vec<String>, pattern: &str) -> Result<String, CacheError> {
    match matches.len() {
        0 => Err(CacheError::Miss),
        1 => Ok(matches.remove(0)),
        count => Err(CacheError::Ambiguous {
            pattern: pattern.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Uuid {
        Uuid::parse_str("6f2b40ae-9f80-4b33-8ba9-64b01e2a5b10").expect("literal uuid")
    }

    #[test]
    fn book_key_wire_format() {
        assert_eq!(
            book_key("the-call-of-cthulhu", id()),
            "book:the-call-of-cthulhu:6f2b40ae-9f80-4b33-8ba9-64b01e2a5b10"
        );
    }

    #[test]
    fn wildcard_patterns_keep_the_known_half() {
        assert_eq!(
            book_pattern_by_id(id()),
            "book:*:6f2b40ae-9f80-4b33-8ba9-64b01e2a5b10"
        );
        assert_eq!(book_pattern_by_slug("dagon"), "book:dagon:*");
        assert_eq!(
            author_pattern_by_id(id()),
            "author:*:6f2b40ae-9f80-4b33-8ba9-64b01e2a5b10"
        );
        assert_eq!(author_pattern_by_slug("h-p-lovecraft"), "author:h-p-lovecraft:*");
    }

    #[test]
    fn page_keys_are_flat() {
        assert_eq!(
            page_key(id()),
            "page:6f2b40ae-9f80-4b33-8ba9-64b01e2a5b10"
        );
        assert_eq!(page_pattern_all(), "page:*");
    }

    #[test]
    fn resolve_single_empty_is_a_miss() {
        assert!(matches!(
            resolve_single(Vec::new(), "book:*:x"),
            Err(CacheError::Miss)
        ));
    }

    #[test]
    fn resolve_single_returns_the_only_match() {
        let key = resolve_single(vec!["book:dagon:abc".to_string()], "book:*:abc")
            .expect("single match resolves");
        assert_eq!(key, "book:dagon:abc");
    }

    #[test]
    fn resolve_single_rejects_ambiguity() {
        let matches = vec![
            "book:dagon:abc".to_string(),
            "book:dagon-2:abc".to_string(),
        ];
        match resolve_single(matches, "book:*:abc") {
            Err(CacheError::Ambiguous { pattern, count }) => {
                assert_eq!(pattern, "book:*:abc");
                assert_eq!(count, 2);
            }
            other => panic!("expected ambiguity error, got {other:?}"),
        }
    }
}
