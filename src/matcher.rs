//! Pattern table on top of `matchit`.
//!
//! `matchit` owns the radix trees and the per-tree match priorities. This
//! module adds what the router needs on top:
//!
//! - patterns are reported in the caller's syntax (`/users/:id`);
//! - two spellings of the same pattern (`/u/:id`, `/u/{id}`, `/u/:uid`) are
//!   one entry, and inserting it again replaces the payload;
//! - patterns `matchit` refuses to share a tree with, such as `/users/:id`
//!   next to `/users/*`, go into another tree. A lookup asks every tree and
//!   keeps the most specific hit.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::{InsertError, Router as MatchitRouter};

use crate::context::Params;
use crate::path;

/// A successful lookup.
pub(crate) struct Found<'a, V> {
    pub(crate) pattern: &'a Arc<str>,
    pub(crate) value: &'a V,
    pub(crate) params: Params,
}

/// Segment kinds, ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Static,
    Capture,
    CatchAll,
}

struct Entry<V> {
    /// Latest registration spelling.
    pattern: Arc<str>,
    /// Capture names of the latest spelling, in path order.
    names: Vec<String>,
    rank: Vec<Kind>,
    value: V,
}

/// Radix trees mapping normalised patterns to payloads.
pub(crate) struct PatternTable<V> {
    trees: Vec<MatchitRouter<Arc<str>>>,
    /// Keyed by pattern shape: matcher syntax with capture names erased.
    entries: HashMap<Arc<str>, Entry<V>>,
}

impl<V> PatternTable<V> {
    pub(crate) fn new() -> Self {
        Self { trees: Vec::new(), entries: HashMap::new() }
    }

    /// Stores `value` under a normalised `pattern`, returning the payload it
    /// replaced, if any.
    ///
    /// # Panics
    ///
    /// Panics if the matcher rejects the pattern itself, e.g. a catch-all
    /// that is not the last segment.
    pub(crate) fn insert(&mut self, pattern: &str, value: V) -> Option<V> {
        let syntax = path::to_matcher_syntax(pattern);
        let parsed = parse(&syntax);

        if let Some(entry) = self.entries.get_mut(&*parsed.shape) {
            entry.pattern = Arc::from(pattern);
            entry.names = parsed.names;
            return Some(std::mem::replace(&mut entry.value, value));
        }

        let shape: Arc<str> = Arc::from(parsed.shape);
        self.place(pattern, &syntax, &shape);
        self.entries.insert(shape, Entry {
            pattern: Arc::from(pattern),
            names: parsed.names,
            rank: parsed.rank,
            value,
        });
        None
    }

    /// Puts `syntax` into the first tree that accepts it, opening a new tree
    /// when all of them report a conflict.
    fn place(&mut self, pattern: &str, syntax: &str, shape: &Arc<str>) {
        for tree in &mut self.trees {
            match tree.insert(syntax, Arc::clone(shape)) {
                Ok(()) => return,
                Err(InsertError::Conflict { .. }) => continue,
                Err(e) => panic!("invalid route `{pattern}`: {e}"),
            }
        }

        let mut tree = MatchitRouter::new();
        tree.insert(syntax, Arc::clone(shape))
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self.trees.push(tree);
    }

    /// Finds the most specific match for a normalised concrete path.
    ///
    /// Segments compare left to right: a static segment beats a capture, and
    /// a capture beats a catch-all.
    pub(crate) fn find(&self, path: &str) -> Option<Found<'_, V>> {
        let (entry, matched) = self.trees.iter()
            .filter_map(|tree| {
                let matched = tree.at(path).ok()?;
                let entry = self.entries.get(&**matched.value)?;
                Some((entry, matched))
            })
            .min_by(|(a, _), (b, _)| a.rank.cmp(&b.rank))?;

        let params = entry.names.iter()
            .zip(matched.params.iter())
            .map(|(name, (_, v))| (name.clone(), v.to_owned()))
            .collect();
        Some(Found { pattern: &entry.pattern, value: &entry.value, params })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<V> Default for PatternTable<V> {
    fn default() -> Self { Self::new() }
}

struct Parsed {
    shape: String,
    names: Vec<String>,
    rank: Vec<Kind>,
}

/// Splits a pattern in matcher syntax into its shape, capture names and
/// per-segment specificity. `{{` and `}}` are literal braces.
fn parse(syntax: &str) -> Parsed {
    let mut parsed = Parsed { shape: String::with_capacity(syntax.len()), names: Vec::new(), rank: Vec::new() };

    for segment in syntax.split('/').filter(|s| !s.is_empty()) {
        parsed.shape.push('/');
        let mut kind = Kind::Static;
        let mut chars = segment.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' | '}' if chars.peek() == Some(&c) => {
                    chars.next();
                    parsed.shape.push(c);
                    parsed.shape.push(c);
                }
                '{' => {
                    let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                    match name.strip_prefix('*') {
                        Some(rest) => {
                            kind = Kind::CatchAll;
                            parsed.shape.push_str("{*}");
                            parsed.names.push(rest.to_owned());
                        }
                        None => {
                            kind = kind.max(Kind::Capture);
                            parsed.shape.push_str("{}");
                            parsed.names.push(name);
                        }
                    }
                }
                c => parsed.shape.push(c),
            }
        }
        parsed.rank.push(kind);
    }

    if parsed.shape.is_empty() {
        parsed.shape.push('/');
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_pattern_in_registration_syntax() {
        let mut table = PatternTable::new();
        table.insert("/users/:id", 1);

        let found = table.find("/users/42").unwrap();
        assert_eq!(&**found.pattern, "/users/:id");
        assert_eq!(*found.value, 1);
        assert_eq!(found.params.get("id"), Some("42"));
    }

    #[test]
    fn duplicate_pattern_replaces_payload() {
        let mut table = PatternTable::new();
        assert_eq!(table.insert("/x", "first"), None);
        assert_eq!(table.insert("/x", "second"), Some("first"));
        assert_eq!(table.len(), 1);
        assert_eq!(*table.find("/x").unwrap().value, "second");
    }

    #[test]
    fn brace_and_colon_spellings_are_one_pattern() {
        let mut table = PatternTable::new();
        assert_eq!(table.insert("/u/:id", "colon"), None);
        assert_eq!(table.insert("/u/{id}", "brace"), Some("colon"));
        assert_eq!(table.len(), 1);

        let found = table.find("/u/7").unwrap();
        assert_eq!(*found.value, "brace");
        assert_eq!(&**found.pattern, "/u/{id}");
        assert_eq!(found.params.get("id"), Some("7"));
    }

    #[test]
    fn renamed_capture_replaces_and_binds_the_new_name() {
        let mut table = PatternTable::new();
        table.insert("/users/:id", "id");
        assert_eq!(table.insert("/users/:name", "name"), Some("id"));

        let found = table.find("/users/alice").unwrap();
        assert_eq!(*found.value, "name");
        assert_eq!(&**found.pattern, "/users/:name");
        assert_eq!(found.params.get("name"), Some("alice"));
        assert_eq!(found.params.get("id"), None);
    }

    #[test]
    fn bare_wildcard_binds_under_default_name() {
        let mut table = PatternTable::new();
        table.insert("/files/*", ());

        let found = table.find("/files/a/b.txt").unwrap();
        assert_eq!(found.params.get(path::WILDCARD), Some("a/b.txt"));
    }

    #[test]
    fn static_segment_beats_catch_all() {
        let mut table = PatternTable::new();
        table.insert("/", "root");
        table.insert("/*", "root-any");
        table.insert("/admin", "admin");
        table.insert("/admin/*", "admin-any");

        assert_eq!(*table.find("/").unwrap().value, "root");
        assert_eq!(*table.find("/other").unwrap().value, "root-any");
        assert_eq!(*table.find("/admin").unwrap().value, "admin");
        assert_eq!(*table.find("/admin/users").unwrap().value, "admin-any");
    }

    #[test]
    fn capture_and_catch_all_share_a_position() {
        let mut table = PatternTable::new();
        table.insert("/users/:id", "one");
        table.insert("/users/*", "rest");

        let found = table.find("/users/5").unwrap();
        assert_eq!(*found.value, "one");
        assert_eq!(found.params.get("id"), Some("5"));

        let found = table.find("/users/5/x").unwrap();
        assert_eq!(*found.value, "rest");
        assert_eq!(found.params.get(path::WILDCARD), Some("5/x"));
    }

    #[test]
    fn deeper_capture_beats_shallower_catch_all() {
        let mut table = PatternTable::new();
        table.insert("/users/*", "users-any");
        table.insert("/users/:id/*", "user-any");
        table.insert("/users/:id", "user");

        assert_eq!(*table.find("/users/7").unwrap().value, "user");
        assert_eq!(*table.find("/users/7/posts").unwrap().value, "user-any");
        assert_eq!(table.find("/users/7/posts").unwrap().params.get("id"), Some("7"));
    }

    #[test]
    fn miss_returns_none() {
        let mut table = PatternTable::new();
        table.insert("/a", ());
        assert!(table.find("/b").is_none());
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn catch_all_before_the_end_panics() {
        let mut table = PatternTable::new();
        table.insert("/files/*rest/tail", ());
    }
}
