//! Path normalisation.
//!
//! Every path that enters the router, at registration time and at dispatch
//! time, goes through [`normalize`] first. That is what makes `/foo/`,
//! `//foo` and `/foo` land on the same route.

/// Name under which a bare `*` wildcard binds its capture.
pub const WILDCARD: &str = "wildcard";

/// Canonicalises a raw path.
///
/// Collapses runs of `/` into one, guarantees a single leading `/`, strips the
/// trailing `/`, and maps the empty result to `"/"`.
///
/// ```rust
/// use waypost::path::normalize;
///
/// assert_eq!(normalize("foo//bar/"), "/foo/bar");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Prefixes `path` with a router's base path. Plain concatenation, then
/// normalisation: `("/admin", "/users/")` gives `/admin/users`.
pub(crate) fn join(base: &str, path: &str) -> String {
    normalize(&format!("{base}{path}"))
}

/// Rewrites a normalised route pattern into `matchit` syntax.
///
/// `:name` becomes `{name}`, a trailing `*` becomes `{*wildcard}` and `*name`
/// becomes `{*name}`. Segments already written as `{name}` pass through.
/// Braces inside static segments are escaped.
pub(crate) fn to_matcher_syntax(pattern: &str) -> String {
    if pattern == "/" {
        return pattern.to_owned();
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        if segment.starts_with('{') && segment.ends_with('}') {
            out.push_str(segment);
        } else if let Some(name) = segment.strip_prefix(':') {
            out.push('{');
            out.push_str(name);
            out.push('}');
        } else if let Some(name) = segment.strip_prefix('*') {
            out.push_str("{*");
            out.push_str(if name.is_empty() { WILDCARD } else { name });
            out.push('}');
        } else {
            out.push_str(&segment.replace('{', "{{").replace('}', "}}"));
        }
    }
    out
}
