//! Request-scoped context threaded through the middleware chain.
//!
//! A [`Context`] is never mutated. Each middleware step that contributes
//! [`Locals`] gets a fresh `Context` built from the previous one, so a value
//! captured by a middleware before it awaits is still exactly what it saw.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::Request;

type Value = Arc<dyn Any + Send + Sync>;

// ── Locals ────────────────────────────────────────────────────────────────────

/// String-keyed, type-erased values accumulated by middleware.
///
/// Copy-on-write: cloning is one `Arc` increment, and the map is only copied
/// when a clone that shares it is extended. There is no removal, so along a
/// chain the set of keys only grows.
///
/// ```rust
/// use waypost::Locals;
///
/// let locals = Locals::new().with("user_id", 42_u64);
/// assert_eq!(locals.get::<u64>("user_id"), Some(&42));
/// assert_eq!(locals.get::<String>("user_id"), None);
/// ```
#[derive(Clone, Default)]
pub struct Locals {
    entries: Arc<HashMap<String, Value>>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` under `key`, replacing any previous value. Returns `self`
    /// for chaining.
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        Arc::make_mut(&mut self.entries).insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| (**v).downcast_ref::<T>())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shallow merge. Keys in `newer` win over keys in `self`.
    pub fn merge(&self, newer: &Locals) -> Locals {
        if newer.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return newer.clone();
        }
        let mut entries = HashMap::clone(&self.entries);
        entries.extend(newer.entries.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        Locals { entries: Arc::new(entries) }
    }
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Path-segment bindings extracted by the matcher, e.g. `id` for
/// `/users/:id`. Only handlers see them.
#[derive(Clone, Debug, Default)]
pub struct Params(Arc<HashMap<String, String>>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// What every middleware receives.
#[derive(Clone)]
pub struct Context {
    request: Arc<Request>,
    matched_route: Option<Arc<str>>,
    locals: Locals,
}

impl Context {
    pub(crate) fn new(request: Arc<Request>, matched_route: Option<Arc<str>>) -> Self {
        Self { request, matched_route, locals: Locals::new() }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The registered pattern (e.g. `/users/:id`) of the route being served.
    /// `None` when the request fell through to a router's fallback stack.
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Shortcut for `self.locals().get(key)`.
    pub fn local<T: Any>(&self, key: &str) -> Option<&T> {
        self.locals.get(key)
    }

    /// A new context whose locals are `self`'s merged with `locals`.
    pub(crate) fn extend(&self, locals: &Locals) -> Context {
        Context {
            request: Arc::clone(&self.request),
            matched_route: self.matched_route.clone(),
            locals: self.locals.merge(locals),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("matched_route", &self.matched_route)
            .field("locals", &self.locals)
            .finish()
    }
}

// ── HandlerContext ────────────────────────────────────────────────────────────

/// What a route handler receives: the final [`Context`] plus path params.
#[derive(Clone, Debug)]
pub struct HandlerContext {
    context: Context,
    params: Params,
}

impl HandlerContext {
    pub(crate) fn new(context: Context, params: Params) -> Self {
        Self { context, params }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn request(&self) -> &Request {
        self.context.request()
    }

    pub fn matched_route(&self) -> Option<&str> {
        self.context.matched_route()
    }

    pub fn locals(&self) -> &Locals {
        self.context.locals()
    }

    pub fn local<T: Any>(&self, key: &str) -> Option<&T> {
        self.context.local(key)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}
