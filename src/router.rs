//! Request router.
//!
//! Two tables back every router tree, shared by a root router and all the
//! sub-routers mounted under it:
//!
//! - the **route table**, one pattern table per method, mapping a pattern to a
//!   handler plus the middleware stack *as it was when the route was
//!   registered*;
//! - the **stack table**, mapping each router's base path (and everything
//!   below it) to that router's *live* middleware list, used when no route
//!   matches so the request still runs through the full stack before the
//!   `404`.
//!
//! Dispatch resolves against the route table, falls back to the stack table,
//! then runs the chosen stack with [`Next`](crate::middleware::Next).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::matcher::PatternTable;
use crate::method::Method;
use crate::middleware::{Chain, Middleware, SharedStack, Stack, Terminal};
use crate::path;
use crate::request::Request;
use crate::response::Response;

/// A registered route.
struct RouteEntry {
    stack: Stack,
    handler: BoxedHandler,
}

#[derive(Default)]
struct Tables {
    routes: HashMap<Method, PatternTable<Arc<RouteEntry>>>,
    stacks: PatternTable<SharedStack>,
}

/// The application router.
///
/// Build it once at startup, then call [`Router::handle`] for every request.
/// Each builder method returns `self` so registrations chain naturally.
///
/// ```rust
/// use waypost::middleware::Next;
/// use waypost::{Context, HandlerContext, Locals, Response, Router};
///
/// async fn tag(_ctx: Context, next: Next) -> Response {
///     next.run_with(Locals::new().with("tagged", true)).await
/// }
///
/// async fn show_user(ctx: HandlerContext) -> Response {
///     Response::text(ctx.param("id").unwrap_or_default().to_owned())
/// }
///
/// let app = Router::new()
///     .with(tag)
///     .get("/users/:id", show_user)
///     .route("/admin", |admin| admin.get("/stats", show_user));
/// ```
pub struct Router {
    base_path: String,
    middleware: SharedStack,
    tables: Arc<RwLock<Tables>>,
}

impl Router {
    pub fn new() -> Self {
        let router = Self {
            base_path: String::new(),
            middleware: SharedStack::default(),
            tables: Arc::default(),
        };
        router.register_stack();
        router
    }

    /// The prefix every path registered on this router is joined onto.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Appends a middleware to this router's stack.
    ///
    /// Routes registered from now on run it. Routes registered earlier, and
    /// sub-routers already mounted, do not.
    pub fn with(self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers a handler for a method + path pair.
    ///
    /// The path is joined onto the base path and normalised. Captures use
    /// `:name` (one segment) and a trailing `*` or `*name` (the rest of the
    /// path). Registering the same method and pattern twice keeps the last
    /// handler, and so does re-registering it with renamed captures
    /// (`/users/:id`, then `/users/{id}` or `/users/:name`).
    ///
    /// # Panics
    ///
    /// Panics if the pattern itself is malformed, for example a `*` that is
    /// not the last segment.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        let pattern = path::join(&self.base_path, path);
        let entry = RouteEntry {
            stack: self.middleware.snapshot(),
            handler: handler.into_boxed_handler(),
        };
        let depth = entry.stack.len();

        let mut tables = self.tables.write();
        let table = tables.routes.entry(method).or_default();
        if table.insert(&pattern, Arc::new(entry)).is_some() {
            warn!(%method, %pattern, "route registered twice, keeping the last handler");
        } else {
            debug!(%method, %pattern, middleware = depth, routes = table.len(), "route registered");
        }
        drop(tables);
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Head, path, handler)
    }

    pub fn connect(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Connect, path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Options, path, handler)
    }

    pub fn trace(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Trace, path, handler)
    }

    /// Mounts a sub-router at `base_path() + path`, normalised, and hands it
    /// to `configure`.
    ///
    /// The sub-router starts with a copy of this router's middleware list and
    /// registers into the same route table. From then on the two lists are
    /// independent: `with` on either side does not reach the other.
    ///
    /// ```rust
    /// # use waypost::{HandlerContext, Router};
    /// # async fn dashboard(_: HandlerContext) -> &'static str { "" }
    /// let app = Router::new().route("/admin", |admin| {
    ///     admin.get("/dashboard", dashboard)
    /// });
    /// ```
    pub fn route(self, path: &str, configure: impl FnOnce(Router) -> Router) -> Self {
        let sub = Router {
            base_path: path::join(&self.base_path, path),
            middleware: self.middleware.fork(),
            tables: Arc::clone(&self.tables),
        };
        debug!(base_path = %sub.base_path, middleware = sub.middleware.len(), "sub-router mounted");
        sub.register_stack();
        configure(sub);
        self
    }

    /// Points this router's base path, and everything below it, at its live
    /// middleware list.
    fn register_stack(&self) {
        let mut tables = self.tables.write();
        for pattern in [
            path::join(&self.base_path, ""),
            path::join(&self.base_path, "/*"),
        ] {
            debug!(%pattern, middleware = self.middleware.len(), "fallback stack registered");
            tables.stacks.insert(&pattern, self.middleware.clone());
        }
    }

    /// Routes one request and produces one response.
    ///
    /// Path normalisation means `/foo//bar/` reaches a route registered as
    /// `/foo/bar`. A request inside a router's namespace with no matching
    /// route still runs that router's middleware and then gets
    /// [`Response::not_found`].
    ///
    /// Panics raised by middleware or handlers are not caught.
    ///
    /// # Errors
    ///
    /// [`Error::MissingStack`] if not even a fallback stack matches, which
    /// points at corrupted routing tables rather than a bad request.
    pub async fn handle(&self, request: Request) -> Result<Response, Error> {
        let (chain, context) = self.resolve(request)?;
        Ok(chain.run(context).await)
    }

    fn resolve(&self, request: Request) -> Result<(Chain, Context), Error> {
        let path = path::normalize(request.path());
        let method = Method::try_from(request.method()).ok();
        let request = Arc::new(request);
        let tables = self.tables.read();

        let hit = method
            .and_then(|m| tables.routes.get(&m))
            .and_then(|table| table.find(&path));
        if let Some(found) = hit {
            debug!(method = %request.method(), %path, route = %found.pattern, "route matched");
            let entry = found.value;
            let chain = Chain::new(
                Arc::clone(&entry.stack),
                Terminal::Handler { handler: Arc::clone(&entry.handler), params: found.params },
            );
            return Ok((chain, Context::new(request, Some(Arc::clone(found.pattern)))));
        }

        match tables.stacks.find(&path) {
            Some(found) => {
                debug!(method = %request.method(), %path, stack = %found.pattern, "no route, using fallback stack");
                let chain = Chain::new(found.value.snapshot(), Terminal::NotFound);
                Ok((chain, Context::new(request, None)))
            }
            None => {
                error!(method = %request.method(), %path, "no fallback stack matched");
                Err(Error::MissingStack { path })
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
