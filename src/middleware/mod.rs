//! Middleware.
//!
//! A middleware unit receives the current [`Context`] and a [`Next`]
//! continuation. It may:
//!
//! - call `next.run()` / `next.run_with(locals)` to hand over to the rest of
//!   the chain, adding locals that every later unit and the handler will see;
//! - await before and after that call, and inspect or replace the response
//!   that comes back;
//! - never call `next` at all and return its own response, in which case no
//!   later middleware and no handler runs.
//!
//! Any `async` closure `Fn(Context, Next) -> Response` is a middleware. For
//! the common "add locals, then observe the response" shape use
//! [`create_middleware`].
//!
//! ```rust
//! use http::StatusCode;
//! use waypost::middleware::Next;
//! use waypost::{Context, Locals, Response, Router};
//!
//! let app = Router::new()
//!     .with(|ctx: Context, next: Next| async move {
//!         match ctx.request().header("authorization") {
//!             Some(token) => {
//!                 let token = token.to_owned();
//!                 next.run_with(Locals::new().with("token", token)).await
//!             }
//!             None => Response::status(StatusCode::UNAUTHORIZED),
//!         }
//!     });
//! ```

mod chain;
mod factory;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::response::Response;

pub(crate) use chain::{Chain, Terminal};
pub use chain::Next;
pub use factory::{create_middleware, FnMiddleware};

/// One step of the dispatch chain.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, ctx: Context, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> BoxFuture {
        Box::pin((self)(ctx, next))
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// A frozen middleware list. Route entries own one of these.
pub(crate) type Stack = Arc<[BoxedMiddleware]>;

/// A router's live, growable middleware list.
///
/// Cloning shares the list; [`SharedStack::fork`] copies it.
#[derive(Clone, Default)]
pub(crate) struct SharedStack(Arc<RwLock<Vec<BoxedMiddleware>>>);

impl SharedStack {
    pub(crate) fn push(&self, middleware: BoxedMiddleware) {
        self.0.write().push(middleware);
    }

    /// The list as it is right now. Later pushes do not show up in it.
    pub(crate) fn snapshot(&self) -> Stack {
        Arc::from(self.0.read().as_slice())
    }

    /// An independent list starting with the current contents.
    pub(crate) fn fork(&self) -> SharedStack {
        SharedStack(Arc::new(RwLock::new(self.0.read().clone())))
    }

    pub(crate) fn len(&self) -> usize {
        self.0.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn passthrough(_ctx: Context, next: Next) -> Response {
        next.run().await
    }

    fn unit() -> BoxedMiddleware {
        Arc::new(passthrough)
    }

    #[test]
    fn snapshot_is_frozen() {
        let stack = SharedStack::default();
        stack.push(unit());
        let frozen = stack.snapshot();
        stack.push(unit());

        assert_eq!(frozen.len(), 1);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn clones_share_and_forks_diverge() {
        let stack = SharedStack::default();
        let shared = stack.clone();
        let forked = stack.fork();

        stack.push(unit());
        assert_eq!(shared.len(), 1);
        assert_eq!(forked.len(), 0);

        forked.push(unit());
        forked.push(unit());
        assert_eq!(stack.len(), 1);
    }
}
