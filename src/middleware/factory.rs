//! Middleware from plain "before" / "after" functions.

use std::future::Future;
use std::sync::Arc;

use super::{Middleware, Next};
use crate::context::{Context, Locals};
use crate::handler::BoxFuture;
use crate::response::Response;

type AfterHook = Arc<dyn Fn(&Context, &Response) + Send + Sync>;

/// Builds a middleware from a `before` function.
///
/// `before` runs first and returns the locals to add; they are merged over
/// the existing ones and the chain continues. An `after` hook attached with
/// [`FnMiddleware::after`] then sees the merged context and the response.
/// It observes only: it cannot change the response or stop the chain. For
/// either of those write a raw [`Middleware`].
///
/// ```rust
/// use waypost::middleware::create_middleware;
/// use waypost::{Context, Locals, Response, Router};
///
/// let timing = create_middleware(|_ctx: Context| async {
///     Locals::new().with("started", std::time::Instant::now())
/// })
/// .after(|ctx: &Context, res: &Response| {
///     if let Some(started) = ctx.local::<std::time::Instant>("started") {
///         tracing::info!(status = %res.status_code(), elapsed = ?started.elapsed(), "done");
///     }
/// });
///
/// let app = Router::new().with(timing);
/// ```
pub fn create_middleware<B, Fut>(before: B) -> FnMiddleware<B>
where
    B: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Locals> + Send + 'static,
{
    FnMiddleware { before, after: None }
}

/// Middleware built by [`create_middleware`].
pub struct FnMiddleware<B> {
    before: B,
    after: Option<AfterHook>,
}

impl<B> FnMiddleware<B> {
    /// Attaches the response observer, replacing any previous one.
    pub fn after<A>(mut self, after: A) -> Self
    where
        A: Fn(&Context, &Response) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(after));
        self
    }
}

impl<B, Fut> Middleware for FnMiddleware<B>
where
    B: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Locals> + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> BoxFuture {
        let before = (self.before)(ctx.clone());
        let after = self.after.clone();

        Box::pin(async move {
            let added = before.await;
            let merged = ctx.extend(&added);
            let response = next.run_with(added).await;
            if let Some(after) = after {
                after(&merged, &response);
            }
            response
        })
    }
}
