//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! Route entries for every method live in one table, so handlers of
//! *different* concrete types have to be stored uniformly. Each one is wrapped
//! in [`FnHandler`] and kept as a trait object:
//!
//! ```text
//! async fn show(ctx: HandlerContext) -> Response { … }   ← user writes this
//!        ↓ router.get("/users/:id", show)
//! show.into_boxed_handler()                              ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                              ← stored in the RouteEntry
//!        ↓
//! handler.call(ctx) once the middleware chain is exhausted
//!        ↓
//! Box::pin(async { show(ctx).await.into_response() })    ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::HandlerContext;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// Every middleware step and every handler produces one. `Send + 'static` lets
/// a multi-threaded runtime move the request between worker threads at any
/// suspension point.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: HandlerContext) -> BoxFuture;
}

/// A type-erased handler shared by every request that matches its route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied for any `async fn` with
/// the signature:
///
/// ```text
/// async fn name(ctx: HandlerContext) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** via the private `Sealed` supertrait.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: HandlerContext) -> BoxFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_response() })
    }
}
