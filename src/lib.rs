//! # waypost
//!
//! Request routing and middleware composition in front of an HTTP handler.
//!
//! waypost decides which handler serves a request, runs an ordered middleware
//! chain that builds up request-scoped [`Locals`], calls the handler (or
//! answers `404`), and lets the middleware see the response on the way out.
//! It does not own sockets: feed it requests from hyper or anything else that
//! speaks `http` types and send back what [`Response::into_http`] gives you.
//!
//! ## The rules
//!
//! - Paths are normalised on both sides: `/foo//bar/` is `/foo/bar`.
//! - Middleware runs in registration order. A unit that never calls its
//!   [`Next`](middleware::Next) ends the chain with its own response.
//! - A route keeps the middleware stack that existed when it was registered.
//!   Middleware added later does not reach it.
//! - [`Router::route`] mounts a sub-router that starts from a copy of the
//!   parent's stack and then evolves independently.
//! - A request inside a router's namespace that matches no route runs that
//!   router's full, final stack and then gets
//!   `404 {"message":"Not found"}`.
//!
//! ## Quick start
//!
//! ```rust
//! use waypost::middleware::create_middleware;
//! use waypost::{Context, HandlerContext, Locals, Request, Response, Router};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = Router::new()
//!     .with(create_middleware(|_ctx: Context| async {
//!         Locals::new().with("tenant", String::from("acme"))
//!     }))
//!     .get("/users/:id", get_user);
//!
//! let req: Request = http::Request::get("/users/42/").body("").unwrap().into();
//! let res = app.handle(req).await.unwrap();
//! assert_eq!(res.body(), b"acme:42");
//! # }
//!
//! async fn get_user(ctx: HandlerContext) -> Response {
//!     let tenant = ctx.local::<String>("tenant").map(String::as_str).unwrap_or("-");
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Response::text(format!("{tenant}:{id}"))
//! }
//! ```

mod context;
mod error;
mod handler;
mod matcher;
mod method;
mod request;
mod response;
mod router;

pub mod health;
pub mod middleware;
pub mod path;

pub use context::{Context, HandlerContext, Locals, Params};
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use method::Method;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
