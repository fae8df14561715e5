//! Ready-made health-check handlers.
//!
//! | Probe | Typical path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can it serve traffic? |
//!
//! ```rust
//! use waypost::{Router, health};
//!
//! let app = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Health routes go through whatever middleware was registered before them.
//! Register them first to keep probes out of auth or logging middleware.

use crate::{HandlerContext, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_ctx: HandlerContext) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it with your own handler when
/// readiness depends on downstream services.
pub async fn readiness(_ctx: HandlerContext) -> Response {
    Response::text("ready")
}
