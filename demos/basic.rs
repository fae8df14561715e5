//! waypost behind a hyper server: request ids, an auth-gated admin section,
//! health checks.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/nope                       # 404 {"message":"Not found"}
//!   curl http://localhost:3000/admin/stats                # 401
//!   curl -H 'authorization: Bearer x' http://localhost:3000/admin/stats
//!   curl http://localhost:3000/healthz

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use waypost::middleware::{Next, create_middleware};
use waypost::{Context, HandlerContext, Locals, Request, Response, Router, health};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let next_id = Arc::new(AtomicU64::new(1));
    let app = Router::new()
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness)
        .with(create_middleware(move |_ctx: Context| {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            async move { Locals::new().with("request_id", id) }
        })
        .after(|ctx: &Context, res: &Response| {
            let id = ctx.local::<u64>("request_id").copied().unwrap_or_default();
            info!(
                request_id = id,
                method = %ctx.request().method(),
                route = ctx.matched_route().unwrap_or("-"),
                status = %res.status_code(),
                "request finished"
            );
        }))
        .get("/users/:id", get_user)
        .route("/admin", |admin| {
            admin
                .with(require_token)
                .get("/stats", admin_stats)
        });

    let addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
    if let Err(e) = serve(addr, app).await {
        error!("server error: {e}");
    }
}

async fn require_token(ctx: Context, next: Next) -> Response {
    match ctx.request().header("authorization") {
        Some(token) => {
            let token = token.trim_start_matches("Bearer ").to_owned();
            next.run_with(Locals::new().with("token", token)).await
        }
        None => Response::status(StatusCode::UNAUTHORIZED),
    }
}

async fn get_user(ctx: HandlerContext) -> Response {
    let id = ctx.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

async fn admin_stats(ctx: HandlerContext) -> Response {
    let id = ctx.local::<u64>("request_id").copied().unwrap_or_default();
    Response::json(format!(r#"{{"served_by_request":{id}}}"#))
}

// ── Serving layer ─────────────────────────────────────────────────────────────

async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let router = Arc::new(router);
    info!(%addr, "listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(&router, req).await }
                    });

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    info!("stopped");
    Ok(())
}

/// Buffers the body, hands the request to the router, converts the answer.
async fn dispatch(
    router: &Router,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
    };

    let response = match router.handle(Request::from_parts(parts, body)).await {
        Ok(res) => res,
        Err(e) => {
            error!("routing tables are broken: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(response.into_http())
}
