use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use parking_lot::Mutex;
use waypost::middleware::{create_middleware, Next};
use waypost::{Context, HandlerContext, Locals, Request, Response, Router};

type Log = Arc<Mutex<Vec<String>>>;

fn get(path: &str) -> Request {
    http::Request::get(path).body("").unwrap().into()
}

fn body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

#[tokio::test]
async fn middleware_runs_in_registration_order_before_the_handler() {
    let log = Log::default();
    let step = |name: &'static str| {
        let log = Arc::clone(&log);
        move |_ctx: Context, next: Next| {
            log.lock().push(name.to_owned());
            next.run()
        }
    };
    let handler = {
        let log = Arc::clone(&log);
        move |_: HandlerContext| {
            log.lock().push("handler".to_owned());
            async { "done" }
        }
    };

    let app = Router::new()
        .with(step("one"))
        .with(step("two"))
        .with(step("three"))
        .get("/", handler);

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(body(&res), "done");
    assert_eq!(*log.lock(), ["one", "two", "three", "handler"]);
}

#[tokio::test]
async fn not_calling_next_short_circuits() {
    let log = Log::default();
    let later = {
        let log = Arc::clone(&log);
        move |_ctx: Context, next: Next| {
            log.lock().push("later".to_owned());
            next.run()
        }
    };
    let handler = {
        let log = Arc::clone(&log);
        move |_: HandlerContext| {
            log.lock().push("handler".to_owned());
            async { "done" }
        }
    };

    let app = Router::new()
        .with(|ctx: Context, next: Next| async move {
            if ctx.request().header("authorization").is_some() {
                next.run().await
            } else {
                Response::builder().status(StatusCode::UNAUTHORIZED).text("denied")
            }
        })
        .with(later)
        .get("/secret", handler);

    let res = app.handle(get("/secret")).await.unwrap();
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&res), "denied");
    assert!(log.lock().is_empty());

    let req = http::Request::get("/secret")
        .header("authorization", "Bearer t")
        .body("")
        .unwrap()
        .into();
    let res = app.handle(req).await.unwrap();
    assert_eq!(body(&res), "done");
    assert_eq!(*log.lock(), ["later", "handler"]);
}

#[tokio::test]
async fn short_circuit_also_applies_on_the_fallback_path() {
    let app = Router::new()
        .with(|_ctx: Context, _next: Next| async { Response::status(StatusCode::IM_A_TEAPOT) });

    let res = app.handle(get("/anything")).await.unwrap();
    assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn locals_accumulate_and_later_writes_win() {
    let seen_by_second = Arc::new(Mutex::new(None));
    let second = {
        let seen = Arc::clone(&seen_by_second);
        move |ctx: Context, next: Next| {
            *seen.lock() = ctx.local::<i32>("x").copied();
            next.run_with(Locals::new().with("y", 2_i32))
        }
    };

    let app = Router::new()
        .with(|_ctx: Context, next: Next| {
            next.run_with(Locals::new().with("x", 1_i32).with("y", 1_i32))
        })
        .with(second)
        .get("/", |ctx: HandlerContext| async move {
            let x = ctx.local::<i32>("x").copied().unwrap_or_default();
            let y = ctx.local::<i32>("y").copied().unwrap_or_default();
            Response::text(format!("x={x} y={y} n={}", ctx.locals().len()))
        });

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(body(&res), "x=1 y=2 n=2");
    assert_eq!(*seen_by_second.lock(), Some(1));
}

#[tokio::test]
async fn each_request_starts_with_empty_locals() {
    let app = Router::new()
        .with(|ctx: Context, next: Next| {
            let count = ctx.locals().len();
            next.run_with(Locals::new().with("count_at_entry", count))
        })
        .get("/", |ctx: HandlerContext| async move {
            Response::text(ctx.local::<usize>("count_at_entry").copied().unwrap_or(99).to_string())
        });

    for _ in 0..2 {
        let res = app.handle(get("/")).await.unwrap();
        assert_eq!(body(&res), "0");
    }
}

#[tokio::test]
async fn raw_middleware_can_replace_the_response() {
    let app = Router::new()
        .with(|_ctx: Context, next: Next| async move {
            let inner = next.run().await;
            Response::builder()
                .status(inner.status_code())
                .header("x-wrapped", "yes")
                .text(format!("[{}]", std::str::from_utf8(inner.body()).unwrap_or("")))
        })
        .get("/", |_: HandlerContext| async { "inner" });

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(body(&res), "[inner]");
    assert_eq!(res.header("x-wrapped"), Some("yes"));
}

#[tokio::test]
async fn middleware_may_suspend_before_and_after_next() {
    let app = Router::new()
        .with(|_ctx: Context, next: Next| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            let res = next.run_with(Locals::new().with("slept", true)).await;
            tokio::task::yield_now().await;
            res
        })
        .get("/", |ctx: HandlerContext| async move {
            tokio::task::yield_now().await;
            Response::text(ctx.local::<bool>("slept").copied().unwrap_or(false).to_string())
        });

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(body(&res), "true");
}

#[tokio::test]
async fn factory_before_adds_locals_for_everything_after_it() {
    let app = Router::new()
        .with(create_middleware(|ctx: Context| async move {
            let user = ctx.request().header("x-user").unwrap_or("anonymous").to_owned();
            Locals::new().with("user", user)
        }))
        .get("/me", |ctx: HandlerContext| async move {
            Response::text(ctx.local::<String>("user").cloned().unwrap_or_default())
        });

    let req = http::Request::get("/me").header("x-user", "alice").body("").unwrap().into();
    let res = app.handle(req).await.unwrap();
    assert_eq!(body(&res), "alice");

    let res = app.handle(get("/me")).await.unwrap();
    assert_eq!(body(&res), "anonymous");
}

#[tokio::test]
async fn factory_after_observes_merged_context_and_response() {
    let observed = Arc::new(Mutex::new(None));
    let hook = {
        let observed = Arc::clone(&observed);
        move |ctx: &Context, res: &Response| {
            *observed.lock() = Some((
                ctx.local::<&'static str>("tag").copied(),
                ctx.local::<&'static str>("inner").copied(),
                res.status_code(),
            ));
        }
    };

    let app = Router::new()
        .with(create_middleware(|_ctx: Context| async {
            Locals::new().with("tag", "outer")
        }).after(hook))
        .with(|_ctx: Context, next: Next| next.run_with(Locals::new().with("inner", "set")))
        .get("/", |_: HandlerContext| async { StatusCode::ACCEPTED });

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(res.status_code(), StatusCode::ACCEPTED);
    assert_eq!(*observed.lock(), Some((Some("outer"), None, StatusCode::ACCEPTED)));
}

#[tokio::test]
async fn after_hooks_unwind_in_reverse_order() {
    let log = Log::default();
    let layer = |name: &'static str| {
        let before_log = Arc::clone(&log);
        let after_log = Arc::clone(&log);
        create_middleware(move |_ctx: Context| {
            before_log.lock().push(format!("before {name}"));
            async { Locals::new() }
        })
        .after(move |_ctx: &Context, _res: &Response| {
            after_log.lock().push(format!("after {name}"));
        })
    };

    let app = Router::new()
        .with(layer("a"))
        .with(layer("b"))
        .get("/", |_: HandlerContext| async { "ok" });

    app.handle(get("/")).await.unwrap();
    assert_eq!(*log.lock(), ["before a", "before b", "after b", "after a"]);
}

#[tokio::test]
async fn factory_without_after_just_continues() {
    let app = Router::new()
        .with(create_middleware(|_ctx: Context| async { Locals::new() }))
        .get("/", |_: HandlerContext| async { "plain" });

    let res = app.handle(get("/")).await.unwrap();
    assert_eq!(body(&res), "plain");
}

#[tokio::test]
async fn after_hook_runs_for_fallback_404() {
    let status = Arc::new(Mutex::new(None));
    let hook = {
        let status = Arc::clone(&status);
        move |_ctx: &Context, res: &Response| *status.lock() = Some(res.status_code())
    };

    let app = Router::new()
        .with(create_middleware(|_ctx: Context| async { Locals::new() }).after(hook));

    app.handle(get("/missing")).await.unwrap();
    assert_eq!(*status.lock(), Some(StatusCode::NOT_FOUND));
}
