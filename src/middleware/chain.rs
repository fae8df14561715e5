//! The chain runner.
//!
//! A resolved request becomes a [`Chain`]: the stack to run and what to do
//! once it is exhausted. [`Next`] is the cursor into that stack. Calling it
//! runs the unit at the cursor with a context rebuilt around the new locals,
//! handing that unit a `Next` for the position after it. Recursion depth is
//! the stack length.

use std::sync::Arc;

use tracing::trace;

use super::Stack;
use crate::context::{Context, HandlerContext, Locals, Params};
use crate::handler::{BoxFuture, BoxedHandler};
use crate::response::Response;

/// What runs after the last middleware.
pub(crate) enum Terminal {
    /// A route matched.
    Handler { handler: BoxedHandler, params: Params },
    /// Only a router's fallback stack matched.
    NotFound,
}

pub(crate) struct Chain {
    stack: Stack,
    terminal: Terminal,
}

impl Chain {
    pub(crate) fn new(stack: Stack, terminal: Terminal) -> Self {
        Self { stack, terminal }
    }

    /// Runs the whole chain from the first unit, starting with `context`.
    pub(crate) fn run(self, context: Context) -> BoxFuture {
        Next { chain: Arc::new(self), cursor: 0, context }.run()
    }

    fn terminate(&self, context: Context) -> BoxFuture {
        match &self.terminal {
            Terminal::Handler { handler, params } => {
                trace!("invoking route handler");
                handler.call(HandlerContext::new(context, params.clone()))
            }
            Terminal::NotFound => {
                trace!("no route handler, responding 404");
                Box::pin(async { Response::not_found() })
            }
        }
    }
}

/// The continuation handed to each middleware.
///
/// Consumed on use, so the rest of the chain runs at most once per unit.
/// Dropping it without calling it short-circuits the chain.
pub struct Next {
    chain: Arc<Chain>,
    cursor: usize,
    context: Context,
}

impl Next {
    /// Continues without adding locals.
    pub fn run(self) -> BoxFuture {
        self.run_with(Locals::new())
    }

    /// Continues with `locals` merged over the current ones. Keys in `locals`
    /// win.
    pub fn run_with(self, locals: Locals) -> BoxFuture {
        let Next { chain, cursor, context } = self;
        let context = context.extend(&locals);

        match chain.stack.get(cursor) {
            Some(middleware) => {
                trace!(cursor, depth = chain.stack.len(), "entering middleware");
                let middleware = Arc::clone(middleware);
                let next = Next { chain, cursor: cursor + 1, context: context.clone() };
                middleware.call(context, next)
            }
            None => chain.terminate(context),
        }
    }
}
