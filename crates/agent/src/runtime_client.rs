use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};

use crate::error::Error;
use crate::runtime::{AgentRuntime, RunNode, RunRequest};

pub(crate) type RunStream =
    Pin<Box<dyn Stream<Item = Result<RunNode, Error>> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(RunRequest) -> RunStream + Send + Sync
>;

/// A type-erased handle to an agent runtime.
#[derive(Clone)]
pub(crate) struct RuntimeClient {
    handler_fn: HandlerFn,
}

impl RuntimeClient {
    #[inline]
    pub fn new<R: AgentRuntime + 'static>(runtime: R) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req| {
            trace!(
                "starting a run with {} history messages and {} tools",
                req.history.len(),
                req.toolset.len()
            );
            runtime.run(req).boxed()
        });
        Self { handler_fn }
    }

    /// Starts a run.
    #[inline]
    pub fn run(&self, req: RunRequest) -> RunStream {
        (self.handler_fn)(req)
    }
}
