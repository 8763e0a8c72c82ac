//! Middleware trait and sequential chain runner.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::pipeline::exchange::Exchange;
use crate::pipeline::signal::Signal;

/// One stage of the processing chain.
///
/// A stage inspects or transforms the exchange and returns exactly one
/// [`Signal`]. It must not keep using the exchange after returning.
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Signal>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered list of middleware run for every exchange.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Append a shared stage.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.stages.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the stages in order.
    ///
    /// Dispatch stops at the first signal other than `Proceed`, or once a
    /// stage has written a response. That signal is returned; `Proceed`
    /// means every stage let the exchange through.
    pub async fn run(&self, exchange: &mut Exchange) -> Signal {
        for stage in &self.stages {
            match stage.handle(exchange).await {
                Signal::Proceed if exchange.is_responded() => {
                    tracing::trace!(stage = stage.name(), "Stage responded");
                    return Signal::Proceed;
                }
                Signal::Proceed => {}
                signal => {
                    tracing::debug!(stage = stage.name(), signal = ?signal, "Chain stopped");
                    return signal;
                }
            }
        }
        Signal::Proceed
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.name()))
            .finish()
    }
}
