//! Concurrency policy for per-item work.
//!
//! Every fan-out point in the engine (UTXOs of a page, requested inputs,
//! nodes of a frontier) goes through [`Concurrency::run`]. Outputs are
//! returned in input order and errors are ordinary values, so both policies
//! leave storage in the same state; only latency and log order differ.

use std::future::Future;

use futures::future::join_all;

/// How independent items are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// All items launched together and awaited as a barrier.
    #[default]
    Parallel,
    /// One item at a time, in order.
    Sequential,
}

impl Concurrency {
    /// Run `f` over every item and collect all outputs.
    ///
    /// Every item settles before this returns, whatever the policy.
    pub async fn run<I, F, Fut>(self, items: I, mut f: F) -> Vec<Fut::Output>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
    {
        match self {
            Concurrency::Sequential => {
                let mut outputs = Vec::new();
                for item in items {
                    outputs.push(f(item).await);
                }
                outputs
            }
            Concurrency::Parallel => join_all(items.into_iter().map(f)).await,
        }
    }
}
