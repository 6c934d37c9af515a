//! Demand-driven source over a work queue

use crate::queue::WorkQueue;
use tracing::debug;

/// Answer to one demand
#[derive(Debug, PartialEq, Eq)]
pub enum Demand<C> {
    /// Up to the requested number of items, in removal order
    Items(Vec<C>),
    /// The queue was empty when asked; no further items will be delivered
    EndOfStream,
}

/// Pull-based producer draining a [`WorkQueue`]
///
/// End-of-stream is terminal: once signalled the source never removes from
/// the queue again, even if items are requeued afterwards.
#[derive(Debug)]
pub struct DemandSource<C> {
    queue: WorkQueue<C>,
    terminated: bool,
    requests: Vec<usize>,
}

impl<C> DemandSource<C> {
    pub fn new(queue: WorkQueue<C>) -> Self {
        Self {
            queue,
            terminated: false,
            requests: Vec::new(),
        }
    }

    /// Request up to `n` items
    pub async fn on_demand(&mut self, n: usize) -> Demand<C> {
        self.requests.push(n);

        if self.terminated {
            return Demand::EndOfStream;
        }

        match self.queue.take(n).await {
            Some(items) => {
                debug!(requested = n, delivered = items.len(), "Demand served");
                Demand::Items(items)
            }
            None => {
                debug!(requested = n, "Queue empty, ending stream");
                self.terminated = true;
                Demand::EndOfStream
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Every demand issued so far, including the one that ended the stream
    pub fn requests(&self) -> &[usize] {
        &self.requests
    }
}
