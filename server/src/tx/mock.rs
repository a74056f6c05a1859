//! Transaction managers for tests and for code paths that do not need a
//! real transaction.

use std::any::Any;
use std::future::Future;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::{TransactionManager, TxContext};
use crate::error::{Error, Result};

/// Context handed out by [`MockTransactionManager`].
///
/// The sequence number distinguishes the contexts of successive calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockTxContext {
    pub seq: u64,
}

impl TxContext for MockTxContext {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Default)]
struct Recorded {
    calls: usize,
    last_tx: Option<MockTxContext>,
}

type FailureFn = Box<dyn Fn() -> Error + Send + Sync>;

enum Failure {
    /// Fail before the unit of work runs, like a refused begin
    BeforeWork(FailureFn),
    /// Run the unit of work, then fail if it succeeded, like a refused commit
    AfterWork(FailureFn),
}

/// Records calls and runs the unit of work with a [`MockTxContext`].
///
/// A configured failure either replaces the unit of work entirely
/// ([`failing`](Self::failing)) or replaces its successful result
/// ([`failing_after_work`](Self::failing_after_work)). An error returned by
/// the unit of work itself always wins.
#[derive(Default)]
pub struct MockTransactionManager {
    failure: Option<Failure>,
    recorded: Mutex<Recorded>,
}

impl MockTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<F>(failure: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        Self {
            failure: Some(Failure::BeforeWork(Box::new(failure))),
            recorded: Mutex::default(),
        }
    }

    pub fn failing_after_work<F>(failure: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        Self {
            failure: Some(Failure::AfterWork(Box::new(failure))),
            recorded: Mutex::default(),
        }
    }

    /// Number of times `run` was called
    pub fn calls(&self) -> usize {
        self.recorded.lock().calls
    }

    /// The context passed to the most recent unit of work
    pub fn last_tx(&self) -> Option<MockTxContext> {
        self.recorded.lock().last_tx
    }

    pub fn reset(&self) {
        *self.recorded.lock() = Recorded::default();
    }

    fn record_call(&self) -> Result<MockTxContext> {
        let mut recorded = self.recorded.lock();
        recorded.calls += 1;

        if let Some(Failure::BeforeWork(failure)) = &self.failure {
            return Err(failure());
        }

        let tx = MockTxContext {
            seq: recorded.calls as u64,
        };
        recorded.last_tx = Some(tx);
        Ok(tx)
    }
}

impl TransactionManager for MockTransactionManager {
    fn run<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(Option<&'c mut dyn TxContext>) -> BoxFuture<'c, Result<T>> + Send,
    {
        async move {
            let mut tx = self.record_call()?;
            let ctx: &mut dyn TxContext = &mut tx;
            let value = work(Some(ctx)).await?;

            match &self.failure {
                Some(Failure::AfterWork(failure)) => Err(failure()),
                _ => Ok(value),
            }
        }
    }
}

/// Runs the unit of work with no transaction context at all; repositories
/// fall back to the shared pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransactionManager;

impl TransactionManager for NoopTransactionManager {
    fn run<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(Option<&'c mut dyn TxContext>) -> BoxFuture<'c, Result<T>> + Send,
    {
        work(None)
    }
}
