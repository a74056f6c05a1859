use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use super::{TransactionManager, TxContext};
use crate::error::{Error, Result};

/// The resource a [`Manager`] drives: something that can open, commit and
/// roll back transactions.
///
/// Dropping a `Tx` without committing must roll it back. The manager relies
/// on this when its own future is dropped mid-flight.
#[async_trait]
pub trait Backend: Send + Sync {
    type Tx: Send + 'static;

    async fn begin(&self) -> std::result::Result<Self::Tx, sqlx::Error>;

    async fn commit(&self, tx: Self::Tx) -> std::result::Result<(), sqlx::Error>;

    async fn rollback(&self, tx: Self::Tx) -> std::result::Result<(), sqlx::Error>;
}

/// Transaction context produced by [`Manager`]: owns the backend's live
/// transaction handle while the unit of work runs.
///
/// The scope is keyed by the backend, not the handle type, so two backends
/// sharing a handle type still produce distinct contexts.
pub struct TxScope<B: Backend> {
    handle: B::Tx,
}

impl<B: Backend> TxScope<B> {
    pub fn new(handle: B::Tx) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &B::Tx {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut B::Tx {
        &mut self.handle
    }

    pub fn into_inner(self) -> B::Tx {
        self.handle
    }
}

impl<B: Backend + 'static> TxContext for TxScope<B> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Transaction manager over any [`Backend`].
///
/// One `run` call opens exactly one transaction and always leaves it either
/// committed or rolled back. A panic inside the unit of work rolls back and
/// then resumes unwinding with the original payload.
pub struct Manager<B> {
    backend: B,
}

impl<B: Backend> Manager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Rollback failures are secondary to whatever caused the rollback
    async fn rollback(&self, tx: B::Tx) {
        match self.backend.rollback(tx).await {
            Ok(()) => tracing::debug!("transaction rolled back"),
            Err(err) => tracing::warn!(error = %err, "rollback failed"),
        }
    }
}

impl<B: Backend + 'static> TransactionManager for Manager<B> {
    fn run<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(Option<&'c mut dyn TxContext>) -> BoxFuture<'c, Result<T>> + Send,
    {
        async move {
            let handle = self.backend.begin().await.map_err(Error::Begin)?;
            tracing::debug!("transaction began");

            let mut scope = TxScope::<B>::new(handle);
            let ctx: &mut dyn TxContext = &mut scope;
            let outcome = AssertUnwindSafe(async move { work(Some(ctx)).await })
                .catch_unwind()
                .await;
            let handle = scope.into_inner();

            match outcome {
                Ok(Ok(value)) => {
                    self.backend.commit(handle).await.map_err(Error::Commit)?;
                    tracing::debug!("transaction committed");
                    Ok(value)
                }
                Ok(Err(err)) => {
                    self.rollback(handle).await;
                    Err(err)
                }
                Err(payload) => {
                    self.rollback(handle).await;
                    panic::resume_unwind(payload)
                }
            }
        }
    }
}
