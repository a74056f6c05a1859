//! Transaction management
//!
//! Services run multi-step work atomically without knowing which backend
//! implements the transaction. The contract has three parties:
//!
//! - a [`TransactionManager`] opens a transaction, hands the unit of work an
//!   opaque [`TxContext`], then commits or rolls back based on the outcome;
//! - a repository resolves the context to a query handle, or to the shared
//!   pool when no context is given;
//! - a service wires the two together.
//!
//! # Usage Pattern
//!
//! ```ignore
//! let repo = Arc::clone(&self.repo);
//! let id = self
//!     .tx_manager
//!     .run(move |tx| Box::pin(async move { repo.insert_record(tx, "value").await }))
//!     .await?;
//! ```
//!
//! Repositories must reject contexts they do not recognize with
//! [`Error::InvalidTxContext`](crate::Error::InvalidTxContext) rather than
//! quietly running against the pool.

mod manager;
mod mock;
mod postgres;

use std::any::Any;
use std::future::Future;

use futures::future::BoxFuture;

use crate::error::Result;

pub use manager::{Backend, Manager, TxScope};
pub use mock::{MockTransactionManager, MockTxContext, NoopTransactionManager};
pub use postgres::{PgBackend, PgTransactionManager, PgTxContext};

/// Marker for "inside transaction X".
///
/// Carries no behavior; its only job is type identity so a repository can
/// tell whether the context came from the manager it is paired with.
pub trait TxContext: Any + Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait TransactionManager: Send + Sync {
    /// Run `work` inside a single transaction.
    ///
    /// The context handed to `work` is only valid for that call. An `Err`
    /// from `work` rolls back and is returned unchanged; `Ok` commits.
    fn run<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: for<'c> FnOnce(Option<&'c mut dyn TxContext>) -> BoxFuture<'c, Result<T>> + Send;
}
