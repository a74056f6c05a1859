use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::manager::{Backend, Manager, TxScope};

/// Opens transactions on a shared Postgres pool.
///
/// A `sqlx::Transaction` that is dropped before commit or rollback queues
/// its own rollback, which covers cancellation of the caller's future.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Backend for PgBackend {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, sqlx::Error> {
        self.pool.begin().await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), sqlx::Error> {
        tx.commit().await
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), sqlx::Error> {
        tx.rollback().await
    }
}

pub type PgTransactionManager = Manager<PgBackend>;

/// The context Postgres repositories accept
pub type PgTxContext = TxScope<PgBackend>;

impl Manager<PgBackend> {
    pub fn postgres(pool: PgPool) -> Self {
        Manager::new(PgBackend::new(pool))
    }
}
