//! Postgres repository
//!
//! Every operation takes an optional transaction context. Without one it
//! runs on the shared pool; with a [`PgTxContext`] it runs on that
//! transaction's connection. Any other context is refused.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::domain::records::{self, Record};
use crate::error::{Error, Result};
use crate::services::Repo;
use crate::tx::{PgTxContext, TxContext};

/// The handle a query is issued against
enum Querier<'c> {
    Pool(&'c PgPool),
    Tx(&'c mut PgConnection),
}

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn querier<'c>(&'c self, tx: Option<&'c mut dyn TxContext>) -> Result<Querier<'c>> {
        let Some(ctx) = tx else {
            return Ok(Querier::Pool(&self.pool));
        };

        let pg = ctx
            .as_any_mut()
            .downcast_mut::<PgTxContext>()
            .ok_or(Error::InvalidTxContext)?;

        Ok(Querier::Tx(&mut **pg.handle_mut()))
    }
}

#[async_trait]
impl Repo for PgRepository {
    async fn insert_record(&self, tx: Option<&mut dyn TxContext>, value: &str) -> Result<i64> {
        let id = match self.querier(tx)? {
            Querier::Pool(pool) => records::insert_record(pool, value).await?,
            Querier::Tx(conn) => records::insert_record(conn, value).await?,
        };
        tracing::debug!(id, "inserted record");
        Ok(id)
    }

    async fn get_record(&self, tx: Option<&mut dyn TxContext>, id: i64) -> Result<Option<Record>> {
        let record = match self.querier(tx)? {
            Querier::Pool(pool) => records::get_record(pool, id).await?,
            Querier::Tx(conn) => records::get_record(conn, id).await?,
        };
        Ok(record)
    }

    async fn count_records(&self, tx: Option<&mut dyn TxContext>) -> Result<i64> {
        let count = match self.querier(tx)? {
            Querier::Pool(pool) => records::count_records(pool).await?,
            Querier::Tx(conn) => records::count_records(conn).await?,
        };
        Ok(count)
    }
}
