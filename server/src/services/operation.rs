//! Business operations that need several repository calls to land atomically

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::records::Record;
use crate::error::Result;
use crate::tx::{TransactionManager, TxContext};

/// Value written by [`OperationService::perform_operation`]
pub const DEFAULT_VALUE: &str = "value";

/// Repository operations the service depends on.
///
/// Each call takes the transaction context it should join, or `None` to run
/// outside any transaction.
#[async_trait]
pub trait Repo: Send + Sync {
    async fn insert_record(&self, tx: Option<&mut dyn TxContext>, value: &str) -> Result<i64>;

    async fn get_record(&self, tx: Option<&mut dyn TxContext>, id: i64) -> Result<Option<Record>>;

    async fn count_records(&self, tx: Option<&mut dyn TxContext>) -> Result<i64>;
}

pub struct OperationService<R, M> {
    repo: Arc<R>,
    tx_manager: Arc<M>,
}

impl<R, M> OperationService<R, M>
where
    R: Repo + 'static,
    M: TransactionManager,
{
    pub fn new(repo: Arc<R>, tx_manager: Arc<M>) -> Self {
        Self { repo, tx_manager }
    }

    /// Insert one record inside a transaction and return its id
    pub async fn perform_operation(&self) -> Result<i64> {
        let repo = Arc::clone(&self.repo);
        self.tx_manager
            .run(move |tx| Box::pin(async move { repo.insert_record(tx, DEFAULT_VALUE).await }))
            .await
    }

    /// Insert every value in one transaction. Either all rows land or none do.
    pub async fn perform_batch(&self, values: Vec<String>) -> Result<Vec<i64>> {
        let repo = Arc::clone(&self.repo);
        let ids = self
            .tx_manager
            .run(move |tx| Box::pin(async move { insert_all(&*repo, tx, &values).await }))
            .await?;
        tracing::info!(count = ids.len(), "batch committed");
        Ok(ids)
    }

    pub async fn record_count(&self) -> Result<i64> {
        self.repo.count_records(None).await
    }

    pub async fn find_record(&self, id: i64) -> Result<Option<Record>> {
        self.repo.get_record(None, id).await
    }
}

async fn insert_all<R: Repo>(
    repo: &R,
    mut tx: Option<&mut dyn TxContext>,
    values: &[String],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        ids.push(repo.insert_record(tx.as_deref_mut(), value).await?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;

    use crate::error::Error;
    use crate::tx::{MockTransactionManager, MockTxContext, NoopTransactionManager};

    /// Repository bound to the mock manager. Records the context sequence
    /// number each call saw (`None` for no context).
    #[derive(Default)]
    struct FakeRepo {
        seen: Mutex<Vec<Option<u64>>>,
        fail_on: Option<String>,
    }

    impl FakeRepo {
        fn failing_on(value: &str) -> Self {
            Self {
                fail_on: Some(value.to_string()),
                ..Default::default()
            }
        }

        fn observe(&self, tx: Option<&mut dyn TxContext>) -> Result<()> {
            let seq = match tx {
                None => None,
                Some(ctx) => Some(
                    ctx.as_any_mut()
                        .downcast_mut::<MockTxContext>()
                        .ok_or(Error::InvalidTxContext)?
                        .seq,
                ),
            };
            self.seen.lock().push(seq);
            Ok(())
        }

        fn seen(&self) -> Vec<Option<u64>> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Repo for FakeRepo {
        async fn insert_record(&self, tx: Option<&mut dyn TxContext>, value: &str) -> Result<i64> {
            self.observe(tx)?;
            if self.fail_on.as_deref() == Some(value) {
                return Err(Error::Database(sqlx::Error::Protocol(
                    "insert failed".to_string(),
                )));
            }
            Ok(self.seen.lock().len() as i64)
        }

        async fn get_record(&self, tx: Option<&mut dyn TxContext>, id: i64) -> Result<Option<Record>> {
            self.observe(tx)?;
            Ok(Some(Record {
                id,
                value: DEFAULT_VALUE.to_string(),
                created_at: Utc::now(),
            }))
        }

        async fn count_records(&self, tx: Option<&mut dyn TxContext>) -> Result<i64> {
            self.observe(tx)?;
            Ok(3)
        }
    }

    fn service(
        repo: FakeRepo,
        manager: MockTransactionManager,
    ) -> (
        OperationService<FakeRepo, MockTransactionManager>,
        Arc<FakeRepo>,
        Arc<MockTransactionManager>,
    ) {
        let repo = Arc::new(repo);
        let manager = Arc::new(manager);
        let service = OperationService::new(Arc::clone(&repo), Arc::clone(&manager));
        (service, repo, manager)
    }

    #[tokio::test]
    async fn test_perform_operation_runs_inside_transaction() {
        let (service, repo, manager) = service(FakeRepo::default(), MockTransactionManager::new());

        let id = service.perform_operation().await.unwrap();

        assert_eq!(id, 1);
        assert_eq!(manager.calls(), 1);
        assert_eq!(manager.last_tx(), Some(MockTxContext { seq: 1 }));
        assert_eq!(repo.seen(), vec![Some(1)]);
    }

    #[tokio::test]
    async fn test_perform_operation_returns_repository_error() {
        let (service, _repo, manager) = service(
            FakeRepo::failing_on(DEFAULT_VALUE),
            MockTransactionManager::new(),
        );

        let err = service.perform_operation().await.unwrap_err();

        assert!(
            matches!(&err, Error::Database(sqlx::Error::Protocol(msg)) if msg == "insert failed")
        );
        assert_eq!(manager.calls(), 1);
    }

    #[tokio::test]
    async fn test_perform_operation_surfaces_manager_failure() {
        let (service, repo, _manager) = service(
            FakeRepo::default(),
            MockTransactionManager::failing(|| Error::Begin(sqlx::Error::PoolTimedOut)),
        );

        let result = service.perform_operation().await;

        assert!(matches!(result, Err(Error::Begin(sqlx::Error::PoolTimedOut))));
        assert!(repo.seen().is_empty());
    }

    #[tokio::test]
    async fn test_perform_operation_surfaces_commit_failure() {
        let (service, repo, manager) = service(
            FakeRepo::default(),
            MockTransactionManager::failing_after_work(|| Error::Commit(sqlx::Error::PoolClosed)),
        );

        let result = service.perform_operation().await;

        assert!(matches!(result, Err(Error::Commit(sqlx::Error::PoolClosed))));
        assert_eq!(manager.calls(), 1);
        assert_eq!(repo.seen(), vec![Some(1)]);
    }

    #[tokio::test]
    async fn test_batch_shares_one_transaction() {
        let (service, repo, manager) = service(FakeRepo::default(), MockTransactionManager::new());

        let ids = service
            .perform_batch(vec!["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(manager.calls(), 1);
        assert_eq!(repo.seen(), vec![Some(1), Some(1), Some(1)]);
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let (service, repo, _manager) =
            service(FakeRepo::failing_on("b"), MockTransactionManager::new());

        let result = service
            .perform_batch(vec!["a".into(), "b".into(), "c".into()])
            .await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(repo.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_reads_run_without_transaction() {
        let (service, repo, manager) = service(FakeRepo::default(), MockTransactionManager::new());

        assert_eq!(service.record_count().await.unwrap(), 3);
        let record = service.find_record(9).await.unwrap().unwrap();

        assert_eq!(record.id, 9);
        assert_eq!(manager.calls(), 0);
        assert_eq!(repo.seen(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_noop_manager_runs_on_pool_path() {
        let repo = Arc::new(FakeRepo::default());
        let service = OperationService::new(Arc::clone(&repo), Arc::new(NoopTransactionManager));

        service.perform_operation().await.unwrap();

        assert_eq!(repo.seen(), vec![None]);
    }
}
