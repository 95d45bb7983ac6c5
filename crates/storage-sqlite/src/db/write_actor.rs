//! Single-writer actor for the SQLite database.
//!
//! SQLite allows one writer at a time. Every write goes through one task
//! owning one connection, so concurrent writers queue instead of hitting
//! lock errors. Each job runs inside an immediate transaction.

use std::any::Any;
use std::sync::Arc;

use diesel::SqliteConnection;
use tokio::sync::{mpsc, oneshot};

use coinfolio_core::errors::{Error, Result};

use super::DbPool;
use crate::errors::SqliteStorageError;

type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for submitting write jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, Reply)>,
}

impl WriteHandle {
    /// Runs `job` on the writer's dedicated connection, inside an immediate
    /// transaction. Jobs execute strictly in submission order.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        // The job's return value is type-erased through the channel and
        // restored on this side.
        self.tx
            .send((
                Box::new(move |conn| job(conn).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                reply_tx,
            ))
            .await
            .expect("writer actor stopped accepting jobs");

        reply_rx
            .await
            .expect("writer actor dropped the reply channel")
            .map(|boxed| {
                *boxed
                    .downcast::<T>()
                    .unwrap_or_else(|_| panic!("writer actor returned a mismatched type"))
            })
    }
}

/// Spawns the writer actor over one pooled connection and returns the
/// handle for submitting jobs to it.
pub fn spawn_writer(pool: Arc<DbPool>) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, Reply)>(256);

    tokio::spawn(async move {
        let mut conn = pool
            .get()
            .expect("no connection available for the writer actor");

        while let Some((job, reply_tx)) = rx.recv().await {
            let result = conn
                .immediate_transaction::<_, SqliteStorageError, _>(|conn| {
                    job(conn).map_err(SqliteStorageError::from)
                })
                .map_err(Error::from);

            // The requester may have gone away; a failed send is fine.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
