use std::sync::Arc;

use futures::future::join_all;
use shared::domain::{normalize_item_text, ItemId};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::{Operation, RemoteOperationFailed},
    RemoteStore,
};

/// Handle to a spawned remote write. Dropping it does not cancel the write.
pub type MutationHandle<T> = JoinHandle<Result<T, RemoteOperationFailed>>;

/// A user-initiated write, as a value the UI thread can queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { text: String },
    SetDone { id: ItemId, done: bool },
    Delete { id: ItemId },
    DeleteAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkDeleteReport {
    pub attempted: usize,
    pub failed: usize,
}

/// Issues writes against the remote collection.
///
/// Nothing here touches local state: the effect of a write becomes visible
/// only when the subscription delivers the next snapshot. Failures are logged
/// where they happen and never retried.
#[derive(Clone)]
pub struct MutationGateway {
    store: Arc<dyn RemoteStore>,
    runtime: Handle,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn RemoteStore>, runtime: Handle) -> Self {
        Self { store, runtime }
    }

    /// Returns `None`, without any remote call, when the trimmed text is
    /// empty or too long.
    pub fn create(&self, raw_text: &str) -> Option<MutationHandle<ItemId>> {
        let text = match normalize_item_text(raw_text) {
            Ok(text) => text,
            Err(rejection) => {
                debug!(%rejection, "create skipped before submission");
                return None;
            }
        };
        let store = Arc::clone(&self.store);
        Some(self.runtime.spawn(async move {
            let result = store.create_item(&text).await;
            logged(Operation::Create, None, result)
        }))
    }

    /// Flips `done` relative to the value the caller last saw.
    pub fn toggle_done(&self, id: ItemId, current_done: bool) -> MutationHandle<()> {
        self.set_done(id, !current_done)
    }

    pub fn set_done(&self, id: ItemId, done: bool) -> MutationHandle<()> {
        let store = Arc::clone(&self.store);
        self.runtime.spawn(async move {
            let result = store.set_done(&id, done).await;
            logged(Operation::SetDone, Some(id), result)
        })
    }

    pub fn delete_one(&self, id: ItemId) -> MutationHandle<()> {
        let store = Arc::clone(&self.store);
        self.runtime.spawn(async move {
            let result = store.delete_item(&id).await;
            logged(Operation::Delete, Some(id), result)
        })
    }

    /// Enumerates the collection and issues one independent delete per item.
    ///
    /// Each delete is its own task: a failing item does not stop the others
    /// and nothing is rolled back. The handle resolves once every delete has
    /// settled; only a failed enumeration makes it an error.
    pub fn delete_all(&self) -> MutationHandle<BulkDeleteReport> {
        let gateway = self.clone();
        self.runtime.spawn(async move {
            let listed = gateway.store.list_items().await;
            let items = logged(Operation::ListForDeleteAll, None, listed)?;

            let deletes: Vec<_> = items
                .into_iter()
                .map(|item| gateway.delete_one(item.id))
                .collect();
            let mut report = BulkDeleteReport {
                attempted: deletes.len(),
                failed: 0,
            };
            for outcome in join_all(deletes).await {
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => report.failed += 1,
                    Err(join_err) => {
                        warn!(error = %join_err, "delete task did not run to completion");
                        report.failed += 1;
                    }
                }
            }
            info!(
                attempted = report.attempted,
                failed = report.failed,
                "bulk delete settled"
            );
            Ok::<_, RemoteOperationFailed>(report)
        })
    }

    /// Fire-and-forget entry point. Returns whether a remote call was issued.
    ///
    /// Handles are dropped, which detaches the task; failures are logged
    /// inside it.
    pub fn dispatch(&self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Create { text } => self.create(&text).map(drop).is_some(),
            Mutation::SetDone { id, done } => {
                drop(self.set_done(id, done));
                true
            }
            Mutation::Delete { id } => {
                drop(self.delete_one(id));
                true
            }
            Mutation::DeleteAll => {
                drop(self.delete_all());
                true
            }
        }
    }
}

fn logged<T>(
    operation: Operation,
    item_id: Option<ItemId>,
    result: anyhow::Result<T>,
) -> Result<T, RemoteOperationFailed> {
    result.map_err(|source| {
        match &item_id {
            Some(id) => warn!(
                %operation,
                item_id = %id,
                error = %format!("{source:#}"),
                "remote operation failed"
            ),
            None => warn!(%operation, error = %format!("{source:#}"), "remote operation failed"),
        }
        RemoteOperationFailed::new(operation, item_id, source)
    })
}
