use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::StreamExt;
use shared::domain::Item;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    /// No snapshot delivered yet.
    Connecting,
    Live,
    /// The subscription closed or could not be opened. The last snapshot stays.
    Ended,
}

#[derive(Debug, Clone)]
pub struct MirrorState {
    pub items: Arc<[Item]>,
    pub status: MirrorStatus,
    /// Number of snapshots applied so far.
    pub revision: u64,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            status: MirrorStatus::Connecting,
            revision: 0,
        }
    }
}

/// Local read model of the remote collection.
///
/// The subscription task is the only writer. Each snapshot replaces the whole
/// list in one swap, so readers see either the old list or the new one.
/// Dropping the mirror tears the subscription down.
pub struct SyncMirror {
    state: watch::Receiver<MirrorState>,
    task: JoinHandle<()>,
}

impl SyncMirror {
    pub fn start(store: Arc<dyn RemoteStore>, runtime: &Handle) -> Self {
        let (state_tx, state) = watch::channel(MirrorState::default());
        let task = runtime.spawn(run_subscription(store, state_tx));
        Self { state, task }
    }

    pub fn items(&self) -> Arc<[Item]> {
        Arc::clone(&self.state.borrow().items)
    }

    pub fn status(&self) -> MirrorStatus {
        self.state.borrow().status
    }

    pub fn state(&self) -> MirrorState {
        self.state.borrow().clone()
    }

    /// Push-style access for consumers that render on change.
    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.state.clone()
    }

    /// Resolves with the first state (current included) matching `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&MirrorState) -> bool,
    ) -> Result<MirrorState> {
        let mut state = self.state.clone();
        let matched = state
            .wait_for(predicate)
            .await
            .map_err(|_| anyhow!("mirror subscription task is gone"))?;
        Ok((*matched).clone())
    }
}

impl Drop for SyncMirror {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_subscription(store: Arc<dyn RemoteStore>, state_tx: watch::Sender<MirrorState>) {
    let mut snapshots = match store.subscribe_ordered().await {
        Ok(snapshots) => snapshots,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to open snapshot subscription");
            state_tx.send_modify(|state| state.status = MirrorStatus::Ended);
            return;
        }
    };
    info!("snapshot subscription established");

    while let Some(next) = snapshots.next().await {
        match next {
            Ok(items) => {
                let count = items.len();
                let items: Arc<[Item]> = Arc::from(items);
                state_tx.send_modify(|state| {
                    state.items = items;
                    state.status = MirrorStatus::Live;
                    state.revision += 1;
                });
                debug!(count, "mirror replaced with new snapshot");
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "snapshot subscription error; keeping last snapshot"
                );
            }
        }
    }

    info!("snapshot subscription ended");
    state_tx.send_modify(|state| state.status = MirrorStatus::Ended);
}
