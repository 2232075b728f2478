//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread, time::Duration};

use anyhow::Result;
use client_core::{
    HttpStore, MemoryStore, MirrorState, MutationGateway, RemoteStore, SyncMirror,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, error, info};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

/// Retry delay when the UI queue is full; the retry sends the newest state.
const UI_QUEUE_BACKOFF: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    Remote { server_url: String },
    /// Process-local collection, gone when the app exits.
    InMemory,
}

pub fn launch(target: BackendTarget, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_backend(target, cmd_rx, ui_tx));
    });
}

fn open_store(target: &BackendTarget) -> Result<Arc<dyn RemoteStore>> {
    Ok(match target {
        BackendTarget::Remote { server_url } => Arc::new(HttpStore::new(server_url)?),
        BackendTarget::InMemory => Arc::new(MemoryStore::new()),
    })
}

async fn run_backend(
    target: BackendTarget,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let store = match open_store(&target) {
        Ok(store) => store,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: {err:#}"),
            )));
            error!(?target, "failed to open store: {err:#}");
            return;
        }
    };

    let mirror = SyncMirror::start(Arc::clone(&store), &Handle::current());
    let gateway = MutationGateway::new(store, Handle::current());
    let forwarder = tokio::spawn(forward_snapshots(mirror.subscribe(), ui_tx.clone()));
    info!(?target, "backend worker ready");

    // block_on owns this thread; mirror and gateway tasks run on the workers.
    while let Ok(cmd) = cmd_rx.recv() {
        debug!(command = cmd.name(), "backend command received");
        match cmd {
            BackendCommand::Mutate(mutation) => {
                gateway.dispatch(mutation);
            }
        }
    }

    info!("ui command queue closed; stopping backend worker");
    forwarder.abort();
}

/// Pushes every mirror change to the UI as a whole-list snapshot.
pub(crate) async fn forward_snapshots(
    mut updates: watch::Receiver<MirrorState>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        let state = (*updates.borrow_and_update()).clone();
        match ui_tx.try_send(UiEvent::Snapshot {
            items: state.items,
            status: state.status,
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tokio::time::sleep(UI_QUEUE_BACKOFF).await;
                continue;
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
        if updates.changed().await.is_err() {
            return;
        }
    }
}
