use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use shared::domain::{Item, ItemId};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{MemoryStore, MirrorState, RemoteStore, SnapshotStream, SyncMirror};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn item(id: &str, text: &str, done: bool) -> Item {
    Item {
        id: ItemId::from(id),
        text: text.to_string(),
        done,
    }
}

pub fn texts(items: &[Item]) -> Vec<String> {
    items.iter().map(|item| item.text.clone()).collect()
}

pub async fn wait_for_mirror(
    mirror: &SyncMirror,
    predicate: impl FnMut(&MirrorState) -> bool,
) -> MirrorState {
    tokio::time::timeout(WAIT, mirror.wait_until(predicate))
        .await
        .expect("mirror did not reach expected state in time")
        .expect("mirror closed")
}

/// Store whose subscription is fed by the test through a channel.
pub struct ScriptedStore {
    snapshots: Mutex<Option<mpsc::UnboundedReceiver<Result<Vec<Item>>>>>,
    fail_subscribe: bool,
}

impl ScriptedStore {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Vec<Item>>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                snapshots: Mutex::new(Some(rx)),
                fail_subscribe: false,
            },
            tx,
        )
    }

    pub fn unreachable() -> Self {
        Self {
            snapshots: Mutex::new(None),
            fail_subscribe: true,
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn subscribe_ordered(&self) -> Result<SnapshotStream> {
        if self.fail_subscribe {
            return Err(anyhow!("connection refused"));
        }
        let rx = self
            .snapshots
            .lock()
            .expect("lock")
            .take()
            .ok_or_else(|| anyhow!("already subscribed"))?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn create_item(&self, _text: &str) -> Result<ItemId> {
        Err(anyhow!("read-only store"))
    }

    async fn set_done(&self, _id: &ItemId, _done: bool) -> Result<()> {
        Err(anyhow!("read-only store"))
    }

    async fn delete_item(&self, _id: &ItemId) -> Result<()> {
        Err(anyhow!("read-only store"))
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Err(anyhow!("read-only store"))
    }
}

/// Wraps a [`MemoryStore`], counting write calls and failing on demand.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
    failing_deletes: Arc<Mutex<HashSet<ItemId>>>,
}

impl FlakyStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_all_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, id: &ItemId) {
        self.failing_deletes
            .lock()
            .expect("lock")
            .insert(id.clone());
    }

    fn begin_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("permission denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn subscribe_ordered(&self) -> Result<SnapshotStream> {
        self.inner.subscribe_ordered().await
    }

    async fn create_item(&self, text: &str) -> Result<ItemId> {
        self.begin_write()?;
        self.inner.create_item(text).await
    }

    async fn set_done(&self, id: &ItemId, done: bool) -> Result<()> {
        self.begin_write()?;
        self.inner.set_done(id, done).await
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        self.begin_write()?;
        if self.failing_deletes.lock().expect("lock").contains(id) {
            return Err(anyhow!("network unreachable"));
        }
        self.inner.delete_item(id).await
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(anyhow!("network unreachable"));
        }
        self.inner.list_items().await
    }
}
