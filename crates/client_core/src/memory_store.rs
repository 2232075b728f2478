use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use shared::domain::{normalize_item_text, Item, ItemId};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::{RemoteStore, SnapshotStream};

/// In-process [`RemoteStore`]. Clones share one collection.
///
/// Subscribers observe the latest state; snapshots produced faster than a
/// subscriber polls are coalesced.
#[derive(Clone)]
pub struct MemoryStore {
    collection: Arc<watch::Sender<Vec<Item>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (collection, _) = watch::channel(Vec::new());
        Self {
            collection: Arc::new(collection),
        }
    }

    pub fn snapshot(&self) -> Vec<Item> {
        self.collection.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.collection.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.collection.receiver_count()
    }

    /// Applies `edit` to the item with `id` and re-sorts. Subscribers are only
    /// notified when the item exists.
    fn modify_item(&self, id: &ItemId, edit: impl FnOnce(&mut Vec<Item>, usize)) -> Result<()> {
        let mut found = false;
        self.collection.send_if_modified(|items| {
            let Some(index) = items.iter().position(|item| &item.id == id) else {
                return false;
            };
            edit(items, index);
            sort_by_text(items);
            found = true;
            true
        });
        if found {
            Ok(())
        } else {
            Err(anyhow!("item {id} not found"))
        }
    }
}

fn sort_by_text(items: &mut [Item]) {
    items.sort_by(|a, b| a.text.cmp(&b.text).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe_ordered(&self) -> Result<SnapshotStream> {
        let snapshots = WatchStream::new(self.collection.subscribe()).map(Ok);
        Ok(snapshots.boxed())
    }

    async fn create_item(&self, text: &str) -> Result<ItemId> {
        let text = normalize_item_text(text).map_err(|rejection| anyhow!(rejection.to_string()))?;
        let id = ItemId(Uuid::new_v4().simple().to_string());
        let item = Item {
            id: id.clone(),
            text,
            done: false,
        };
        self.collection.send_modify(|items| {
            items.push(item);
            sort_by_text(items);
        });
        Ok(id)
    }

    async fn set_done(&self, id: &ItemId, done: bool) -> Result<()> {
        self.modify_item(id, |items, index| items[index].done = done)
    }

    async fn delete_item(&self, id: &ItemId) -> Result<()> {
        self.modify_item(id, |items, index| {
            items.remove(index);
        })
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.snapshot())
    }
}
