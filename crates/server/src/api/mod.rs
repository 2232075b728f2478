use std::sync::Arc;

use shared::{
    domain::{normalize_item_text, Item, ItemId},
    error::{ApiError, ErrorCode},
    protocol::ServerEvent,
};
use storage::Storage;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    Mutex, MutexGuard,
};
use tracing::{debug, info, warn};

/// Collection operations shared by the HTTP handlers.
///
/// Every mutation commits and publishes its snapshot while holding
/// `write_lock`, so subscribers receive snapshots in commit order.
#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub events: broadcast::Sender<ServerEvent>,
    write_lock: Arc<Mutex<()>>,
}

impl ApiContext {
    pub fn new(storage: Storage, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            storage,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Subscribes to snapshot events and loads the current snapshot as one step.
    ///
    /// Anything later received on the returned channel is newer than the
    /// returned snapshot.
    pub async fn subscribe(
        &self,
    ) -> Result<(ServerEvent, broadcast::Receiver<ServerEvent>), ApiError> {
        let _guard = self.write_lock.lock().await;
        let events_rx = self.events.subscribe();
        let snapshot = load_snapshot(self).await?;
        Ok((snapshot, events_rx))
    }

    async fn publish_snapshot(&self, _guard: &MutexGuard<'_, ()>) -> Result<(), ApiError> {
        let snapshot = load_snapshot(self).await?;
        // No subscribers is not a failure.
        let receivers = self.events.send(snapshot).unwrap_or(0);
        debug!(receivers, "published collection snapshot");
        Ok(())
    }
}

pub async fn load_snapshot(ctx: &ApiContext) -> Result<ServerEvent, ApiError> {
    Ok(ServerEvent::Snapshot {
        items: list_items(ctx).await?,
    })
}

/// Next event for a subscriber, or `None` once the channel is closed.
///
/// A subscriber that fell behind skips its backlog: it is resubscribed and
/// handed a freshly loaded snapshot, which supersedes everything it missed.
pub async fn next_event(
    ctx: &ApiContext,
    events_rx: &mut broadcast::Receiver<ServerEvent>,
) -> Option<ServerEvent> {
    loop {
        match events_rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged; resynchronising");
                *events_rx = events_rx.resubscribe();
                match load_snapshot(ctx).await {
                    Ok(event) => return Some(event),
                    Err(err) => {
                        warn!(error = %err.message, "failed to reload snapshot for lagging subscriber");
                    }
                }
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

pub async fn list_items(ctx: &ApiContext) -> Result<Vec<Item>, ApiError> {
    let items = ctx.storage.list_items().await.map_err(internal)?;
    Ok(items.into_iter().map(Item::from).collect())
}

pub async fn create_item(ctx: &ApiContext, raw_text: &str) -> Result<ItemId, ApiError> {
    let text = normalize_item_text(raw_text)
        .map_err(|rejection| ApiError::new(ErrorCode::Validation, rejection.to_string()))?;

    let guard = ctx.write_lock.lock().await;
    let id = ctx.storage.create_item(&text).await.map_err(internal)?;
    ctx.publish_snapshot(&guard).await?;
    info!(item_id = %id, "item created");
    Ok(id)
}

pub async fn set_done(ctx: &ApiContext, id: &ItemId, done: bool) -> Result<(), ApiError> {
    let guard = ctx.write_lock.lock().await;
    let updated = ctx.storage.set_done(id, done).await.map_err(internal)?;
    if !updated {
        return Err(not_found(id));
    }
    ctx.publish_snapshot(&guard).await?;
    info!(item_id = %id, done, "item updated");
    Ok(())
}

pub async fn delete_item(ctx: &ApiContext, id: &ItemId) -> Result<(), ApiError> {
    let guard = ctx.write_lock.lock().await;
    let deleted = ctx.storage.delete_item(id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found(id));
    }
    ctx.publish_snapshot(&guard).await?;
    info!(item_id = %id, "item deleted");
    Ok(())
}

fn not_found(id: &ItemId) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("item {id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
