//! Client side of the todo list: a standing snapshot subscription mirrored
//! locally ([`SyncMirror`]) and fire-and-forget writes ([`MutationGateway`])
//! against a [`RemoteStore`].

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::domain::{Item, ItemId};

pub mod error;
pub mod gateway;
pub mod http_store;
pub mod memory_store;
pub mod mirror;
pub mod screen;

pub use error::{Operation, RemoteOperationFailed};
pub use gateway::{BulkDeleteReport, Mutation, MutationGateway, MutationHandle};
pub use http_store::HttpStore;
pub use memory_store::MemoryStore;
pub use mirror::{MirrorState, MirrorStatus, SyncMirror};
pub use screen::TodoScreen;

/// Full snapshots of the collection, ordered by `text` ascending. Each item
/// of the stream replaces everything delivered before it.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Item>>>;

/// The document-store collaborator the client is written against.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Opens a standing subscription. The first snapshot arrives without any
    /// change having to happen.
    async fn subscribe_ordered(&self) -> Result<SnapshotStream>;
    async fn create_item(&self, text: &str) -> Result<ItemId>;
    async fn set_done(&self, id: &ItemId, done: bool) -> Result<()>;
    async fn delete_item(&self, id: &ItemId) -> Result<()>;
    /// One-shot read of the whole collection.
    async fn list_items(&self) -> Result<Vec<Item>>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/mirror_tests.rs"]
mod mirror_tests;

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod gateway_tests;

#[cfg(test)]
#[path = "tests/http_store_tests.rs"]
mod http_store_tests;
