use std::fmt;

use shared::domain::ItemId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    SetDone,
    Delete,
    /// The enumeration step of a bulk delete.
    ListForDeleteAll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::SetDone => "set_done",
            Self::Delete => "delete",
            Self::ListForDeleteAll => "list_for_delete_all",
        })
    }
}

/// The one failure kind the client knows about. Network, permission and
/// validation failures all end up here.
#[derive(Debug, Error)]
#[error("remote operation failed: {operation}")]
pub struct RemoteOperationFailed {
    pub operation: Operation,
    pub item_id: Option<ItemId>,
    #[source]
    pub source: anyhow::Error,
}

impl RemoteOperationFailed {
    pub fn new(operation: Operation, item_id: Option<ItemId>, source: anyhow::Error) -> Self {
        Self {
            operation,
            item_id,
            source,
        }
    }
}
