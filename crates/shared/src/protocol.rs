use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemResponse {
    pub id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    pub done: bool,
}

/// Pushed over the subscription socket. Every variant carries complete state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The whole collection, ordered by `text` ascending.
    Snapshot { items: Vec<Item> },
}

pub fn items_route() -> &'static str {
    "/items"
}

pub fn item_route(id: &ItemId) -> String {
    format!("{}/{}", items_route(), id)
}

pub fn subscribe_route() -> &'static str {
    "/ws"
}
