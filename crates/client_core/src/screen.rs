//! View model for the single todo screen. It owns what the screen shows and
//! turns user actions into [`Mutation`]s; it never talks to the store.

use std::sync::Arc;

use shared::domain::{normalize_item_text, Item, ItemId, ItemState};
use tracing::info;

use crate::gateway::Mutation;

pub const EMPTY_STATE_TEXT: &str = "There are no items";
pub const CONFIRM_TITLE: &str = "Todolist";
pub const CONFIRM_MESSAGE: &str = "Remove all items?";

#[derive(Debug, Clone)]
pub struct TodoScreen {
    draft: String,
    items: Arc<[Item]>,
    confirming_clear_all: bool,
}

impl Default for TodoScreen {
    fn default() -> Self {
        Self {
            draft: String::new(),
            items: Arc::from(Vec::new()),
            confirming_clear_all: false,
        }
    }
}

impl TodoScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Direct access for text widgets bound to the input field.
    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Clears the input as soon as a create is issued; a rejected draft stays
    /// as typed and issues nothing.
    pub fn submit(&mut self) -> Option<Mutation> {
        let text = normalize_item_text(&self.draft).ok()?;
        self.draft.clear();
        Some(Mutation::Create { text })
    }

    pub fn toggle(&self, id: &ItemId) -> Option<Mutation> {
        let item = self.find(id)?;
        Some(Mutation::SetDone {
            id: item.id.clone(),
            done: item.state().toggled().is_done(),
        })
    }

    pub fn remove(&self, id: &ItemId) -> Option<Mutation> {
        let item = self.find(id)?;
        Some(Mutation::Delete {
            id: item.id.clone(),
        })
    }

    pub fn request_clear_all(&mut self) {
        self.confirming_clear_all = true;
    }

    pub fn is_confirming_clear_all(&self) -> bool {
        self.confirming_clear_all
    }

    pub fn confirm_clear_all(&mut self) -> Option<Mutation> {
        if !self.confirming_clear_all {
            return None;
        }
        self.confirming_clear_all = false;
        Some(Mutation::DeleteAll)
    }

    pub fn cancel_clear_all(&mut self) {
        if self.confirming_clear_all {
            info!("clear all: cancel pressed");
        }
        self.confirming_clear_all = false;
    }

    /// Replaces the rendered list wholesale.
    pub fn apply_snapshot(&mut self, items: Arc<[Item]>) {
        self.items = items;
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Items in display order with the state each row renders.
    pub fn rows(&self) -> impl Iterator<Item = (&Item, ItemState)> + '_ {
        self.items.iter().map(|item| (item, item.state()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn header(&self) -> String {
        format!("Todolist ({})", self.items.len())
    }

    fn find(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }
}
