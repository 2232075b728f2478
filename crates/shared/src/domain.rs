use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest accepted item text, counted in characters after trimming.
pub const MAX_ITEM_TEXT_CHARS: usize = 500;

/// Opaque identifier assigned by the store. Clients never mint or edit these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub done: bool,
}

impl Item {
    pub fn state(&self) -> ItemState {
        ItemState::from_done(self.done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Completed,
}

impl ItemState {
    pub fn from_done(done: bool) -> Self {
        if done {
            Self::Completed
        } else {
            Self::Pending
        }
    }

    pub fn is_done(self) -> bool {
        self == Self::Completed
    }

    /// The only transition between the two states; it is its own inverse.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTextRejection {
    Blank,
    TooLong { chars: usize },
}

impl fmt::Display for ItemTextRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => f.write_str("item text cannot be empty"),
            Self::TooLong { chars } => write!(
                f,
                "item text has {chars} characters; the limit is {MAX_ITEM_TEXT_CHARS}"
            ),
        }
    }
}

/// Trims raw input and checks it is storable as item text.
pub fn normalize_item_text(raw: &str) -> Result<String, ItemTextRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ItemTextRejection::Blank);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_ITEM_TEXT_CHARS {
        return Err(ItemTextRejection::TooLong { chars });
    }
    Ok(trimmed.to_string())
}
