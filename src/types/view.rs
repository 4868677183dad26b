use serde::{Deserialize, Serialize};

use super::bookmark::{Bookmark, BookmarkFields};

/// Which half of the screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Add,
    List,
}

impl Panel {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Panel::Add),
            "list" => Some(Panel::List),
            _ => None,
        }
    }
}

/// The add/edit form.
///
/// `editing` is a snapshot of the record being edited, not a live reference;
/// when set, saving updates that record instead of inserting a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDraft {
    pub title: String,
    pub url: String,
    pub error: Option<String>,
    pub editing: Option<Bookmark>,
}

impl FormDraft {
    pub fn fields(&self) -> BookmarkFields {
        BookmarkFields::new(self.title.clone(), self.url.clone())
    }

    /// Drops the typed values and the edit target. The error is left alone.
    pub fn clear_input(&mut self) {
        self.title.clear();
        self.url.clear();
        self.editing = None;
    }
}
