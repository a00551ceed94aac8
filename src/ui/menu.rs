/// Menus: named categories holding ordered entries.
///
/// An entry is a shortcut (optional: separators have none), a message
/// and an optional free-form payload the host reads back after a
/// selection. Display is plain text: vertical (one entry per line) or
/// horizontal (pipe-separated), with pagination inserting line breaks
/// every N shortcut entries.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::Value;

use crate::domain::direction::Orientation;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct MenuEntry {
    pub shortcut: Option<String>,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Default)]
pub struct Menu {
    categories: BTreeMap<String, Vec<MenuEntry>>,
}

impl Menu {
    pub fn new() -> Self {
        Menu { categories: BTreeMap::new() }
    }

    /// Append an entry; the category is created on first use.
    pub fn add_entry(
        &mut self,
        category: &str,
        shortcut: Option<&str>,
        message: &str,
        data: Option<Value>,
    ) {
        self.categories.entry(category.to_string()).or_default().push(MenuEntry {
            shortcut: shortcut.map(str::to_string),
            message: message.to_string(),
            data,
        });
    }

    /// Rewrite the message (and payload, when given) of every entry in
    /// the category with a matching shortcut. Absent entries are left
    /// alone, silently.
    pub fn update_entry(
        &mut self,
        category: &str,
        shortcut: Option<&str>,
        message: &str,
        data: Option<Value>,
    ) {
        if let Some(entries) = self.categories.get_mut(category) {
            for entry in entries.iter_mut() {
                if entry.shortcut.as_deref() == shortcut {
                    entry.message = message.to_string();
                    if let Some(payload) = &data {
                        entry.data = Some(payload.clone());
                    }
                }
            }
        }
    }

    pub fn get_entry(&self, category: &str, shortcut: Option<&str>) -> Option<&MenuEntry> {
        self.categories
            .get(category)?
            .iter()
            .find(|entry| entry.shortcut.as_deref() == shortcut)
    }

    pub fn delete_category(&mut self, category: &str) -> Result<()> {
        match self.categories.remove(category) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownMenuCategory(category.to_string())),
        }
    }

    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    /// Print one category. Entries with a shortcut render as
    /// "shortcut - message"; separators render their message alone.
    /// Every `paginate` shortcut entries a line break is inserted.
    pub fn display(
        &self,
        out: &mut impl Write,
        category: &str,
        orientation: Orientation,
        paginate: usize,
    ) -> Result<()> {
        let entries = self
            .categories
            .get(category)
            .ok_or_else(|| Error::UnknownMenuCategory(category.to_string()))?;
        let line_end = match orientation {
            Orientation::Vertical => "\n",
            Orientation::Horizontal => " | ",
        };
        let mut counter = 1;
        for entry in entries {
            match &entry.shortcut {
                None => write!(out, "{}{}", entry.message, line_end)?,
                Some(shortcut) => {
                    write!(out, "{} - {}{}", shortcut, entry.message, line_end)?;
                    counter += 1;
                    if paginate > 0 && counter > paginate {
                        writeln!(out)?;
                        counter = 1;
                    }
                }
            }
        }
        Ok(())
    }
}
