/// Capacity-bounded, name-keyed collection of picked-up items.
///
/// Size accounting goes by each item's `inventory_space`, not by item
/// count. Keys stay unique: an empty or colliding name gets a random
/// hex suffix on insertion.

use std::collections::BTreeMap;

use crate::domain::item::BoardItem;
use crate::error::{Error, Result};

pub struct Inventory {
    max_size: usize,
    items: BTreeMap<String, BoardItem>,
}

impl Inventory {
    pub fn new(max_size: usize) -> Self {
        Inventory { max_size, items: BTreeMap::new() }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Cumulated size of the contents.
    pub fn size(&self) -> usize {
        self.items.values().map(|item| item.inventory_space).sum()
    }

    /// Would this item fit right now? Used by the board to decide
    /// between pickup and blocking before it commits to either.
    pub fn can_fit(&self, item: &BoardItem) -> bool {
        item.pickable() && self.size() + item.inventory_space <= self.max_size
    }

    /// Add an item. Fails with NotPickable or NotEnoughSpace; on
    /// success returns the key the item was stored under (which may
    /// carry a uniqueness suffix).
    pub fn add_item(&mut self, mut item: BoardItem) -> Result<String> {
        if !item.pickable() {
            return Err(Error::NotPickable(item.name));
        }
        if item.name.is_empty() || self.items.contains_key(&item.name) {
            item.name = format!("{}_{:016x}", item.name, rand::random::<u64>());
        }
        let used = self.size();
        if used + item.inventory_space > self.max_size {
            return Err(Error::NotEnoughSpace {
                max: self.max_size,
                used,
                needed: item.inventory_space,
            });
        }
        let key = item.name.clone();
        self.items.insert(key.clone(), item);
        Ok(key)
    }

    pub fn empty(&mut self) {
        self.items.clear();
    }

    /// Cumulated value of items that carry one.
    pub fn value(&self) -> i64 {
        self.items.values().filter_map(|item| item.value).sum()
    }

    pub fn items_name(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    /// All items whose key contains the query.
    pub fn search(&self, query: &str) -> Vec<&BoardItem> {
        self.items
            .iter()
            .filter(|(key, _)| key.contains(query))
            .map(|(_, item)| item)
            .collect()
    }

    pub fn get_item(&self, name: &str) -> Result<&BoardItem> {
        self.items
            .get(name)
            .ok_or_else(|| Error::NoItemByThatName(name.to_string()))
    }

    pub fn delete_item(&mut self, name: &str) -> Result<BoardItem> {
        self.items
            .remove(name)
            .ok_or_else(|| Error::NoItemByThatName(name.to_string()))
    }
}
