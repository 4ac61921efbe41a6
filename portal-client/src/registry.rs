//! Item registry
//!
//! Holds the items of one portal, addressable by id and iterable in the
//! order the host listed them, which is the order a renderer should lay
//! them out in.

use std::collections::HashMap;

use portal_protocol::{ApiMessage, ApiValue};
use portal_utils::{PortalError, Result};

use crate::items::PortalItem;

/// Items of one portal, keyed by id, ordered by arrival
#[derive(Default)]
pub struct ItemRegistry {
    items: HashMap<String, PortalItem>,
    order: Vec<String>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct an item from its descriptor message and insert it
    ///
    /// Rejects duplicates; a malformed descriptor leaves the registry
    /// untouched.
    pub fn create(&mut self, message: &ApiMessage) -> Result<&PortalItem> {
        if self.items.contains_key(&message.id) {
            return Err(PortalError::DuplicateItem(message.id.clone()));
        }
        let item = PortalItem::from_message(message)?;
        self.order.push(item.id.clone());
        Ok(self.items.entry(item.id.clone()).or_insert(item))
    }

    /// Route a value update to the addressed item; returns the new value
    pub fn update_value(&mut self, message: &ApiMessage) -> Result<ApiValue> {
        let item = self
            .items
            .get_mut(&message.id)
            .ok_or_else(|| PortalError::ItemNotFound(message.id.clone()))?;
        item.update_value(message)
    }

    /// Route a state update to the addressed item; returns the new
    /// (enabled, visible) pair
    pub fn update_state(&mut self, message: &ApiMessage) -> Result<(bool, bool)> {
        let item = self
            .items
            .get_mut(&message.id)
            .ok_or_else(|| PortalError::ItemNotFound(message.id.clone()))?;
        Ok(item.update_state(message))
    }

    pub fn get(&self, id: &str) -> Option<&PortalItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PortalItem> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Items in host layout order
    pub fn iter(&self) -> impl Iterator<Item = &PortalItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Remove all items, returning their ids in layout order
    pub fn clear(&mut self) -> Vec<String> {
        self.items.clear();
        std::mem::take(&mut self.order)
    }
}
