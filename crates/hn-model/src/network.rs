//! The network arena.
//!
//! Items live in slots indexed by [`ItemId`]; connection maps store ids,
//! never references. Removed slots stay empty so ids are never reused.

use std::collections::HashMap;
use std::sync::Arc;

use hn_core::{ItemId, ItemKey, UnitTable};
use tracing::debug;

use crate::catalogue::Catalogue;
use crate::error::{ModelError, ModelResult};
use crate::item::{Item, ItemBody, ItemKind};

#[derive(Debug, Clone)]
pub struct Network {
    catalogue: Arc<Catalogue>,
    items: Vec<Option<Item>>,
    by_key: HashMap<ItemKey, ItemId>,
    next_key: i32,
    /// Display units for the whole case.
    pub units: UnitTable,
    /// Global view mask; properties with a display mask outside it are hidden.
    pub view_mask: u32,
}

impl Network {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self {
            catalogue,
            items: Vec::new(),
            by_key: HashMap::new(),
            next_key: 1,
            units: UnitTable::si(),
            view_mask: u32::MAX,
        }
    }

    /// Network backed by the built-in catalogue.
    pub fn with_builtin() -> ModelResult<Self> {
        Ok(Self::new(Arc::new(Catalogue::builtin()?)))
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().flatten()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items().map(Item::id).collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.index() as usize)?.as_mut()
    }

    pub fn item(&self, id: ItemId) -> ModelResult<&Item> {
        self.get(id)
            .ok_or_else(|| ModelError::unknown("item", &id.to_string()))
    }

    pub fn item_mut(&mut self, id: ItemId) -> ModelResult<&mut Item> {
        self.get_mut(id)
            .ok_or_else(|| ModelError::unknown("item", &id.to_string()))
    }

    pub fn find_by_key(&self, key: ItemKey) -> Option<ItemId> {
        self.by_key.get(&key).copied()
    }

    pub fn find_by_name(&self, qualified_name: &str) -> Option<ItemId> {
        self.items()
            .find(|i| i.qualified_name() == qualified_name)
            .map(Item::id)
    }

    /// Look an item up by qualified name, failing with `Unknown`.
    pub fn named(&self, qualified_name: &str) -> ModelResult<ItemId> {
        self.find_by_name(qualified_name)
            .ok_or_else(|| ModelError::unknown("item", qualified_name))
    }

    fn insert(&mut self, type_name: &str, name: &str, key: ItemKey) -> ModelResult<ItemId> {
        if self.by_key.contains_key(&key) {
            return Err(ModelError::invalid(
                name,
                format!("key {} is already in use", key.value()),
            ));
        }
        let next_key = key
            .value()
            .checked_add(1)
            .ok_or_else(|| ModelError::invalid(name, format!("key {} is out of range", key.value())))?;
        let slot = u32::try_from(self.items.len())
            .map_err(|_| ModelError::invalid(name, "network is full"))?;
        let id = ItemId::from_index(slot);
        let mut item = self.catalogue.instantiate(id, type_name)?;
        item.set_name(name)?;
        if self.find_by_name(&item.qualified_name()).is_some() {
            return Err(ModelError::invalid(
                &item.qualified_name(),
                "an item with this name already exists",
            ));
        }
        item.set_key(key);
        item.clear_modified();
        self.next_key = self.next_key.max(next_key);
        self.by_key.insert(key, id);
        debug!(item = %item.qualified_name(), key = key.value(), "item added");
        self.items.push(Some(item));
        Ok(id)
    }

    /// Add an item of any kind with the next free key; it is flagged new.
    pub fn add_item(&mut self, type_name: &str, name: &str) -> ModelResult<ItemId> {
        let key = ItemKey(self.next_key);
        let id = self.insert(type_name, name, key)?;
        if let Some(item) = self.get_mut(id) {
            item.set_new(true);
            item.mark_modified();
        }
        Ok(id)
    }

    /// Add an item under a key read from a case file.
    pub fn insert_with_key(
        &mut self,
        type_name: &str,
        name: &str,
        key: ItemKey,
    ) -> ModelResult<ItemId> {
        if !key.is_assigned() {
            return Err(ModelError::invalid(name, "item key is unassigned"));
        }
        self.insert(type_name, name, key)
    }

    fn add_of_kind(
        &mut self,
        type_name: &str,
        name: &str,
        ok: fn(&Catalogue, &str) -> bool,
        what: &str,
    ) -> ModelResult<ItemId> {
        if !ok(&self.catalogue, type_name) {
            return Err(ModelError::invalid(
                name,
                format!("'{type_name}' is not a {what} type"),
            ));
        }
        self.add_item(type_name, name)
    }

    pub fn add_component(&mut self, type_name: &str, name: &str) -> ModelResult<ItemId> {
        self.add_of_kind(
            type_name,
            name,
            |c, t| c.component_type(t).is_some(),
            "component",
        )
    }

    pub fn add_node(&mut self, type_name: &str, name: &str) -> ModelResult<ItemId> {
        self.add_of_kind(type_name, name, |c, t| c.node_type(t).is_some(), "node")
    }

    pub fn add_signal_line(&mut self, type_name: &str, name: &str) -> ModelResult<ItemId> {
        self.add_of_kind(
            type_name,
            name,
            |c, t| c.signal_line_type(t).is_some(),
            "signal line",
        )
    }

    /// Number of attachments `id` still holds, counted from its own side.
    pub fn attachment_count(&self, id: ItemId) -> ModelResult<usize> {
        let item = self.item(id)?;
        Ok(match item.body() {
            ItemBody::Component(c) => c.attachments().len(),
            ItemBody::Node(n) => n.connected_components.len(),
            ItemBody::SignalLine(s) => {
                usize::from(s.input_end.is_some()) + usize::from(s.output_end.is_some())
            }
        })
    }

    /// Remove a fully disconnected item from the arena.
    pub fn remove_item(&mut self, id: ItemId) -> ModelResult<Item> {
        let count = self.attachment_count(id)?;
        if count > 0 {
            return Err(ModelError::StillConnected {
                item: self.item(id)?.qualified_name(),
                count,
            });
        }
        let item = self
            .items
            .get_mut(id.index() as usize)
            .and_then(Option::take)
            .ok_or_else(|| ModelError::unknown("item", &id.to_string()))?;
        self.by_key.remove(&item.key());
        debug!(item = %item.qualified_name(), "item removed");
        Ok(item)
    }

    pub fn items_of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &Item> {
        self.items().filter(move |i| i.kind() == kind)
    }

    pub fn is_modified(&self) -> bool {
        self.items().any(Item::is_modified)
    }

    pub fn clear_modified(&mut self) {
        for item in self.items.iter_mut().flatten() {
            item.clear_modified();
            item.set_new(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_assigned_in_order() {
        let mut net = Network::with_builtin().unwrap();
        let a = net.add_node("Junction", "N1").unwrap();
        let b = net.add_component("Pipe", "P1").unwrap();
        assert_eq!(net.item(a).unwrap().key(), ItemKey(1));
        assert_eq!(net.item(b).unwrap().key(), ItemKey(2));
        assert!(net.item(b).unwrap().is_new());
        assert_eq!(net.find_by_key(ItemKey(2)), Some(b));
        assert_eq!(net.find_by_name("PIPE.P1"), Some(b));
    }

    #[test]
    fn largest_key_is_rejected() {
        let mut net = Network::with_builtin().unwrap();
        let err = net
            .insert_with_key("Junction", "N1", ItemKey(i32::MAX))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument { .. }));
        assert!(net.is_empty());
        let id = net.insert_with_key("Junction", "N1", ItemKey(i32::MAX - 1)).unwrap();
        assert_eq!(net.item(id).unwrap().key(), ItemKey(i32::MAX - 1));
    }

    #[test]
    fn arena_misses_name_the_lookup() {
        let net = Network::with_builtin().unwrap();
        let err = net.item(ItemId::from_index(3)).unwrap_err();
        assert_eq!(err.to_string(), "item '3' not found");
        let err = net.named("PIPE.P9").unwrap_err();
        assert_eq!(err.to_string(), "item 'PIPE.P9' not found");
    }

    #[test]
    fn kind_checked_add() {
        let mut net = Network::with_builtin().unwrap();
        assert!(matches!(
            net.add_node("Pipe", "X"),
            Err(ModelError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut net = Network::with_builtin().unwrap();
        net.add_node("Junction", "N1").unwrap();
        assert!(net.add_node("Junction", "N1").is_err());
    }

    #[test]
    fn case_keys_advance_the_counter() {
        let mut net = Network::with_builtin().unwrap();
        net.insert_with_key("Junction", "N7", ItemKey(7)).unwrap();
        let next = net.add_node("Junction", "N8").unwrap();
        assert_eq!(net.item(next).unwrap().key(), ItemKey(8));
        assert!(net.insert_with_key("Junction", "X", ItemKey(7)).is_err());
        assert!(net
            .insert_with_key("Junction", "Y", ItemKey::UNASSIGNED)
            .is_err());
    }

    #[test]
    fn removed_slot_is_not_reused() {
        let mut net = Network::with_builtin().unwrap();
        let a = net.add_node("Junction", "N1").unwrap();
        net.remove_item(a).unwrap();
        assert!(net.get(a).is_none());
        let b = net.add_node("Junction", "N2").unwrap();
        assert_ne!(a, b);
        assert_eq!(net.len(), 1);
    }
}
