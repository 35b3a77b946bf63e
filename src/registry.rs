//! Authoritative ordered collections of diagram items and connections.
//!
//! The registries are the single source of truth for "what is on the
//! canvas". Iteration order is creation order, which doubles as z-order and
//! keeps programmatic layout deterministic. The registries are deliberately
//! snapshot-agnostic: callers (the session facade) take history snapshots
//! before mutating, so the same APIs serve non-undoable bulk loads.

use crate::error::ConnectionError;
use crate::types::{
    Anchor, Connection, ConnectionId, DiagramItem, ItemId, ItemKind, ItemMetadata,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered collection of placed items for the active page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemRegistry {
    items: Vec<DiagramItem>,
}

impl ItemRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new item from kind defaults plus metadata overrides and
    /// appends it to the collection.
    ///
    /// Snapshotting is the caller's responsibility; the registry itself
    /// never touches history.
    pub fn create(
        &mut self,
        kind: ItemKind,
        position: (f32, f32),
        overrides: ItemMetadata,
    ) -> &DiagramItem {
        let item = DiagramItem::new(kind, position, overrides);
        self.items.push(item);
        self.items.last().expect("just pushed")
    }

    /// Appends an already-built item, used by deserialization so restored
    /// items pass through the same insertion path as fresh ones.
    pub fn insert(&mut self, item: DiagramItem) -> ItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Removes the item with the given id, returning it if present.
    ///
    /// Cascading connection deletion is coordinated by the session facade;
    /// the registries stay decoupled.
    pub fn remove(&mut self, id: ItemId) -> Option<DiagramItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Looks up an item by id.
    pub fn find(&self, id: ItemId) -> Option<&DiagramItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Looks up an item by id for mutation.
    pub fn find_mut(&mut self, id: ItemId) -> Option<&mut DiagramItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// All items in creation order.
    pub fn all(&self) -> &[DiagramItem] {
        &self.items
    }

    /// Number of items on the canvas.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items are placed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Updates an item's position. Out-of-canvas positions are permitted;
    /// the canvas has no hard boundary.
    pub fn move_to(&mut self, id: ItemId, position: (f32, f32)) -> bool {
        match self.find_mut(id) {
            Some(item) => {
                item.position = position;
                true
            }
            None => false,
        }
    }

    /// Updates an item's size. The no-op guard for fixed-size kinds is the
    /// caller's responsibility.
    pub fn resize(&mut self, id: ItemId, size: (f32, f32)) -> bool {
        match self.find_mut(id) {
            Some(item) => {
                item.size = size;
                true
            }
            None => false,
        }
    }

    /// Replaces the whole collection (history restoration, bulk load).
    pub fn replace_all(&mut self, items: Vec<DiagramItem>) {
        self.items = items;
    }

    /// Drops every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The set of ids currently present, for endpoint validation.
    pub fn id_set(&self) -> HashSet<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }
}

/// Outcome of a [`ConnectionRegistry::sanitize`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Exact-tuple duplicates removed
    pub duplicates_removed: usize,
    /// Connections dropped because an endpoint no longer resolves
    pub dangling_removed: usize,
}

impl SanitizeReport {
    /// Total connections removed by the pass.
    pub fn total_removed(&self) -> usize {
        self.duplicates_removed + self.dangling_removed
    }
}

/// Ordered collection of directed connections for the active page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directed connection `from -> to`.
    ///
    /// Self-connections are rejected with [`ConnectionError::SelfConnection`].
    /// Duplicates are permitted transiently and collapsed by [`Self::sanitize`]
    /// before every persist; creation-time dedup is deliberately not done.
    pub fn create(
        &mut self,
        from: ItemId,
        to: ItemId,
        anchor_from: Option<Anchor>,
        anchor_to: Option<Anchor>,
        color: Option<String>,
    ) -> Result<&Connection, ConnectionError> {
        if from == to {
            return Err(ConnectionError::SelfConnection);
        }
        let mut connection = Connection::new(from, to);
        connection.anchor_from = anchor_from;
        connection.anchor_to = anchor_to;
        connection.color = color;
        self.connections.push(connection);
        Ok(self.connections.last().expect("just pushed"))
    }

    /// Appends an already-built connection (deserialization path).
    /// Self-connections are still rejected.
    pub fn insert(&mut self, connection: Connection) -> Result<ConnectionId, ConnectionError> {
        if connection.from == connection.to {
            return Err(ConnectionError::SelfConnection);
        }
        let id = connection.id;
        self.connections.push(connection);
        Ok(id)
    }

    /// Removes the connection with the given id, returning it if present.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }

    /// Cascade helper: removes every connection referencing the item as
    /// either endpoint. Returns how many were removed.
    pub fn remove_where_endpoint(&mut self, item: ItemId) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| c.from != item && c.to != item);
        before - self.connections.len()
    }

    /// All connections in creation order.
    pub fn all(&self) -> &[Connection] {
        &self.connections
    }

    /// Looks up a connection by id.
    pub fn find(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Looks up a connection by id for mutation.
    pub fn find_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when no connections exist.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Replaces the whole collection (history restoration, bulk load).
    pub fn replace_all(&mut self, connections: Vec<Connection>) {
        self.connections = connections;
    }

    /// Drops every connection.
    pub fn clear(&mut self) {
        self.connections.clear();
    }

    /// Removes exact `(from, to, anchor_from, anchor_to)` duplicates and any
    /// connection whose endpoint no longer resolves against `valid_ids`.
    ///
    /// Intended to run before every persist; the first occurrence of each
    /// tuple survives.
    pub fn sanitize(&mut self, valid_ids: &HashSet<ItemId>) -> SanitizeReport {
        let mut report = SanitizeReport::default();
        let mut seen = HashSet::new();
        self.connections.retain(|c| {
            if !valid_ids.contains(&c.from) || !valid_ids.contains(&c.to) {
                report.dangling_removed += 1;
                return false;
            }
            if !seen.insert(c.dedup_key()) {
                report.duplicates_removed += 1;
                return false;
            }
            true
        });
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MedallionZone;
    use uuid::Uuid;

    fn source_item(items: &mut ItemRegistry, x: f32, y: f32) -> ItemId {
        items
            .create(ItemKind::DataSource, (x, y), ItemMetadata::default())
            .id
    }

    #[test]
    fn create_appends_in_order() {
        let mut items = ItemRegistry::new();
        let a = source_item(&mut items, 0.0, 0.0);
        let b = source_item(&mut items, 100.0, 0.0);
        let ids: Vec<ItemId> = items.all().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn find_and_move() {
        let mut items = ItemRegistry::new();
        let id = source_item(&mut items, 0.0, 0.0);

        assert!(items.move_to(id, (50.0, -20.0)));
        assert_eq!(items.find(id).unwrap().position, (50.0, -20.0));
        assert!(!items.move_to(Uuid::new_v4(), (0.0, 0.0)));
    }

    #[test]
    fn remove_returns_the_item() {
        let mut items = ItemRegistry::new();
        let id = source_item(&mut items, 0.0, 0.0);
        let removed = items.remove(id).expect("item exists");
        assert_eq!(removed.id, id);
        assert!(items.is_empty());
        assert!(items.remove(id).is_none());
    }

    #[test]
    fn self_connection_is_rejected_and_registry_unchanged() {
        let mut connections = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let result = connections.create(id, id, None, None, None);
        assert_eq!(result.unwrap_err(), ConnectionError::SelfConnection);
        assert!(connections.is_empty());
    }

    #[test]
    fn duplicates_are_permitted_until_sanitize() {
        let mut items = ItemRegistry::new();
        let a = source_item(&mut items, 0.0, 0.0);
        let b = source_item(&mut items, 100.0, 0.0);

        let mut connections = ConnectionRegistry::new();
        connections.create(a, b, None, None, None).unwrap();
        connections.create(a, b, None, None, None).unwrap();
        assert_eq!(connections.len(), 2);

        let report = connections.sanitize(&items.id_set());
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(connections.len(), 1);
    }

    #[test]
    fn sanitize_keeps_connections_differing_only_by_anchor() {
        let mut items = ItemRegistry::new();
        let a = source_item(&mut items, 0.0, 0.0);
        let b = source_item(&mut items, 100.0, 0.0);

        let mut connections = ConnectionRegistry::new();
        connections.create(a, b, None, None, None).unwrap();
        connections
            .create(a, b, Some(Anchor::Right), Some(Anchor::Left), None)
            .unwrap();

        let report = connections.sanitize(&items.id_set());
        assert_eq!(report.total_removed(), 0);
        assert_eq!(connections.len(), 2);
    }

    #[test]
    fn sanitize_drops_dangling_endpoints() {
        let mut items = ItemRegistry::new();
        let a = source_item(&mut items, 0.0, 0.0);
        let b = source_item(&mut items, 100.0, 0.0);

        let mut connections = ConnectionRegistry::new();
        connections.create(a, b, None, None, None).unwrap();
        items.remove(b);

        let report = connections.sanitize(&items.id_set());
        assert_eq!(report.dangling_removed, 1);
        assert!(connections.is_empty());
    }

    #[test]
    fn remove_where_endpoint_cascades_both_directions() {
        let mut items = ItemRegistry::new();
        let a = source_item(&mut items, 0.0, 0.0);
        let b = source_item(&mut items, 100.0, 0.0);
        let c = items
            .create(
                ItemKind::Medallion {
                    zone: MedallionZone::Bronze,
                },
                (200.0, 0.0),
                ItemMetadata::default(),
            )
            .id;

        let mut connections = ConnectionRegistry::new();
        connections.create(a, b, None, None, None).unwrap();
        connections.create(b, c, None, None, None).unwrap();
        connections.create(a, c, None, None, None).unwrap();

        let removed = connections.remove_where_endpoint(b);
        assert_eq!(removed, 2);
        assert_eq!(connections.len(), 1);
        assert!(connections
            .all()
            .iter()
            .all(|conn| conn.from != b && conn.to != b));
    }
}
