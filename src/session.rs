//! The diagram session: one object owning all mutable diagram state for a
//! logical page.
//!
//! The session is constructed once per page and passed by reference to the
//! interaction controller, the persistence adapter and the UI; there is no
//! ambient global state. It coordinates the pieces the registries keep
//! decoupled: history snapshots before mutations, cascade deletion of
//! connections, and the re-entrancy guards around bulk loads.

use crate::error::ConnectionError;
use crate::history::{DiagramSnapshot, HistoryManager};
use crate::notify::{Level, NotificationCenter};
use crate::registry::{ConnectionRegistry, ItemRegistry, SanitizeReport};
use crate::types::{
    Anchor, Connection, ConnectionId, DiagramItem, ItemId, ItemKind, ItemMetadata, SourceRecord,
};
use crate::view::ViewTransform;

/// Owns the item registry, connection registry, history, view transform and
/// notification queue for the active page.
#[derive(Debug, Default)]
pub struct DiagramSession {
    /// Placed items, in z-order
    pub items: ItemRegistry,
    /// Directed connections between items
    pub connections: ConnectionRegistry,
    /// Undo/redo stacks
    pub history: HistoryManager,
    /// Zoom and pan for this page
    pub view: ViewTransform,
    /// Pending user-facing notifications
    pub notifications: NotificationCenter,
    /// Set while a bulk load is rebuilding the registries; mutating entry
    /// points and autosave must check it
    loading: bool,
    /// Monotonic change counter; bumped by every mutating operation so the
    /// autosave debouncer can detect quiet periods
    revision: u64,
}

impl DiagramSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current change counter. Any mutation bumps this.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks the session as changed. High-level operations call this; it is
    /// public so the interaction controller can record in-flight drags.
    pub fn mark_changed(&mut self) {
        self.revision += 1;
    }

    /// True while a document load is rebuilding the registries.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Takes a labeled history snapshot of the current state.
    pub fn snapshot(&mut self, label: &str) {
        self.history
            .snapshot(label, self.items.all(), self.connections.all());
    }

    /// Creates an item, snapshotting first. Returns the new item's id.
    pub fn add_item(
        &mut self,
        kind: ItemKind,
        position: (f32, f32),
        overrides: ItemMetadata,
    ) -> ItemId {
        self.snapshot("add item");
        let id = self.items.create(kind, position, overrides).id;
        self.mark_changed();
        id
    }

    /// Stamps a new data-source item from a catalog record, reading only
    /// the record's name, kind, icon and color.
    pub fn place_source(&mut self, record: &SourceRecord, position: (f32, f32)) -> ItemId {
        self.add_item(
            ItemKind::DataSource,
            position,
            ItemMetadata {
                name: record.name.clone(),
                type_label: record.kind.clone(),
                icon: record.icon.clone(),
                color: record.color.clone(),
                ..ItemMetadata::default()
            },
        )
    }

    /// Deletes the given items and every connection touching them as one
    /// undoable batch. Missing ids are skipped.
    pub fn delete_items(&mut self, ids: &[ItemId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.snapshot("delete items");
        let mut removed = 0;
        for &id in ids {
            if self.items.remove(id).is_some() {
                removed += 1;
                self.connections.remove_where_endpoint(id);
                // Clear dangling container references left by the removal.
                let referencing: Vec<ItemId> = self
                    .items
                    .all()
                    .iter()
                    .filter(|item| item.container == Some(id))
                    .map(|item| item.id)
                    .collect();
                for child in referencing {
                    if let Some(entry) = self.items.find_mut(child) {
                        entry.container = None;
                    }
                }
            }
        }
        if removed > 0 {
            self.mark_changed();
        }
        removed
    }

    /// Creates a connection, snapshotting first. Failures are reported to
    /// the notification queue and leave the registries untouched.
    pub fn connect(
        &mut self,
        from: ItemId,
        to: ItemId,
        anchor_from: Option<Anchor>,
        anchor_to: Option<Anchor>,
    ) -> Result<ConnectionId, ConnectionError> {
        if self.items.find(from).is_none() {
            let err = ConnectionError::MissingEndpoint(from);
            self.notifications.notify(err.to_string(), Level::Warning);
            return Err(err);
        }
        if self.items.find(to).is_none() {
            let err = ConnectionError::MissingEndpoint(to);
            self.notifications.notify(err.to_string(), Level::Warning);
            return Err(err);
        }
        if from == to {
            // Reject before snapshotting so a failed attempt leaves no
            // history entry behind.
            let err = ConnectionError::SelfConnection;
            self.notifications.notify(err.to_string(), Level::Warning);
            return Err(err);
        }
        self.snapshot("create connection");
        match self
            .connections
            .create(from, to, anchor_from, anchor_to, None)
        {
            Ok(connection) => {
                let id = connection.id;
                self.mark_changed();
                Ok(id)
            }
            Err(err) => {
                self.notifications.notify(err.to_string(), Level::Warning);
                Err(err)
            }
        }
    }

    /// Deletes one connection, snapshotting first. Unknown ids are a no-op
    /// and leave history untouched.
    pub fn delete_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.find(id)?;
        self.snapshot("delete connection");
        let removed = self.connections.remove(id);
        if removed.is_some() {
            self.mark_changed();
        }
        removed
    }

    /// Renames an item, snapshotting first. Empty names are kept as-is so
    /// the canvas never shows a nameless node.
    pub fn rename_item(&mut self, id: ItemId, name: &str) {
        if name.is_empty() {
            return;
        }
        self.snapshot("rename item");
        if let Some(item) = self.items.find_mut(id) {
            item.metadata.name = name.to_string();
            self.mark_changed();
        }
    }

    /// Sets or clears an item's fill color override.
    pub fn set_item_color(&mut self, id: ItemId, color: Option<String>) {
        self.snapshot("change color");
        if let Some(item) = self.items.find_mut(id) {
            item.metadata.color = color;
            self.mark_changed();
        }
    }

    /// Toggles an item's lock flag. Locked items ignore drag and resize.
    pub fn set_item_locked(&mut self, id: ItemId, locked: bool) {
        self.snapshot("toggle lock");
        if let Some(item) = self.items.find_mut(id) {
            item.metadata.locked = locked;
            self.mark_changed();
        }
    }

    /// Replaces the text payload of a text-label item.
    pub fn set_label_text(&mut self, id: ItemId, text: &str) {
        self.snapshot("edit text");
        if let Some(item) = self.items.find_mut(id) {
            if let ItemKind::TextLabel { text: current, .. } = &mut item.kind {
                *current = text.to_string();
                self.mark_changed();
            }
        }
    }

    /// Writes one annotation key on an item's metadata record.
    pub fn set_annotation(&mut self, id: ItemId, key: &str, value: serde_json::Value) {
        self.snapshot("edit annotation");
        if let Some(item) = self.items.find_mut(id) {
            item.metadata.annotations.insert(key.to_string(), value);
            self.mark_changed();
        }
    }

    /// Sets or clears a connection's color override.
    pub fn set_connection_color(&mut self, id: ConnectionId, color: Option<String>) {
        self.snapshot("change connection color");
        if let Some(connection) = self.connections.find_mut(id) {
            connection.color = color;
            self.mark_changed();
        }
    }

    /// Removes every item and connection as one undoable action.
    pub fn clear_all(&mut self) {
        if self.items.is_empty() && self.connections.is_empty() {
            return;
        }
        self.snapshot("clear canvas");
        self.items.clear();
        self.connections.clear();
        self.mark_changed();
    }

    /// Restores both registries from a snapshot. Restoration suspends the
    /// history manager so it can never push a new entry re-entrantly.
    fn restore(&mut self, snapshot: DiagramSnapshot) {
        self.history.suspend();
        self.items.replace_all(snapshot.items);
        self.connections.replace_all(snapshot.connections);
        self.history.resume();
        self.mark_changed();
    }

    /// Undoes the most recent action, or reports "nothing to undo".
    pub fn undo(&mut self) -> bool {
        match self
            .history
            .undo(self.items.all(), self.connections.all())
        {
            Ok(snapshot) => {
                self.restore(snapshot);
                true
            }
            Err(err) => {
                self.notifications.notify(err.to_string(), Level::Info);
                false
            }
        }
    }

    /// Redoes the most recently undone action, or reports "nothing to redo".
    pub fn redo(&mut self) -> bool {
        match self
            .history
            .redo(self.items.all(), self.connections.all())
        {
            Ok(snapshot) => {
                self.restore(snapshot);
                true
            }
            Err(err) => {
                self.notifications.notify(err.to_string(), Level::Info);
                false
            }
        }
    }

    /// Runs a connection sanitize pass against the live item set.
    pub fn sanitize_connections(&mut self) -> SanitizeReport {
        let report = self.connections.sanitize(&self.items.id_set());
        if report.total_removed() > 0 {
            self.mark_changed();
        }
        report
    }

    /// Enters bulk-load mode: history snapshotting is suspended and
    /// autosave is held off until [`Self::end_bulk_load`].
    pub fn begin_bulk_load(&mut self) {
        self.loading = true;
        self.history.suspend();
    }

    /// Leaves bulk-load mode.
    pub fn end_bulk_load(&mut self) {
        self.loading = false;
        self.history.resume();
        self.mark_changed();
    }

    /// The canvas-space bounding rectangles of every item, used as the
    /// obstacle set by the router and by zoom-to-fit.
    pub fn item_rects(&self) -> Vec<egui::Rect> {
        self.items.all().iter().map(|item| item.rect()).collect()
    }

    /// The topmost item whose rectangle contains the canvas-space point.
    /// Later-created items win, matching render order.
    pub fn item_at(&self, pos: egui::Pos2) -> Option<&DiagramItem> {
        self.items
            .all()
            .iter()
            .rev()
            .find(|item| item.rect().contains(pos))
    }

    /// The first connection whose routed path passes within the click
    /// threshold of the canvas-space point.
    ///
    /// Hit-testing always uses the orthogonal route; when the page renders
    /// curved connectors the elbow is a close-enough approximation for a
    /// click target.
    pub fn connection_at(&self, pos: egui::Pos2) -> Option<ConnectionId> {
        use crate::constants::CLICK_THRESHOLD;
        use crate::geometry;

        for connection in self.connections.all() {
            let (Some(from), Some(to)) = (
                self.items.find(connection.from),
                self.items.find(connection.to),
            ) else {
                continue;
            };
            let path = match (connection.anchor_from, connection.anchor_to) {
                (Some(a), Some(b)) => geometry::anchored_path(from.rect(), a, to.rect(), b),
                _ => {
                    // Containers are backdrops, not routing obstacles; keep
                    // this filter in sync with the renderer.
                    let obstacles: Vec<egui::Rect> = self
                        .items
                        .all()
                        .iter()
                        .filter(|item| {
                            item.id != connection.from
                                && item.id != connection.to
                                && !matches!(item.kind, ItemKind::Container)
                        })
                        .map(|item| item.rect())
                        .collect();
                    geometry::orthogonal_path(from.rect(), to.rect(), &obstacles)
                }
            };
            if geometry::point_to_path_distance(pos, &path) < CLICK_THRESHOLD {
                return Some(connection.id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn session_with_two_items() -> (DiagramSession, ItemId, ItemId) {
        let mut session = DiagramSession::new();
        let a = session.add_item(ItemKind::DataSource, (100.0, 100.0), ItemMetadata::default());
        let b = session.add_item(ItemKind::Consumption, (400.0, 100.0), ItemMetadata::default());
        (session, a, b)
    }

    #[test]
    fn add_item_snapshots_before_mutation() {
        let mut session = DiagramSession::new();
        session.add_item(ItemKind::DataSource, (0.0, 0.0), ItemMetadata::default());
        assert_eq!(session.history.undo_depth(), 1);
        assert!(session.undo());
        assert!(session.items.is_empty());
    }

    #[test]
    fn undo_then_redo_restores_post_action_state() {
        let (mut session, a, b) = session_with_two_items();
        session.connect(a, b, None, None).unwrap();
        assert_eq!(session.connections.len(), 1);

        assert!(session.undo());
        assert_eq!(session.connections.len(), 0);
        assert_eq!(session.items.len(), 2);

        assert!(session.redo());
        assert_eq!(session.connections.len(), 1);
        let restored = &session.connections.all()[0];
        assert_eq!((restored.from, restored.to), (a, b));
    }

    #[test]
    fn undo_on_empty_history_is_a_noop_notice() {
        let mut session = DiagramSession::new();
        assert!(!session.undo());
        assert_eq!(session.notifications.len(), 1);
        assert!(!session.redo());
        assert_eq!(session.notifications.len(), 2);
    }

    #[test]
    fn restore_does_not_push_history() {
        let (mut session, _, _) = session_with_two_items();
        let depth_before = session.history.undo_depth();
        session.undo();
        // Undo consumed one entry and pushed nothing new.
        assert_eq!(session.history.undo_depth(), depth_before - 1);
    }

    #[test]
    fn delete_items_cascades_connections_in_one_batch() {
        let (mut session, a, b) = session_with_two_items();
        let c = session.add_item(ItemKind::TypedNode { category: "transform".into() }, (250.0, 100.0), ItemMetadata::default());
        session.connect(a, c, None, None).unwrap();
        session.connect(c, b, None, None).unwrap();
        session.connect(a, b, None, None).unwrap();

        let removed = session.delete_items(&[c]);
        assert_eq!(removed, 1);
        assert!(session.items.find(c).is_none());
        assert!(session
            .connections
            .all()
            .iter()
            .all(|conn| conn.from != c && conn.to != c));
        assert_eq!(session.connections.len(), 1);

        // One undo restores the item and both its connections.
        assert!(session.undo());
        assert!(session.items.find(c).is_some());
        assert_eq!(session.connections.len(), 3);
    }

    #[test]
    fn connect_rejects_self_and_missing_endpoints() {
        let (mut session, a, _) = session_with_two_items();
        assert_eq!(
            session.connect(a, a, None, None),
            Err(ConnectionError::SelfConnection)
        );
        let ghost = uuid::Uuid::new_v4();
        assert!(matches!(
            session.connect(a, ghost, None, None),
            Err(ConnectionError::MissingEndpoint(_))
        ));
        assert!(session.connections.is_empty());
        assert_eq!(session.notifications.len(), 2);
    }

    #[test]
    fn place_source_reads_only_stamping_fields() {
        let mut session = DiagramSession::new();
        let record = SourceRecord {
            name: "Orders DB".into(),
            kind: "PostgreSQL".into(),
            server: "db-prod-1".into(),
            environment: "prod".into(),
            icon: "🗄".into(),
            ..SourceRecord::default()
        };
        let id = session.place_source(&record, (10.0, 20.0));
        let item = session.items.find(id).unwrap();
        assert_eq!(item.metadata.name, "Orders DB");
        assert_eq!(item.metadata.type_label, "PostgreSQL");
        assert_eq!(item.metadata.icon, "🗄");
        // Server/environment are collaborator-side details and are not copied.
        assert!(item.metadata.annotations.is_empty());
    }

    #[test]
    fn item_at_prefers_topmost() {
        let mut session = DiagramSession::new();
        let _bottom = session.add_item(ItemKind::Container, (100.0, 100.0), ItemMetadata::default());
        let top = session.add_item(ItemKind::DataSource, (100.0, 100.0), ItemMetadata::default());
        assert_eq!(session.item_at(pos2(100.0, 100.0)).unwrap().id, top);
    }

    #[test]
    fn connection_at_hits_routed_path() {
        let (mut session, a, b) = session_with_two_items();
        let id = session.connect(a, b, None, None).unwrap();
        // Items sit at y=100 with centers 300 apart; the path runs through
        // the horizontal corridor between them.
        assert_eq!(session.connection_at(pos2(250.0, 100.0)), Some(id));
        assert_eq!(session.connection_at(pos2(250.0, 400.0)), None);
    }

    #[test]
    fn bulk_load_suppresses_snapshots() {
        let mut session = DiagramSession::new();
        session.begin_bulk_load();
        session.add_item(ItemKind::DataSource, (0.0, 0.0), ItemMetadata::default());
        session.add_item(ItemKind::DataSource, (50.0, 0.0), ItemMetadata::default());
        session.end_bulk_load();
        assert_eq!(session.history.undo_depth(), 0);
        assert!(!session.is_loading());
    }
}
