//! Persistence adapter: the diagram document wire format, autosave
//! debouncing and corrupt-data recovery.
//!
//! The persisted document is the only wire format in the system; it must
//! round-trip through serialize → load without loss of visual state
//! (positions, sizes, text, anchors, colors). Restore validates the
//! top-level shape before use and discards corrupt records rather than
//! retrying them.

use crate::constants::{AUTOSAVE_QUIET_SECS, DOCUMENT_VERSION};
use crate::error::DocumentError;
use crate::notify::Level;
use crate::session::DiagramSession;
use crate::types::{
    Anchor, Connection, DiagramItem, ItemId, ItemKind, ItemMetadata, MedallionZone, SourceRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// A point in canvas space as persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PointRecord {
    /// Canvas x
    pub x: f32,
    /// Canvas y
    pub y: f32,
}

/// One persisted item. `type` plus any kind-specific payload fields come
/// from the flattened [`ItemKind`]; `data` carries the metadata record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    /// Item id as an opaque string
    pub id: String,
    /// Kind tag and payload
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Center position
    pub position: PointRecord,
    /// Width in canvas units
    pub width: f32,
    /// Height in canvas units
    pub height: f32,
    /// The item's metadata record
    pub data: ItemMetadata,
    /// Enclosing container id, if grouped
    #[serde(default)]
    pub container: Option<String>,
}

/// One persisted connection. Anchors are optional; `null` means
/// center-to-center routing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connection id as an opaque string
    pub id: String,
    /// Source item id
    pub from_id: String,
    /// Destination item id
    pub to_id: String,
    /// Explicit source anchor, if any
    #[serde(default)]
    pub from_anchor: Option<Anchor>,
    /// Explicit destination anchor, if any
    #[serde(default)]
    pub to_anchor: Option<Anchor>,
    /// Color override, if any
    #[serde(default)]
    pub color: Option<String>,
}

/// Persisted view state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ViewRecord {
    /// Zoom factor
    pub zoom: f32,
    /// Pan offset
    pub pan: PointRecord,
}

impl Default for PointRecord {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// The full persisted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagramDocument {
    /// Format version stamp
    pub version: String,
    /// Active UI theme name ("dark"/"light")
    pub theme: String,
    /// Every placed item, in z-order
    pub items: Vec<ItemRecord>,
    /// Every connection, in creation order
    pub connections: Vec<ConnectionRecord>,
    /// The inert source catalog, carried for round-tripping
    pub sources: Vec<SourceRecord>,
    /// Zoom and pan for the page
    pub view: ViewRecord,
}

impl Default for DiagramDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            theme: "dark".to_string(),
            items: Vec::new(),
            connections: Vec::new(),
            sources: Vec::new(),
            view: ViewRecord {
                zoom: 1.0,
                ..ViewRecord::default()
            },
        }
    }
}

/// Counts reported after a document load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Items recreated
    pub items_loaded: usize,
    /// Items skipped because their record could not be used
    pub items_skipped: usize,
    /// Connections recreated
    pub connections_loaded: usize,
    /// Connections dropped after the repair attempt failed
    pub connections_dropped: usize,
}

/// Serializes the live session into a document.
///
/// Runs a connection sanitize pass first, so duplicates and dangling
/// endpoints never reach the store.
pub fn serialize(
    session: &mut DiagramSession,
    theme: &str,
    sources: &[SourceRecord],
) -> DiagramDocument {
    let report = session.sanitize_connections();
    if report.total_removed() > 0 {
        log::info!(
            "sanitize before save removed {} duplicate and {} dangling connection(s)",
            report.duplicates_removed,
            report.dangling_removed
        );
    }

    let items = session
        .items
        .all()
        .iter()
        .map(|item| ItemRecord {
            id: item.id.to_string(),
            kind: item.kind.clone(),
            position: PointRecord {
                x: item.position.0,
                y: item.position.1,
            },
            width: item.size.0,
            height: item.size.1,
            data: item.metadata.clone(),
            container: item.container.map(|c| c.to_string()),
        })
        .collect();

    let connections = session
        .connections
        .all()
        .iter()
        .map(|connection| ConnectionRecord {
            id: connection.id.to_string(),
            from_id: connection.from.to_string(),
            to_id: connection.to.to_string(),
            from_anchor: connection.anchor_from,
            to_anchor: connection.anchor_to,
            color: connection.color.clone(),
        })
        .collect();

    DiagramDocument {
        version: DOCUMENT_VERSION.to_string(),
        theme: theme.to_string(),
        items,
        connections,
        sources: sources.to_vec(),
        view: ViewRecord {
            zoom: session.view.zoom,
            pan: PointRecord {
                x: session.view.pan.x,
                y: session.view.pan.y,
            },
        },
    }
}

/// Rebuilds the session from a document.
///
/// Clears the current registries, recreates every item through the same
/// insertion path the UI uses, then recreates connections by resolving
/// endpoint ids against the new items. Unresolved endpoints get one repair
/// attempt against the well-known medallion-zone aliases before the
/// connection is dropped with a warning; the rest of the document still
/// loads. One bad record never aborts the batch.
pub fn load_document(session: &mut DiagramSession, document: &DiagramDocument) -> LoadReport {
    let mut report = LoadReport::default();
    session.begin_bulk_load();
    session.items.clear();
    session.connections.clear();
    session.history.clear();

    let mut id_map: HashMap<&str, ItemId> = HashMap::new();
    for record in &document.items {
        if !record.width.is_finite() || !record.height.is_finite() {
            log::warn!("skipping item {} with non-finite size", record.id);
            report.items_skipped += 1;
            continue;
        }
        let id = Uuid::parse_str(&record.id).unwrap_or_else(|_| Uuid::new_v4());
        let item = DiagramItem {
            id,
            kind: record.kind.clone(),
            position: (record.position.x, record.position.y),
            size: (record.width, record.height),
            metadata: record.data.clone(),
            container: None,
        };
        session.items.insert(item);
        id_map.insert(record.id.as_str(), id);
        report.items_loaded += 1;
    }

    // Container references can only be wired once every item exists.
    for record in &document.items {
        let (Some(&child), Some(container_raw)) =
            (id_map.get(record.id.as_str()), record.container.as_deref())
        else {
            continue;
        };
        if let Some(&container) = id_map.get(container_raw) {
            if let Some(item) = session.items.find_mut(child) {
                item.container = Some(container);
            }
        }
    }

    for record in &document.connections {
        let from = resolve_endpoint(session, &id_map, &record.from_id);
        let to = resolve_endpoint(session, &id_map, &record.to_id);
        let (Some(from), Some(to)) = (from, to) else {
            log::warn!(
                "dropping connection {}: endpoint {} -> {} did not resolve",
                record.id,
                record.from_id,
                record.to_id
            );
            report.connections_dropped += 1;
            continue;
        };
        let connection = Connection {
            id: Uuid::parse_str(&record.id).unwrap_or_else(|_| Uuid::new_v4()),
            from,
            to,
            anchor_from: record.from_anchor,
            anchor_to: record.to_anchor,
            color: record.color.clone(),
        };
        match session.connections.insert(connection) {
            Ok(_) => report.connections_loaded += 1,
            Err(err) => {
                log::warn!("dropping connection {}: {err}", record.id);
                report.connections_dropped += 1;
            }
        }
    }

    session.view.set_zoom(document.view.zoom);
    session.view.pan = egui::vec2(document.view.pan.x, document.view.pan.y);
    session.end_bulk_load();

    if report.connections_dropped > 0 || report.items_skipped > 0 {
        session.notifications.notify(
            format!(
                "loaded {} item(s), {} connection(s); skipped {} item(s), dropped {} connection(s)",
                report.items_loaded,
                report.connections_loaded,
                report.items_skipped,
                report.connections_dropped
            ),
            Level::Warning,
        );
    }
    report
}

/// Resolves a persisted endpoint id, falling back to the well-known zone
/// aliases (`bronze-zone`, `silver-zone`, `gold-zone`) used by older
/// documents to reference the singleton medallion items.
fn resolve_endpoint(
    session: &DiagramSession,
    id_map: &HashMap<&str, ItemId>,
    raw: &str,
) -> Option<ItemId> {
    if let Some(&id) = id_map.get(raw) {
        return Some(id);
    }
    let zone = MedallionZone::from_alias(raw)?;
    let mut matches = session.items.all().iter().filter(|item| {
        matches!(&item.kind, ItemKind::Medallion { zone: z } if *z == zone)
    });
    let first = matches.next()?;
    // Only a singleton zone item is an unambiguous repair target.
    if matches.next().is_some() {
        return None;
    }
    Some(first.id)
}

/// Parses and shape-validates a stored document payload.
///
/// The top level must be an object whose `items` and `connections` fields
/// are list-typed; anything else is rejected so a corrupt record is
/// discarded instead of being retried forever.
pub fn restore(raw: &str) -> Result<DiagramDocument, DocumentError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let object = value
        .as_object()
        .ok_or_else(|| DocumentError::InvalidShape("top level is not an object".to_string()))?;
    for field in ["items", "connections"] {
        match object.get(field) {
            Some(serde_json::Value::Array(_)) | None => {}
            Some(other) => {
                return Err(DocumentError::InvalidShape(format!(
                    "`{field}` is {} rather than a list",
                    type_name(other)
                )));
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Debounced write-through scheduler for the durable store.
///
/// Watches the session's revision counter; once mutations go quiet for the
/// configured period, [`Autosave::take_due_payload`] hands the caller a
/// serialized document to write. Skipped while a bulk load is in progress
/// and when the diagram is empty, so an empty canvas can never clobber a
/// prior non-empty save.
#[derive(Debug)]
pub struct Autosave {
    quiet_period_secs: f32,
    last_seen_revision: u64,
    dirty_since: Option<Instant>,
}

impl Default for Autosave {
    fn default() -> Self {
        Self::with_quiet_period(AUTOSAVE_QUIET_SECS)
    }
}

impl Autosave {
    /// Creates a scheduler with a custom quiet period (tests use zero).
    pub fn with_quiet_period(quiet_period_secs: f32) -> Self {
        Self {
            quiet_period_secs,
            last_seen_revision: 0,
            dirty_since: None,
        }
    }

    /// Records session changes; call once per frame.
    pub fn observe(&mut self, session: &DiagramSession) {
        if session.revision() != self.last_seen_revision {
            self.last_seen_revision = session.revision();
            self.dirty_since = Some(Instant::now());
        }
    }

    /// True when there are unsaved changes, settled or not.
    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// Returns the serialized document when a save is due, clearing the
    /// dirty marker. Returns `None` while clean, still settling, loading,
    /// or when the diagram is empty.
    pub fn take_due_payload(
        &mut self,
        session: &mut DiagramSession,
        theme: &str,
        sources: &[SourceRecord],
    ) -> Option<String> {
        let dirty_since = self.dirty_since?;
        if dirty_since.elapsed().as_secs_f32() < self.quiet_period_secs {
            return None;
        }
        if session.is_loading() {
            return None;
        }
        if session.items.is_empty() {
            // Never overwrite a prior non-empty save with nothing.
            self.dirty_since = None;
            return None;
        }
        let document = serialize(session, theme, sources);
        // Sanitizing may bump the revision; fold that into the saved state.
        self.last_seen_revision = session.revision();
        self.dirty_since = None;
        match serde_json::to_string(&document) {
            Ok(payload) => Some(payload),
            Err(err) => {
                log::error!("failed to serialize autosave payload: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemKind, ItemMetadata};
    use egui::pos2;

    fn populated_session() -> DiagramSession {
        let mut session = DiagramSession::new();
        let source = session.add_item(
            ItemKind::DataSource,
            (100.0, 100.0),
            ItemMetadata {
                name: "Orders DB".into(),
                type_label: "PostgreSQL".into(),
                ..ItemMetadata::default()
            },
        );
        let bronze = session.add_item(
            ItemKind::Medallion {
                zone: MedallionZone::Bronze,
            },
            (400.0, 100.0),
            ItemMetadata::default(),
        );
        let label = session.add_item(
            ItemKind::TextLabel {
                text: "landing".into(),
                font_size: 14.0,
            },
            (250.0, 220.0),
            ItemMetadata::default(),
        );
        session.items.resize(label, (200.0, 48.0));
        session.connect(source, bronze, None, None).unwrap();
        session
            .connect(bronze, label, Some(Anchor::Bottom), Some(Anchor::Top))
            .unwrap();
        session
    }

    #[test]
    fn round_trip_preserves_visual_state() {
        let mut session = populated_session();
        session.view.set_zoom(1.5);
        session.view.pan = egui::vec2(42.0, -17.0);
        let document = serialize(&mut session, "dark", &[]);

        let mut restored = DiagramSession::new();
        let report = load_document(&mut restored, &document);
        assert_eq!(report.items_loaded, 3);
        assert_eq!(report.connections_loaded, 2);
        assert_eq!(report.connections_dropped, 0);

        assert_eq!(restored.items.all(), session.items.all());
        assert_eq!(restored.connections.all(), session.connections.all());
        assert_eq!(restored.view.zoom, 1.5);
        assert_eq!(restored.view.pan, egui::vec2(42.0, -17.0));
    }

    #[test]
    fn serialize_collapses_duplicates_first() {
        let mut session = DiagramSession::new();
        let a = session.add_item(ItemKind::DataSource, (0.0, 0.0), ItemMetadata::default());
        let b = session.add_item(ItemKind::Consumption, (200.0, 0.0), ItemMetadata::default());
        session.connect(a, b, None, None).unwrap();
        session.connect(a, b, None, None).unwrap();
        assert_eq!(session.connections.len(), 2);

        let document = serialize(&mut session, "dark", &[]);
        assert_eq!(document.connections.len(), 1);
        assert_eq!(session.connections.len(), 1);
    }

    #[test]
    fn restore_rejects_non_list_items() {
        let raw = r#"{"version":"2","theme":"dark","items":42,"connections":[]}"#;
        let err = restore(raw).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidShape(_)));
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn restore_rejects_non_json() {
        assert!(matches!(
            restore("{not json"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn restore_accepts_minimal_document() {
        let document = restore(r#"{"items":[],"connections":[]}"#).unwrap();
        assert!(document.items.is_empty());
        // Missing fields fall back to the document defaults.
        assert_eq!(document.view.zoom, 1.0);
        assert_eq!(document.theme, "dark");
    }

    #[test]
    fn unresolved_endpoint_is_dropped_but_rest_loads() {
        let mut session = populated_session();
        let mut document = serialize(&mut session, "dark", &[]);
        document.connections.push(ConnectionRecord {
            id: Uuid::new_v4().to_string(),
            from_id: Uuid::new_v4().to_string(),
            to_id: document.items[0].id.clone(),
            from_anchor: None,
            to_anchor: None,
            color: None,
        });

        let mut restored = DiagramSession::new();
        let report = load_document(&mut restored, &document);
        assert_eq!(report.connections_loaded, 2);
        assert_eq!(report.connections_dropped, 1);
        assert_eq!(restored.notifications.len(), 1);
    }

    #[test]
    fn repair_pass_resolves_zone_aliases() {
        let mut session = populated_session();
        let mut document = serialize(&mut session, "dark", &[]);
        // An old-style record pointing at the bronze zone by alias.
        document.connections.push(ConnectionRecord {
            id: Uuid::new_v4().to_string(),
            from_id: document.items[0].id.clone(),
            to_id: "bronze-zone".to_string(),
            from_anchor: None,
            to_anchor: None,
            color: None,
        });

        let mut restored = DiagramSession::new();
        let report = load_document(&mut restored, &document);
        assert_eq!(report.connections_dropped, 0);
        assert_eq!(report.connections_loaded, 3);
    }

    #[test]
    fn self_connection_records_are_dropped() {
        let mut session = populated_session();
        let mut document = serialize(&mut session, "dark", &[]);
        let id = document.items[0].id.clone();
        document.connections.push(ConnectionRecord {
            id: Uuid::new_v4().to_string(),
            from_id: id.clone(),
            to_id: id,
            from_anchor: None,
            to_anchor: None,
            color: None,
        });

        let mut restored = DiagramSession::new();
        let report = load_document(&mut restored, &document);
        assert_eq!(report.connections_dropped, 1);
    }

    #[test]
    fn load_takes_no_history_snapshots_and_blocks_autosave() {
        let mut session = populated_session();
        let document = serialize(&mut session, "dark", &[]);

        let mut restored = DiagramSession::new();
        load_document(&mut restored, &document);
        assert_eq!(restored.history.undo_depth(), 0);
        assert!(!restored.is_loading());
    }

    #[test]
    fn autosave_waits_for_quiet_period_then_fires_once() {
        let mut session = populated_session();
        let mut autosave = Autosave::with_quiet_period(0.0);

        autosave.observe(&session);
        assert!(autosave.is_dirty());
        let payload = autosave
            .take_due_payload(&mut session, "dark", &[])
            .expect("save due");
        assert!(payload.contains("Orders DB"));

        // Nothing further changed, so nothing more to save.
        autosave.observe(&session);
        assert!(autosave.take_due_payload(&mut session, "dark", &[]).is_none());
    }

    #[test]
    fn autosave_skips_empty_diagram() {
        let mut session = DiagramSession::new();
        session.mark_changed();
        let mut autosave = Autosave::with_quiet_period(0.0);
        autosave.observe(&session);
        assert!(autosave.take_due_payload(&mut session, "dark", &[]).is_none());
        assert!(!autosave.is_dirty());
    }

    #[test]
    fn document_json_shape_matches_consumers() {
        let mut session = DiagramSession::new();
        let a = session.add_item(ItemKind::DataSource, (10.0, 20.0), ItemMetadata::default());
        let b = session.add_item(
            ItemKind::Medallion {
                zone: MedallionZone::Gold,
            },
            (200.0, 20.0),
            ItemMetadata::default(),
        );
        session
            .connect(a, b, Some(Anchor::Right), None)
            .unwrap();

        let document = serialize(&mut session, "light", &[]);
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["items"][0]["type"], "data-source");
        assert_eq!(value["items"][0]["position"]["x"], 10.0);
        assert_eq!(value["items"][1]["zone"], "gold");
        assert_eq!(value["connections"][0]["fromAnchor"], "right");
        assert_eq!(value["connections"][0]["toAnchor"], serde_json::Value::Null);
        assert_eq!(value["theme"], "light");
    }

    #[test]
    fn connection_hit_after_document_reload() {
        // Regression guard for the load path wiring endpoints correctly.
        let mut session = populated_session();
        let document = serialize(&mut session, "dark", &[]);
        let mut restored = DiagramSession::new();
        load_document(&mut restored, &document);
        assert!(restored.connection_at(pos2(250.0, 100.0)).is_some());
    }
}
