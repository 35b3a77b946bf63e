//! Built-in diagram archetypes that can be expanded onto the canvas.
//!
//! A template is data: an ordered list of item specs plus index-based
//! connection specs. Expansion goes through the normal registry APIs under
//! a single history snapshot, so one undo removes the whole batch.

use crate::notify::Level;
use crate::session::DiagramSession;
use crate::types::{Anchor, ItemId, ItemKind, ItemMetadata, MedallionZone};

/// Kinds of built-in templates available from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Bronze/silver/gold zones with a source and a consumer
    MedallionArchitecture,
    /// Two sources funneled through ingest into a lakehouse and a dashboard
    SourceToLakehouse,
    /// Streaming ingest with a processing stage fanning out to two targets
    StreamingIngest,
}

/// Metadata for a single template.
pub struct TemplateInfo {
    /// Stable identifier for the template
    pub kind: TemplateKind,
    /// Human-friendly display name
    pub name: &'static str,
}

/// Returns all templates with their display names.
pub const fn all_templates() -> &'static [TemplateInfo] {
    const TEMPLATES: &[TemplateInfo] = &[
        TemplateInfo {
            kind: TemplateKind::MedallionArchitecture,
            name: "Medallion Architecture",
        },
        TemplateInfo {
            kind: TemplateKind::SourceToLakehouse,
            name: "Source to Lakehouse",
        },
        TemplateInfo {
            kind: TemplateKind::StreamingIngest,
            name: "Streaming Ingest",
        },
    ];
    TEMPLATES
}

/// One item to create during expansion.
struct ItemSpec {
    kind: ItemKind,
    x: f32,
    y: f32,
    name: &'static str,
    type_label: &'static str,
}

/// One connection to create during expansion, by item index.
struct ConnectionSpec {
    from_index: usize,
    to_index: usize,
    anchors: Option<(Anchor, Anchor)>,
}

struct Template {
    items: Vec<ItemSpec>,
    connections: Vec<ConnectionSpec>,
}

fn spec(kind: ItemKind, x: f32, y: f32, name: &'static str, type_label: &'static str) -> ItemSpec {
    ItemSpec {
        kind,
        x,
        y,
        name,
        type_label,
    }
}

fn link(from_index: usize, to_index: usize) -> ConnectionSpec {
    ConnectionSpec {
        from_index,
        to_index,
        anchors: None,
    }
}

fn build_template(kind: TemplateKind) -> Template {
    match kind {
        TemplateKind::MedallionArchitecture => Template {
            items: vec![
                spec(ItemKind::DataSource, 80.0, 200.0, "Operational DB", "PostgreSQL"),
                spec(
                    ItemKind::Medallion {
                        zone: MedallionZone::Bronze,
                    },
                    320.0,
                    200.0,
                    "Bronze Zone",
                    "Raw",
                ),
                spec(
                    ItemKind::Medallion {
                        zone: MedallionZone::Silver,
                    },
                    560.0,
                    200.0,
                    "Silver Zone",
                    "Cleaned",
                ),
                spec(
                    ItemKind::Medallion {
                        zone: MedallionZone::Gold,
                    },
                    800.0,
                    200.0,
                    "Gold Zone",
                    "Modeled",
                ),
                spec(ItemKind::Consumption, 1040.0, 200.0, "BI Dashboard", "Power BI"),
            ],
            connections: vec![link(0, 1), link(1, 2), link(2, 3), link(3, 4)],
        },
        TemplateKind::SourceToLakehouse => Template {
            items: vec![
                spec(ItemKind::DataSource, 80.0, 120.0, "CRM", "Salesforce"),
                spec(ItemKind::DataSource, 80.0, 300.0, "ERP", "SAP"),
                spec(
                    ItemKind::TypedNode {
                        category: "ingest".to_string(),
                    },
                    320.0,
                    210.0,
                    "Batch Ingest",
                    "Pipeline",
                ),
                spec(
                    ItemKind::Medallion {
                        zone: MedallionZone::Bronze,
                    },
                    560.0,
                    210.0,
                    "Lakehouse Landing",
                    "Raw",
                ),
                spec(ItemKind::Consumption, 800.0, 210.0, "Analytics", "Notebook"),
            ],
            connections: vec![link(0, 2), link(1, 2), link(2, 3), link(3, 4)],
        },
        TemplateKind::StreamingIngest => Template {
            items: vec![
                spec(ItemKind::DataSource, 80.0, 200.0, "Event Stream", "Kafka"),
                spec(
                    ItemKind::TypedNode {
                        category: "transform".to_string(),
                    },
                    320.0,
                    200.0,
                    "Stream Processor",
                    "Flink",
                ),
                spec(ItemKind::Consumption, 560.0, 120.0, "Alerting", "Webhook"),
                spec(ItemKind::Consumption, 560.0, 280.0, "Hot Store", "ClickHouse"),
            ],
            connections: vec![
                ConnectionSpec {
                    from_index: 1,
                    to_index: 2,
                    anchors: Some((Anchor::Right, Anchor::Left)),
                },
                ConnectionSpec {
                    from_index: 1,
                    to_index: 3,
                    anchors: Some((Anchor::Right, Anchor::Left)),
                },
                link(0, 1),
            ],
        },
    }
}

/// Expands a named template onto the canvas.
///
/// Takes exactly one history snapshot for the whole batch, creates the
/// items in order while keeping an index → id map, then wires the
/// connections through the registry. Per-entity failures are tolerated:
/// a bad connection spec is skipped and the rest of the batch completes.
/// A single summary notification reports created vs requested counts.
pub fn expand(session: &mut DiagramSession, kind: TemplateKind) {
    let template = build_template(kind);
    let requested = template.connections.len();

    session.snapshot("load template");
    session.history.suspend();

    let mut index_map: Vec<Option<ItemId>> = Vec::with_capacity(template.items.len());
    for item_spec in &template.items {
        let item = session.items.create(
            item_spec.kind.clone(),
            (item_spec.x, item_spec.y),
            ItemMetadata {
                name: item_spec.name.to_string(),
                type_label: item_spec.type_label.to_string(),
                ..ItemMetadata::default()
            },
        );
        // Sizes come from kind defaults, so geometry is real immediately;
        // the router never sees a zero-size rectangle from a template.
        debug_assert!(item.size.0 > 0.0 && item.size.1 > 0.0);
        index_map.push(Some(item.id));
    }

    let mut created = 0usize;
    for connection in &template.connections {
        let endpoints = (
            index_map.get(connection.from_index).copied().flatten(),
            index_map.get(connection.to_index).copied().flatten(),
        );
        let (Some(from), Some(to)) = endpoints else {
            log::warn!(
                "template connection {} -> {} references a missing item",
                connection.from_index,
                connection.to_index
            );
            continue;
        };
        let (anchor_from, anchor_to) = match connection.anchors {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };
        if session
            .connections
            .create(from, to, anchor_from, anchor_to, None)
            .is_ok()
        {
            created += 1;
        }
    }

    session.history.resume();
    session.mark_changed();

    let level = if created == requested {
        Level::Success
    } else {
        Level::Warning
    };
    session.notifications.notify(
        format!("template loaded: {created}/{requested} connection(s) created"),
        level,
    );
}
