//! Core data types for the diagram engine.
//!
//! This module defines the fundamental structures used throughout the
//! application: diagram items, connections, anchors, item metadata, and the
//! inert source-catalog records supplied by the records panel.

use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

/// Unique identifier for diagram items.
pub type ItemId = Uuid;

/// Unique identifier for connections.
pub type ConnectionId = Uuid;

/// Medallion lakehouse zone roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MedallionZone {
    /// Raw landing zone
    Bronze,
    /// Cleaned/conformed zone
    Silver,
    /// Modeled/curated zone
    Gold,
}

impl MedallionZone {
    /// Display label used on the canvas and in panels.
    pub fn label(&self) -> &'static str {
        match self {
            MedallionZone::Bronze => "Bronze",
            MedallionZone::Silver => "Silver",
            MedallionZone::Gold => "Gold",
        }
    }

    /// Well-known alias id used by older persisted documents to reference
    /// the singleton zone item, e.g. `bronze-zone`.
    pub fn alias(&self) -> &'static str {
        match self {
            MedallionZone::Bronze => "bronze-zone",
            MedallionZone::Silver => "silver-zone",
            MedallionZone::Gold => "gold-zone",
        }
    }

    /// Parses a well-known alias back into a zone.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "bronze-zone" => Some(MedallionZone::Bronze),
            "silver-zone" => Some(MedallionZone::Silver),
            "gold-zone" => Some(MedallionZone::Gold),
            _ => None,
        }
    }
}

/// The kind of a placed diagram item, including kind-specific payload.
///
/// The kind determines the rendering template and the default size; the
/// payload carries the fields only that kind needs (text content, image
/// source, zone role).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ItemKind {
    /// A named external data source (database, API, file drop, ...)
    DataSource,
    /// A consumption target (dashboard, report, ML model, export)
    Consumption,
    /// A resizable grouping container other items can reference
    Container,
    /// A fixed-role medallion zone item, a common connection target
    Medallion {
        /// Which lakehouse zone this item represents
        zone: MedallionZone,
    },
    /// Free-form resizable text
    TextLabel {
        /// The text content rendered on the canvas
        text: String,
        /// Font size in canvas units
        font_size: f32,
    },
    /// An embedded image, stored by source reference (path or data URI)
    Image {
        /// Image source reference
        source: String,
    },
    /// A generic typed processing node (ingest, transform, orchestrate, ...)
    TypedNode {
        /// Free-form category tag, e.g. "ingest" or "transform"
        category: String,
    },
}

impl ItemKind {
    /// Default size for a freshly placed item of this kind, in canvas units.
    pub fn default_size(&self) -> (f32, f32) {
        match self {
            ItemKind::DataSource => (120.0, 70.0),
            ItemKind::Consumption => (120.0, 70.0),
            ItemKind::Container => (320.0, 220.0),
            ItemKind::Medallion { .. } => (160.0, 90.0),
            ItemKind::TextLabel { .. } => (140.0, 40.0),
            ItemKind::Image { .. } => (160.0, 120.0),
            ItemKind::TypedNode { .. } => (120.0, 70.0),
        }
    }

    /// Whether the user may drag resize handles on items of this kind.
    pub fn resizable(&self) -> bool {
        matches!(
            self,
            ItemKind::Container | ItemKind::TextLabel { .. } | ItemKind::Image { .. }
        )
    }

    /// Containers are exempt from grid snapping so they can be nudged freely
    /// around the items they enclose.
    pub fn snap_exempt(&self) -> bool {
        matches!(self, ItemKind::Container)
    }

    /// Default display name stamped into fresh metadata.
    pub fn default_name(&self) -> String {
        match self {
            ItemKind::DataSource => "Data Source".to_string(),
            ItemKind::Consumption => "Consumer".to_string(),
            ItemKind::Container => "Container".to_string(),
            ItemKind::Medallion { zone } => format!("{} Zone", zone.label()),
            ItemKind::TextLabel { .. } => "Text".to_string(),
            ItemKind::Image { .. } => "Image".to_string(),
            ItemKind::TypedNode { category } => category.clone(),
        }
    }
}

/// Free-form descriptive record owned exclusively by its item.
///
/// No other component mutates this directly; panels edit it through the
/// session so history snapshots stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ItemMetadata {
    /// User-displayable name
    pub name: String,
    /// Type label shown under the name (e.g. "PostgreSQL", "Power BI")
    pub type_label: String,
    /// Icon reference (emoji or named glyph)
    pub icon: String,
    /// Optional fill color override as a hex string, e.g. `#2d6a4f`
    pub color: Option<String>,
    /// When set, the item ignores drag-move and resize gestures
    pub locked: bool,
    /// Business/technical annotations keyed by field name
    pub annotations: Map<String, serde_json::Value>,
}

/// A single placed item on the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramItem {
    /// Stable unique identifier, the join key for connections
    pub id: ItemId,
    /// Kind tag plus kind-specific payload
    pub kind: ItemKind,
    /// Position of the item center in canvas space
    pub position: (f32, f32),
    /// Width and height in canvas units
    pub size: (f32, f32),
    /// Descriptive record owned by this item
    pub metadata: ItemMetadata,
    /// Optional back-reference to an enclosing container item.
    /// Grouping only; not a rendering parent.
    #[serde(default)]
    pub container: Option<ItemId>,
}

impl DiagramItem {
    /// Creates a new item with a fresh id and kind defaults, applying the
    /// given metadata overrides on top of the kind's template.
    pub fn new(kind: ItemKind, position: (f32, f32), overrides: ItemMetadata) -> Self {
        let size = kind.default_size();
        let mut metadata = ItemMetadata {
            name: kind.default_name(),
            ..ItemMetadata::default()
        };
        if !overrides.name.is_empty() {
            metadata.name = overrides.name;
        }
        if !overrides.type_label.is_empty() {
            metadata.type_label = overrides.type_label;
        }
        if !overrides.icon.is_empty() {
            metadata.icon = overrides.icon;
        }
        if overrides.color.is_some() {
            metadata.color = overrides.color;
        }
        metadata.locked = overrides.locked;
        metadata.annotations = overrides.annotations;

        Self {
            id: Uuid::new_v4(),
            kind,
            position,
            size,
            metadata,
            container: None,
        }
    }

    /// The item's axis-aligned bounding rectangle in canvas space.
    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_center_size(
            egui::pos2(self.position.0, self.position.1),
            egui::vec2(self.size.0, self.size.1),
        )
    }
}

/// One of the four edge-midpoint anchors of an item's bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    /// Top edge midpoint
    Top,
    /// Right edge midpoint
    Right,
    /// Bottom edge midpoint
    Bottom,
    /// Left edge midpoint
    Left,
}

impl Anchor {
    /// Whether this anchor points along the horizontal axis.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Anchor::Left | Anchor::Right)
    }

    /// All four anchors in rendering order.
    pub const ALL: [Anchor; 4] = [Anchor::Top, Anchor::Right, Anchor::Bottom, Anchor::Left];
}

/// A directed visual edge between two items.
///
/// Rendered with an arrowhead at the `to` end. When the anchors are absent
/// the router connects rectangle centers and picks its own elbow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Stable unique identifier
    pub id: ConnectionId,
    /// Source item id
    pub from: ItemId,
    /// Destination item id (arrowhead end)
    pub to: ItemId,
    /// Explicit source-side anchor, if the user picked one
    #[serde(default)]
    pub anchor_from: Option<Anchor>,
    /// Explicit destination-side anchor, if the user picked one
    #[serde(default)]
    pub anchor_to: Option<Anchor>,
    /// Optional per-connection color override as a hex string
    #[serde(default)]
    pub color: Option<String>,
}

impl Connection {
    /// Creates a new connection with a fresh id.
    pub fn new(from: ItemId, to: ItemId) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            anchor_from: None,
            anchor_to: None,
            color: None,
        }
    }

    /// The exact duplicate-detection tuple used by `sanitize()`.
    pub fn dedup_key(&self) -> (ItemId, ItemId, Option<Anchor>, Option<Anchor>) {
        (self.from, self.to, self.anchor_from, self.anchor_to)
    }
}

/// An inert catalog record supplied by the external records panel.
///
/// The diagram engine reads only `name`, `kind`, `icon` and `color` when
/// stamping a new data-source item; the rest is carried for round-tripping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SourceRecord {
    /// Display name of the source system
    pub name: String,
    /// Technology label, e.g. "PostgreSQL"
    pub kind: String,
    /// Host or endpoint, informational only
    pub server: String,
    /// Environment tag, e.g. "prod"
    pub environment: String,
    /// Free-form status string
    pub status: String,
    /// What this source is for
    pub purpose: String,
    /// Icon reference used when stamping an item
    pub icon: String,
    /// Color override used when stamping an item
    pub color: Option<String>,
}
