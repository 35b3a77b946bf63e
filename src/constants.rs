//! Shared application-wide constants.
//! Centralizes tweakable values used across routing, interaction and rendering.

// Grid/drawing
/// Grid cell size in canvas units.
pub const GRID_SIZE: f32 = 20.0;
/// Number of grid cells between thicker grid lines.
pub const GRID_MAJOR_EVERY: usize = 5;

// Connector routing
/// Distance (in canvas units) a connector runs straight out of an endpoint
/// before its first elbow.
pub const ELBOW_STANDOFF: f32 = 40.0;
/// Extra clearance added when pushing an elbow segment past an obstacle.
pub const OBSTACLE_MARGIN: f32 = 12.0;
/// Maximum obstacle-avoidance passes before the router gives up and keeps
/// the last candidate path.
pub const MAX_AVOIDANCE_PASSES: usize = 8;
/// Two anchored endpoints closer than this on an axis are treated as aligned
/// and connected with a straight segment.
pub const ALIGNMENT_TOLERANCE: f32 = 4.0;
/// Arrowhead edge length at the connector tip, in canvas units.
pub const ARROW_LENGTH: f32 = 12.0;
/// Arrowhead edge length for the mid-path flow marker.
pub const MID_ARROW_LENGTH: f32 = 8.0;

// Canvas interactions
/// Hit-test threshold in canvas units for clicking connectors.
pub const CLICK_THRESHOLD: f32 = 10.0;
/// Minimum width/height a resizable item can be shrunk to.
pub const MIN_ITEM_SIZE: f32 = 40.0;
/// Side length of the square resize handles, in screen pixels.
pub const RESIZE_HANDLE_SIZE: f32 = 9.0;

// View transform
/// Smallest permitted zoom factor.
pub const MIN_ZOOM: f32 = 0.25;
/// Largest permitted zoom factor.
pub const MAX_ZOOM: f32 = 3.0;
/// Padding (in canvas units) kept around content by zoom-to-fit.
pub const FIT_PADDING: f32 = 60.0;

// Undo/redo
/// Maximum number of history snapshots to retain.
pub const MAX_HISTORY_DEPTH: usize = 50;

// Persistence
/// Quiet period after the last mutation before an autosave fires, in seconds.
pub const AUTOSAVE_QUIET_SECS: f32 = 2.0;
/// Storage key under which the diagram document is autosaved.
pub const AUTOSAVE_KEY: &str = "archboard_document";
/// Version stamp written into persisted documents.
pub const DOCUMENT_VERSION: &str = "2";

// Notifications
/// Seconds a toast stays on screen before expiring.
pub const TOAST_SECS: f32 = 4.0;
