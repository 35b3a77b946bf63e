//! # Archboard
//!
//! A visual designer for data-platform architectures: typed items (data
//! sources, medallion zones, consumption targets, containers, text and
//! images) placed on an infinite pannable/zoomable canvas and linked with
//! directional, obstacle-aware connectors.
//!
//! ## Features
//! - Interactive item placement, multi-selection and drag-move
//! - Orthogonal and curved connector routing that re-routes live
//! - Two-click and manual-anchor connection gestures
//! - Snapshot undo/redo over the full diagram state
//! - Debounced autosave with corrupt-record recovery
//! - Built-in architecture templates (medallion, lakehouse, streaming)

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod constants;
mod error;
pub mod geometry;
mod history;
mod interaction;
pub mod notify;
pub mod persistence;
mod registry;
mod session;
mod templates;
mod types;
mod ui;
mod view;

pub use error::{ConnectionError, DocumentError, HistoryError};
pub use history::{DiagramSnapshot, HistoryManager};
pub use interaction::{
    DragContext, InputModifiers, InteractionController, MarqueeContext, Mode, ResizeContext,
    ResizeHandle,
};
pub use registry::{ConnectionRegistry, ItemRegistry, SanitizeReport};
pub use session::DiagramSession;
pub use templates::{all_templates, expand, TemplateInfo, TemplateKind};
pub use types::*;
pub use view::ViewTransform;

use ui::DesignerApp;

/// Runs the designer application with default settings.
///
/// Initializes the egui window and starts the main event loop. Returns an
/// `eframe::Error` if window creation fails.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), eframe::Error> {
///     archboard::run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Archboard",
        options,
        Box::new(|cc| Ok(Box::new(DesignerApp::new(cc)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_default_is_empty() {
        let session = DiagramSession::new();
        assert!(session.items.is_empty());
        assert!(session.connections.is_empty());
        assert!(!session.history.can_undo());
    }

    #[test]
    fn public_api_round_trips_a_template() {
        let mut session = DiagramSession::new();
        expand(&mut session, TemplateKind::MedallionArchitecture);
        let document = persistence::serialize(&mut session, "dark", &[]);

        let mut restored = DiagramSession::new();
        let report = persistence::load_document(&mut restored, &document);
        assert_eq!(report.items_loaded, session.items.len());
        assert_eq!(report.connections_loaded, session.connections.len());
    }
}
