//! Application state structures and the main `DesignerApp`.
//!
//! The app owns exactly one [`DiagramSession`] per run plus the UI-side
//! state that does not belong in the engine: the interaction controller,
//! autosave scheduler, source catalog, context menu and file-dialog
//! plumbing.

use crate::interaction::InteractionController;
use crate::persistence::Autosave;
use crate::session::DiagramSession;
use crate::types::{ConnectionId, ItemId, SourceRecord};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Global connector shape for the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorShape {
    /// Obstacle-aware orthogonal elbows (default)
    Orthogonal,
    /// Cubic Bézier sweeps between centers
    Curved,
}

/// State for the right-click context menu.
#[derive(Debug, Default)]
pub struct ContextMenuState {
    /// Whether the menu is currently visible
    pub show: bool,
    /// Screen position where the menu should appear
    pub screen_pos: (f32, f32),
    /// Canvas position where new items should be created
    pub canvas_pos: (f32, f32),
    /// Guard so the opening click does not immediately close the menu
    pub just_opened: bool,
}

/// A pending file operation kicked off from the toolbar.
#[derive(Debug)]
pub enum PendingFileOperation {
    /// Export the document through a save dialog
    Export,
    /// Import a document through an open dialog
    Import,
}

/// Results sent back from async file dialogs to the UI thread.
#[derive(Debug)]
pub enum FileOperationResult {
    /// Export finished, with the chosen path
    ExportCompleted(String),
    /// Import finished, with the path and raw file content
    ImportCompleted(String, String),
    /// Dialog or I/O failure with a message
    OperationFailed(String),
}

/// File-dialog plumbing: a tokio runtime for the async dialogs and an mpsc
/// channel funneling results back into the frame loop.
pub struct FileState {
    /// Queued operation, taken at the start of the next frame
    pub pending: Option<PendingFileOperation>,
    /// Sender cloned into spawned dialog tasks
    pub sender: Sender<FileOperationResult>,
    /// Receiver drained each frame
    pub receiver: Receiver<FileOperationResult>,
    /// Runtime driving the async dialogs
    pub runtime: tokio::runtime::Runtime,
    /// Last export/import path, shown in the toolbar tooltip
    pub last_path: Option<String>,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            pending: None,
            sender,
            receiver,
            runtime: tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("tokio runtime"),
            last_path: None,
        }
    }
}

/// The main application.
pub struct DesignerApp {
    /// The diagram session for the active page
    pub session: DiagramSession,
    /// Interaction state machine
    pub controller: InteractionController,
    /// Debounced autosave scheduler
    pub autosave: Autosave,
    /// The inert source catalog supplied by the records panel
    pub sources: Vec<SourceRecord>,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Whether the background grid is drawn
    pub show_grid: bool,
    /// Global connector shape for the page
    pub connector_shape: ConnectorShape,
    /// Context menu state
    pub context_menu: ContextMenuState,
    /// File dialog state
    pub file: FileState,
    /// Item whose scratch editors below are currently loaded, if any
    pub editing_item: Option<ItemId>,
    /// Scratch buffer for the name editor
    pub temp_item_name: String,
    /// Scratch buffer for the color editor
    pub temp_item_color: String,
    /// Scratch buffer for the text-label editor
    pub temp_label_text: String,
    /// Connection whose scratch editors are currently loaded, if any
    pub inspected_connection: Option<ConnectionId>,
    /// Scratch buffer for the connection color editor
    pub temp_connection_color: String,
    /// Set once the view has been centered on the first frame
    pub view_initialized: bool,
    /// Set when restore found a corrupt autosave that must be discarded on
    /// the next frame (creation-time storage is read-only)
    pub discard_corrupt_autosave: bool,
    /// One-shot flag: zoom-to-fit runs inside the next canvas frame, where
    /// the viewport rectangle is known
    pub fit_requested: bool,
    /// Last window title pushed to the viewport, to avoid resending
    pub last_title: String,
}

impl Default for DesignerApp {
    fn default() -> Self {
        Self {
            session: DiagramSession::new(),
            controller: InteractionController::new(),
            autosave: Autosave::default(),
            sources: default_source_catalog(),
            dark_mode: true,
            show_grid: true,
            connector_shape: ConnectorShape::Orthogonal,
            context_menu: ContextMenuState::default(),
            file: FileState::default(),
            editing_item: None,
            temp_item_name: String::new(),
            temp_item_color: String::new(),
            temp_label_text: String::new(),
            inspected_connection: None,
            temp_connection_color: String::new(),
            view_initialized: false,
            discard_corrupt_autosave: false,
            fit_requested: false,
            last_title: String::new(),
        }
    }
}

/// Starter catalog shown in the sources panel until a real records list is
/// imported with a document.
fn default_source_catalog() -> Vec<SourceRecord> {
    vec![
        SourceRecord {
            name: "Orders DB".into(),
            kind: "PostgreSQL".into(),
            server: "db-prod-1".into(),
            environment: "prod".into(),
            status: "active".into(),
            purpose: "Transactional order data".into(),
            icon: "🗄".into(),
            color: None,
        },
        SourceRecord {
            name: "Clickstream".into(),
            kind: "Kafka".into(),
            server: "kafka-prod".into(),
            environment: "prod".into(),
            status: "active".into(),
            purpose: "Web event firehose".into(),
            icon: "📡".into(),
            color: None,
        },
        SourceRecord {
            name: "Finance Exports".into(),
            kind: "SFTP".into(),
            server: "sftp.internal".into(),
            environment: "prod".into(),
            status: "active".into(),
            purpose: "Nightly CSV drops".into(),
            icon: "📁".into(),
            color: None,
        },
    ]
}

impl DesignerApp {
    /// Theme name persisted into documents.
    pub fn theme_name(&self) -> &'static str {
        if self.dark_mode {
            "dark"
        } else {
            "light"
        }
    }

    /// Clears transient editing state, e.g. after selection changes.
    pub fn clear_temp_editing_values(&mut self) {
        self.editing_item = None;
        self.temp_item_name.clear();
        self.temp_item_color.clear();
        self.temp_label_text.clear();
        self.inspected_connection = None;
        self.temp_connection_color.clear();
    }
}
