//! Import/export of the diagram document through native file dialogs.
//!
//! Dialogs run on the file state's tokio runtime; results come back over
//! an mpsc channel and are applied at the start of the next frame. The
//! exported JSON is the same document format the autosave store uses, so a
//! file written here can be restored anywhere.

use super::state::{DesignerApp, FileOperationResult, PendingFileOperation};
use crate::notify::Level;
use crate::persistence;

impl DesignerApp {
    /// Processes completed dialog results and kicks off newly queued
    /// operations. Called once per frame.
    pub fn handle_pending_file_operations(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.file.receiver.try_recv() {
            match result {
                FileOperationResult::ExportCompleted(path) => {
                    self.session
                        .notifications
                        .notify(format!("diagram exported to {path}"), Level::Success);
                    self.file.last_path = Some(path);
                }
                FileOperationResult::ImportCompleted(path, content) => {
                    match persistence::restore(&content) {
                        Ok(document) => {
                            let report = persistence::load_document(&mut self.session, &document);
                            self.dark_mode = document.theme != "light";
                            if !document.sources.is_empty() {
                                self.sources = document.sources.clone();
                            }
                            self.controller.clear_selection();
                            self.clear_temp_editing_values();
                            self.file.last_path = Some(path);
                            self.session.notifications.notify(
                                format!(
                                    "imported {} item(s) and {} connection(s)",
                                    report.items_loaded, report.connections_loaded
                                ),
                                Level::Success,
                            );
                        }
                        Err(err) => {
                            self.session
                                .notifications
                                .notify(format!("import failed: {err}"), Level::Error);
                        }
                    }
                }
                FileOperationResult::OperationFailed(message) => {
                    self.session
                        .notifications
                        .notify(message, Level::Error);
                }
            }
        }

        let Some(pending) = self.file.pending.take() else {
            return;
        };
        match pending {
            PendingFileOperation::Export => self.spawn_export_dialog(ctx),
            PendingFileOperation::Import => self.spawn_import_dialog(ctx),
        }
    }

    /// Queues an export; the dialog opens on the next frame.
    pub fn export_document(&mut self) {
        self.file.pending = Some(PendingFileOperation::Export);
    }

    /// Queues an import; the dialog opens on the next frame.
    pub fn import_document(&mut self) {
        self.file.pending = Some(PendingFileOperation::Import);
    }

    fn spawn_export_dialog(&mut self, ctx: &egui::Context) {
        let theme = self.theme_name();
        let document = persistence::serialize(&mut self.session, theme, &self.sources);
        let payload = match serde_json::to_string_pretty(&document) {
            Ok(payload) => payload,
            Err(err) => {
                self.session
                    .notifications
                    .notify(format!("failed to serialize diagram: {err}"), Level::Error);
                return;
            }
        };
        let sender = self.file.sender.clone();
        let ctx = ctx.clone();
        self.file.runtime.spawn(async move {
            if let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("JSON", &["json"])
                .set_file_name("diagram.json")
                .save_file()
                .await
            {
                let path = handle.path().to_path_buf();
                let result = match std::fs::write(&path, payload) {
                    Ok(()) => FileOperationResult::ExportCompleted(path.display().to_string()),
                    Err(err) => {
                        FileOperationResult::OperationFailed(format!("failed to write file: {err}"))
                    }
                };
                let _ = sender.send(result);
            }
            ctx.request_repaint();
        });
    }

    fn spawn_import_dialog(&mut self, ctx: &egui::Context) {
        let sender = self.file.sender.clone();
        let ctx = ctx.clone();
        self.file.runtime.spawn(async move {
            if let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("JSON", &["json"])
                .pick_file()
                .await
            {
                let path = handle.path().to_path_buf();
                let result = match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        FileOperationResult::ImportCompleted(path.display().to_string(), content)
                    }
                    Err(err) => {
                        FileOperationResult::OperationFailed(format!("failed to read file: {err}"))
                    }
                };
                let _ = sender.send(result);
            }
            ctx.request_repaint();
        });
    }
}
