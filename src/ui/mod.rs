//! User interface shell for the diagram designer.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main `DesignerApp`
//! - `canvas` - Pointer/scroll translation into controller events
//! - `rendering` - Drawing items, connections, grid and overlays
//! - `file_ops` - Native import/export dialogs

mod canvas;
mod file_ops;
mod rendering;
mod state;

#[cfg(test)]
mod tests;

pub use state::{ConnectorShape, DesignerApp};

use crate::constants::{AUTOSAVE_KEY, TOAST_SECS};
use crate::notify::Level;
use crate::persistence;
use crate::templates;
use crate::types::{ItemKind, ItemMetadata, MedallionZone};
use egui::Color32;

impl DesignerApp {
    /// Builds the app, restoring the last autosaved document if one exists.
    ///
    /// A corrupt record is discarded (on the next frame, when the store is
    /// writable) rather than retried, and the session starts empty.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app = Self::default();
        let raw = cc
            .storage
            .and_then(|storage| storage.get_string(AUTOSAVE_KEY))
            .filter(|raw| !raw.is_empty());
        if let Some(raw) = raw {
            match persistence::restore(&raw) {
                Ok(document) => {
                    persistence::load_document(&mut app.session, &document);
                    app.dark_mode = document.theme != "light";
                    if !document.sources.is_empty() {
                        app.sources = document.sources.clone();
                    }
                    // A restored pan is meaningful; skip first-frame centering.
                    app.view_initialized = !app.session.items.is_empty();
                }
                Err(err) => {
                    log::warn!("discarding corrupt autosave: {err}");
                    app.discard_corrupt_autosave = true;
                    app.session
                        .notifications
                        .notify("stored diagram was corrupt and has been discarded", Level::Warning);
                }
            }
        }
        app
    }
}

impl eframe::App for DesignerApp {
    /// Persist the document when eframe flushes (periodically and on exit).
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if self.session.is_loading() || self.session.items.is_empty() {
            return;
        }
        let theme = self.theme_name();
        let document = persistence::serialize(&mut self.session, theme, &self.sources);
        match serde_json::to_string(&document) {
            Ok(payload) => storage.set_string(AUTOSAVE_KEY, payload),
            Err(err) => log::error!("failed to serialize document for save: {err}"),
        }
    }

    /// Main per-frame entry: input handling, panels, canvas and autosave.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        self.handle_pending_file_operations(ctx);
        self.handle_undo_redo_keys(ctx);
        self.handle_delete_key(ctx);
        self.handle_escape_key(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                self.draw_properties_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        if self.context_menu.show {
            self.draw_context_menu(ctx);
        }

        self.draw_toasts(ctx);
        self.update_window_title(ctx);

        // Discard a corrupt autosave exactly once, now that the store is
        // writable.
        if self.discard_corrupt_autosave {
            if let Some(storage) = frame.storage_mut() {
                storage.set_string(AUTOSAVE_KEY, String::new());
            }
            self.discard_corrupt_autosave = false;
        }

        // Debounced autosave of settled changes.
        self.autosave.observe(&self.session);
        let sources = self.sources.clone();
        let theme = self.theme_name();
        if let Some(payload) = self
            .autosave
            .take_due_payload(&mut self.session, theme, &sources)
        {
            if let Some(storage) = frame.storage_mut() {
                storage.set_string(AUTOSAVE_KEY, payload);
                log::debug!("autosaved diagram");
            }
        }
        if self.autosave.is_dirty() {
            // Keep ticking while a save is pending settlement.
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}

impl DesignerApp {
    /// Ctrl+Z undo, Ctrl+Shift+Z / Ctrl+Y redo.
    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Z) && i.modifiers.command && !i.modifiers.shift)
        {
            self.perform_undo();
        } else if ctx.input(|i| {
            (i.key_pressed(egui::Key::Z) && i.modifiers.command && i.modifiers.shift)
                || (i.key_pressed(egui::Key::Y) && i.modifiers.command)
        }) {
            self.perform_redo();
        }
    }

    /// Delete removes the current selection as one undoable batch.
    fn handle_delete_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            self.controller.delete_selected(&mut self.session);
            self.clear_temp_editing_values();
        }
    }

    /// Escape is the uniform abort gesture.
    fn handle_escape_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.controller.escape();
            self.context_menu.show = false;
            self.clear_temp_editing_values();
        }
    }

    /// Performs an undo and refreshes UI selection state.
    pub fn perform_undo(&mut self) {
        if self.session.undo() {
            self.controller.clear_selection();
            self.clear_temp_editing_values();
        }
    }

    /// Performs a redo and refreshes UI selection state.
    pub fn perform_redo(&mut self) {
        if self.session.redo() {
            self.controller.clear_selection();
            self.clear_temp_editing_values();
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                self.session.clear_all();
                self.controller.clear_selection();
                self.clear_temp_editing_values();
            }
            if ui.button("Import…").clicked() {
                self.import_document();
            }
            if ui.button("Export…").clicked() {
                self.export_document();
            }

            ui.menu_button("Templates", |ui| {
                for info in templates::all_templates() {
                    if ui.button(info.name).clicked() {
                        templates::expand(&mut self.session, info.kind);
                        self.fit_requested = true;
                        ui.close();
                    }
                }
            });

            ui.separator();

            let undo_label = self
                .session
                .history
                .next_undo_label()
                .map(|label| format!("Undo {label}"))
                .unwrap_or_else(|| "Undo".to_string());
            if ui
                .add_enabled(self.session.history.can_undo(), egui::Button::new("⟲"))
                .on_hover_text(undo_label)
                .clicked()
            {
                self.perform_undo();
            }
            if ui
                .add_enabled(self.session.history.can_redo(), egui::Button::new("⟳"))
                .on_hover_text("Redo")
                .clicked()
            {
                self.perform_redo();
            }

            ui.separator();

            let mut connect = self.controller.connect_mode();
            if ui
                .toggle_value(&mut connect, "Connect")
                .on_hover_text("Click two items to link them")
                .changed()
            {
                self.controller.toggle_connect_mode();
            }
            let mut anchors = self.controller.manual_anchor_mode();
            if ui
                .toggle_value(&mut anchors, "Anchors")
                .on_hover_text("Click an edge anchor on each item to link specific sides")
                .changed()
            {
                self.controller.toggle_manual_anchor_mode();
            }
            let mut edit = self.controller.edit_mode();
            if ui
                .toggle_value(&mut edit, "Edit")
                .on_hover_text("Click a connection to remove it")
                .changed()
            {
                self.controller.toggle_edit_mode();
            }

            ui.separator();

            ui.toggle_value(&mut self.controller.snap_enabled, "Snap");
            ui.toggle_value(&mut self.show_grid, "Grid");

            egui::ComboBox::from_id_salt("connector_shape")
                .selected_text(match self.connector_shape {
                    ConnectorShape::Orthogonal => "Orthogonal",
                    ConnectorShape::Curved => "Curved",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut self.connector_shape,
                        ConnectorShape::Orthogonal,
                        "Orthogonal",
                    );
                    ui.selectable_value(
                        &mut self.connector_shape,
                        ConnectorShape::Curved,
                        "Curved",
                    );
                });

            if ui.button("Fit").on_hover_text("Zoom to content").clicked() {
                self.fit_requested = true;
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let theme_icon = if self.dark_mode { "☀" } else { "🌙" };
                if ui.button(theme_icon).clicked() {
                    self.dark_mode = !self.dark_mode;
                    self.session.mark_changed();
                }
                ui.label(format!("{:.0}%", self.session.view.zoom * 100.0));
            });
        });
    }

    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        let selection = self.controller.selection().to_vec();
        match selection.as_slice() {
            [] => {
                if let Some(connection_id) = self.controller.selected_connection() {
                    self.draw_connection_properties(ui, connection_id);
                } else {
                    ui.label("Select an item to edit its properties.");
                    ui.label("Right-click the canvas to add items.");
                }
            }
            [single] => {
                self.draw_item_properties(ui, *single);
            }
            many => {
                ui.label(format!("{} items selected", many.len()));
                if ui.button("Delete selection").clicked() {
                    self.controller.delete_selected(&mut self.session);
                }
            }
        }

        ui.separator();
        self.draw_source_catalog(ui);
    }

    fn draw_item_properties(&mut self, ui: &mut egui::Ui, id: crate::types::ItemId) {
        let Some(item) = self.session.items.find(id) else {
            return;
        };
        let kind = item.kind.clone();
        let name = item.metadata.name.clone();
        let color = item.metadata.color.clone().unwrap_or_default();
        let locked = item.metadata.locked;
        let position = item.position;
        let size = item.size;
        let annotations: Vec<(String, String)> = item
            .metadata
            .annotations
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();

        // Load the scratch editors when the inspected item changes.
        if self.editing_item != Some(id) {
            self.editing_item = Some(id);
            self.temp_item_name = name.clone();
            self.temp_item_color = color.clone();
            if let ItemKind::TextLabel { text, .. } = &kind {
                self.temp_label_text = text.clone();
            }
        }

        // Edits commit on focus loss or Enter, teacher-style.
        ui.horizontal(|ui| {
            ui.label("Name:");
            let response = ui.text_edit_singleline(&mut self.temp_item_name);
            if (response.lost_focus() || ui.input(|i| i.key_pressed(egui::Key::Enter)))
                && self.temp_item_name != name
            {
                let new_name = self.temp_item_name.clone();
                self.session.rename_item(id, &new_name);
            }
        });

        ui.label(format!("Kind: {}", kind_label(&kind)));
        ui.label(format!("Position: ({:.0}, {:.0})", position.0, position.1));
        ui.label(format!("Size: {:.0} × {:.0}", size.0, size.1));

        ui.horizontal(|ui| {
            ui.label("Color:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.temp_item_color)
                    .hint_text("#2d6a4f")
                    .desired_width(80.0),
            );
            if response.lost_focus() && self.temp_item_color != color {
                let value = if self.temp_item_color.is_empty() {
                    None
                } else {
                    Some(self.temp_item_color.clone())
                };
                self.session.set_item_color(id, value);
            }
            if !color.is_empty() && ui.small_button("reset").clicked() {
                self.temp_item_color.clear();
                self.session.set_item_color(id, None);
            }
        });

        let mut locked_now = locked;
        if ui.checkbox(&mut locked_now, "Locked").changed() {
            self.session.set_item_locked(id, locked_now);
        }

        if let ItemKind::TextLabel { text, .. } = &kind {
            ui.label("Text:");
            ui.text_edit_multiline(&mut self.temp_label_text);
            if ui.button("Apply text").clicked() && self.temp_label_text != *text {
                let new_text = self.temp_label_text.clone();
                self.session.set_label_text(id, &new_text);
            }
        }

        if !annotations.is_empty() {
            ui.separator();
            ui.label("Annotations:");
            for (key, value) in &annotations {
                ui.horizontal(|ui| {
                    ui.monospace(key);
                    ui.label(value);
                });
            }
        }
    }

    fn draw_connection_properties(&mut self, ui: &mut egui::Ui, id: crate::types::ConnectionId) {
        let Some(connection) = self.session.connections.find(id) else {
            return;
        };
        let color = connection.color.clone().unwrap_or_default();
        let anchors = (connection.anchor_from, connection.anchor_to);

        if self.inspected_connection != Some(id) {
            self.inspected_connection = Some(id);
            self.temp_connection_color = color.clone();
        }

        ui.label("Connection");
        ui.label(match anchors {
            (Some(a), Some(b)) => format!("Anchored: {a:?} → {b:?}"),
            _ => "Routing: automatic (center to center)".to_string(),
        });

        ui.horizontal(|ui| {
            ui.label("Color:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.temp_connection_color)
                    .hint_text("inherit")
                    .desired_width(80.0),
            );
            if response.lost_focus() && self.temp_connection_color != color {
                let value = if self.temp_connection_color.is_empty() {
                    None
                } else {
                    Some(self.temp_connection_color.clone())
                };
                self.session.set_connection_color(id, value);
            }
        });

        if ui.button("Delete connection").clicked() {
            self.session.delete_connection(id);
            self.controller.clear_selection();
        }
    }

    fn draw_source_catalog(&mut self, ui: &mut egui::Ui) {
        ui.heading("Source Catalog");
        ui.label("Registered systems; place one to stamp a data-source item.");
        ui.add_space(4.0);

        let view_center = self
            .session
            .view
            .to_canvas(ui.ctx().screen_rect().center());
        let mut to_place = None;
        for (index, record) in self.sources.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("{} {}", record.icon, record.name));
                ui.weak(&record.kind);
                if ui.small_button("Place").clicked() {
                    to_place = Some(index);
                }
            });
        }
        if let Some(index) = to_place {
            let record = self.sources[index].clone();
            let id = self
                .session
                .place_source(&record, (view_center.x, view_center.y));
            self.controller.select_only(id);
        }
    }

    fn draw_context_menu(&mut self, ctx: &egui::Context) {
        let (sx, sy) = self.context_menu.screen_pos;
        let canvas_pos = self.context_menu.canvas_pos;
        let mut close = false;

        egui::Area::new(egui::Id::new("canvas_context_menu"))
            .fixed_pos(egui::pos2(sx, sy))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::menu(ui.style()).show(ui, |ui| {
                    ui.set_min_width(170.0);
                    let entries: [(&str, ItemKind); 5] = [
                        ("🗄 Data Source", ItemKind::DataSource),
                        ("📊 Consumer", ItemKind::Consumption),
                        (
                            "⚙ Processing Node",
                            ItemKind::TypedNode {
                                category: "transform".to_string(),
                            },
                        ),
                        ("▭ Container", ItemKind::Container),
                        (
                            "🖼 Image",
                            ItemKind::Image {
                                source: String::new(),
                            },
                        ),
                    ];
                    for (label, kind) in entries {
                        if ui.button(label).clicked() {
                            self.create_item_at(kind, canvas_pos);
                            close = true;
                        }
                    }
                    if ui.button("🅰 Text Label").clicked() {
                        self.create_item_at(
                            ItemKind::TextLabel {
                                text: "Text".to_string(),
                                font_size: 14.0,
                            },
                            canvas_pos,
                        );
                        close = true;
                    }
                    ui.menu_button("🏅 Medallion Zone", |ui| {
                        for zone in [
                            MedallionZone::Bronze,
                            MedallionZone::Silver,
                            MedallionZone::Gold,
                        ] {
                            if ui.button(zone.label()).clicked() {
                                self.create_item_at(ItemKind::Medallion { zone }, canvas_pos);
                                close = true;
                                ui.close();
                            }
                        }
                    });
                });
            });

        // Any later click outside the menu dismisses it.
        if self.context_menu.just_opened {
            self.context_menu.just_opened = false;
        } else if ctx.input(|i| i.pointer.any_pressed()) {
            close = true;
        }
        if close {
            self.context_menu.show = false;
        }
    }

    /// Creates an item at a canvas position and selects it.
    pub fn create_item_at(&mut self, kind: ItemKind, canvas_pos: (f32, f32)) {
        let id = self
            .session
            .add_item(kind, canvas_pos, ItemMetadata::default());
        self.controller.select_only(id);
    }

    fn draw_toasts(&mut self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        let notifications: Vec<_> = self
            .session
            .notifications
            .active(TOAST_SECS)
            .cloned()
            .collect();
        if notifications.is_empty() {
            return;
        }
        // Expiry needs repaints even while idle.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));

        egui::Area::new(egui::Id::new("toast_stack"))
            .fixed_pos(screen.left_bottom() + egui::vec2(12.0, -12.0))
            .pivot(egui::Align2::LEFT_BOTTOM)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for notification in &notifications {
                    let color = match notification.level {
                        Level::Info => Color32::from_gray(140),
                        Level::Success => Color32::from_rgb(90, 160, 90),
                        Level::Warning => Color32::from_rgb(200, 150, 60),
                        Level::Error => Color32::from_rgb(200, 80, 80),
                    };
                    egui::Frame::popup(ui.style())
                        .fill(ui.style().visuals.extreme_bg_color)
                        .stroke(egui::Stroke::new(1.0, color))
                        .show(ui, |ui| {
                            ui.colored_label(color, &notification.message);
                        });
                    ui.add_space(4.0);
                }
            });
    }

    fn update_window_title(&mut self, ctx: &egui::Context) {
        let title = if self.autosave.is_dirty() {
            "Archboard — unsaved changes".to_string()
        } else {
            "Archboard".to_string()
        };
        if title != self.last_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.last_title = title;
        }
    }
}

fn kind_label(kind: &ItemKind) -> String {
    match kind {
        ItemKind::DataSource => "Data source".to_string(),
        ItemKind::Consumption => "Consumer".to_string(),
        ItemKind::Container => "Container".to_string(),
        ItemKind::Medallion { zone } => format!("Medallion ({})", zone.label()),
        ItemKind::TextLabel { .. } => "Text label".to_string(),
        ItemKind::Image { .. } => "Image".to_string(),
        ItemKind::TypedNode { category } => format!("Node ({category})"),
    }
}
