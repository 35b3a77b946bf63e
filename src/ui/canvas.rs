//! Canvas input handling: translates raw egui pointer/scroll input into
//! the interaction controller's synthetic event vocabulary.
//!
//! All gesture logic lives in [`crate::interaction`]; this layer only
//! converts screen coordinates to canvas space and decides which events to
//! emit, so it stays thin enough to reason about frame by frame.

use super::state::DesignerApp;
use crate::interaction::InputModifiers;
use egui::{Pos2, Vec2};

impl DesignerApp {
    /// Allocates the canvas painter and runs one frame of input handling
    /// and rendering.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());

        // Center the origin on the very first frame of an empty session so
        // a fresh canvas opens on (0, 0).
        if !self.view_initialized {
            if self.session.view.pan == Vec2::ZERO && self.session.items.is_empty() {
                self.session.view.pan = response.rect.center().to_vec2();
            }
            self.view_initialized = true;
        }

        // Zoom-to-fit runs here because only the canvas knows its viewport.
        if self.fit_requested {
            self.fit_requested = false;
            let rects = self.session.item_rects();
            self.session.view.fit_to_content(&rects, response.rect.size());
            self.session.view.pan += response.rect.min.to_vec2();
        }

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_canvas_pointer(ui, &response);

        self.render_diagram(&painter, response.rect);

        // Right-click opens the creation context menu.
        if response.secondary_clicked() {
            if let Some(screen_pos) = response.interact_pointer_pos() {
                let canvas_pos = self.session.view.to_canvas(screen_pos);
                self.context_menu.screen_pos = (screen_pos.x, screen_pos.y);
                self.context_menu.canvas_pos = (canvas_pos.x, canvas_pos.y);
                self.context_menu.show = true;
                self.context_menu.just_opened = true;
            }
        }
    }

    /// Middle-button (or Cmd/Ctrl + primary) drag pans the view.
    fn handle_canvas_panning(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let should_pan = ui.input(|i| {
            i.pointer.middle_down() || (i.pointer.primary_down() && i.modifiers.command)
        });

        if should_pan {
            if let Some(current) = response.interact_pointer_pos() {
                let panning = matches!(
                    self.controller.mode(),
                    crate::interaction::Mode::Panning { .. }
                );
                if panning {
                    self.controller.pan_moved(&mut self.session, current);
                } else {
                    self.controller.begin_pan(current);
                }
            }
        } else {
            self.controller.end_pan();
        }
    }

    /// Scroll wheel zooms toward the cursor; the canvas point under the
    /// pointer stays visually fixed.
    fn handle_canvas_zoom(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll_delta == 0.0 {
            return;
        }
        let mouse_pos = ui
            .input(|i| i.pointer.hover_pos())
            .or_else(|| response.interact_pointer_pos());
        let Some(mouse_pos) = mouse_pos else {
            return;
        };
        if !response.rect.contains(mouse_pos) {
            return;
        }
        let zoom_delta = if scroll_delta > 0.0 { 0.05 } else { -0.05 };
        self.session.view.zoom_around(mouse_pos, zoom_delta);
    }

    /// Primary-button press/move/release become controller events in
    /// canvas space.
    fn handle_canvas_pointer(&mut self, ui: &egui::Ui, response: &egui::Response) {
        // Cmd/Ctrl + primary is a pan gesture, already handled above.
        if ui.input(|i| i.modifiers.command && i.pointer.primary_down()) {
            return;
        }

        let modifiers = InputModifiers {
            toggle: ui.input(|i| i.modifiers.shift),
        };
        let zoom = self.session.view.zoom;

        let pressed = ui.input(|i| i.pointer.primary_pressed());
        let down = ui.input(|i| i.pointer.primary_down());
        let released = ui.input(|i| i.pointer.primary_released());

        let pointer_screen: Option<Pos2> = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.hover_pos()));

        if let Some(screen) = pointer_screen {
            let canvas = self.session.view.to_canvas(screen);
            if pressed && response.rect.contains(screen) {
                self.clear_temp_editing_values();
                self.controller
                    .pointer_pressed(&mut self.session, canvas, zoom, modifiers);
            } else if down {
                self.controller.pointer_moved(&mut self.session, canvas);
            } else {
                // Hover only: keep preview lines tracking the pointer.
                self.controller.pointer_moved(&mut self.session, canvas);
            }
        }

        if released {
            self.controller.pointer_released(&mut self.session);
        }
    }
}
