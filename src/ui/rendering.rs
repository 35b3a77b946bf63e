//! Canvas rendering: grid, items, connections, previews and overlays.
//!
//! Everything is drawn from the session records each frame; connection
//! paths are recomputed on every frame, so connectors re-route live while
//! items are dragged.

use super::state::{ConnectorShape, DesignerApp};
use crate::constants::{ARROW_LENGTH, GRID_MAJOR_EVERY, GRID_SIZE, MID_ARROW_LENGTH, RESIZE_HANDLE_SIZE};
use crate::geometry;
use crate::interaction::Mode;
use crate::types::{Anchor, Connection, DiagramItem, ItemKind, MedallionZone};
use egui::{pos2, vec2, Color32, Pos2, Rect, Stroke, StrokeKind};

/// Parses a `#rrggbb` hex string. Invalid strings fall back to gray so a
/// bad persisted color can never break rendering.
pub fn parse_hex_color(hex: &str) -> Color32 {
    let raw = hex.strip_prefix('#').unwrap_or(hex);
    if raw.len() == 6 {
        if let Ok(value) = u32::from_str_radix(raw, 16) {
            return Color32::from_rgb(
                ((value >> 16) & 0xff) as u8,
                ((value >> 8) & 0xff) as u8,
                (value & 0xff) as u8,
            );
        }
    }
    Color32::GRAY
}

/// Default fill color for an item kind.
fn kind_fill(kind: &ItemKind, dark_mode: bool) -> Color32 {
    match kind {
        ItemKind::DataSource => Color32::from_rgb(82, 132, 94),
        ItemKind::Consumption => Color32::from_rgb(76, 110, 160),
        ItemKind::Container => {
            if dark_mode {
                Color32::from_rgba_unmultiplied(128, 128, 128, 18)
            } else {
                Color32::from_rgba_unmultiplied(90, 90, 90, 14)
            }
        }
        ItemKind::Medallion { zone } => match zone {
            MedallionZone::Bronze => Color32::from_rgb(155, 104, 58),
            MedallionZone::Silver => Color32::from_rgb(136, 140, 148),
            MedallionZone::Gold => Color32::from_rgb(180, 146, 52),
        },
        ItemKind::TextLabel { .. } => Color32::TRANSPARENT,
        ItemKind::Image { .. } => Color32::from_rgb(110, 86, 140),
        ItemKind::TypedNode { .. } => Color32::from_rgb(120, 96, 70),
    }
}

impl DesignerApp {
    /// Renders all diagram elements in layers: grid, containers,
    /// connections, items, previews, then overlays.
    pub fn render_diagram(&self, painter: &egui::Painter, canvas_rect: Rect) {
        if self.show_grid {
            self.draw_grid(painter, canvas_rect);
        }

        // Containers first so they read as background grouping hints.
        for item in self.session.items.all() {
            if matches!(item.kind, ItemKind::Container) {
                self.draw_item(painter, item);
            }
        }

        for connection in self.session.connections.all() {
            self.draw_connection(painter, connection);
        }

        self.draw_pending_previews(painter);

        for item in self.session.items.all() {
            if !matches!(item.kind, ItemKind::Container) {
                self.draw_item(painter, item);
            }
        }

        self.draw_selection_overlays(painter);

        if let Mode::Marquee(context) = self.controller.mode() {
            let rect = self.session.view.rect_to_screen(context.rect());
            let fill = Color32::from_rgba_unmultiplied(100, 150, 255, 40);
            let stroke = Stroke::new(1.5, Color32::from_rgb(100, 150, 255));
            painter.rect_filled(rect, 0.0, fill);
            painter.rect_stroke(rect, 0.0, stroke, StrokeKind::Inside);
        }
    }

    /// Draws a zoom-aware grid with heavier lines every few cells.
    fn draw_grid(&self, painter: &egui::Painter, canvas_rect: Rect) {
        let view = &self.session.view;
        let minor_color = Color32::from_rgba_unmultiplied(128, 128, 128, 28);
        let major_color = Color32::from_rgba_unmultiplied(128, 128, 128, 60);

        let screen_grid = GRID_SIZE * view.zoom;
        if screen_grid < 4.0 {
            // Too dense to be useful at this zoom.
            return;
        }

        let top_left = view.to_canvas(canvas_rect.min);
        let bottom_right = view.to_canvas(canvas_rect.max);

        let start_x = (top_left.x / GRID_SIZE).floor() as i64;
        let end_x = (bottom_right.x / GRID_SIZE).ceil() as i64;
        for index in start_x..=end_x {
            let x = view.to_screen(pos2(index as f32 * GRID_SIZE, 0.0)).x;
            let color = if index.rem_euclid(GRID_MAJOR_EVERY as i64) == 0 {
                major_color
            } else {
                minor_color
            };
            painter.line_segment(
                [pos2(x, canvas_rect.min.y), pos2(x, canvas_rect.max.y)],
                Stroke::new(1.0, color),
            );
        }

        let start_y = (top_left.y / GRID_SIZE).floor() as i64;
        let end_y = (bottom_right.y / GRID_SIZE).ceil() as i64;
        for index in start_y..=end_y {
            let y = view.to_screen(pos2(0.0, index as f32 * GRID_SIZE)).y;
            let color = if index.rem_euclid(GRID_MAJOR_EVERY as i64) == 0 {
                major_color
            } else {
                minor_color
            };
            painter.line_segment(
                [pos2(canvas_rect.min.x, y), pos2(canvas_rect.max.x, y)],
                Stroke::new(1.0, color),
            );
        }
    }

    /// Draws one item with its kind template, name and badges.
    fn draw_item(&self, painter: &egui::Painter, item: &DiagramItem) {
        let view = &self.session.view;
        let rect = view.rect_to_screen(item.rect());
        let zoom = view.zoom;

        let fill = item
            .metadata
            .color
            .as_deref()
            .map(parse_hex_color)
            .unwrap_or_else(|| kind_fill(&item.kind, self.dark_mode));

        let selected = self.controller.selection().contains(&item.id);
        let pending_source = self.controller.pending_connect_source() == Some(item.id)
            || self
                .controller
                .pending_anchor()
                .is_some_and(|(id, _)| id == item.id);

        let stroke = if pending_source {
            Stroke::new(2.5, Color32::from_rgb(240, 180, 60))
        } else if selected {
            Stroke::new(2.0, Color32::from_rgb(100, 150, 255))
        } else {
            Stroke::new(1.0, Color32::from_gray(if self.dark_mode { 90 } else { 150 }))
        };

        let corner = 6.0 * zoom;
        match &item.kind {
            ItemKind::Container => {
                painter.rect_filled(rect, corner, fill);
                painter.rect_stroke(rect, corner, stroke, StrokeKind::Inside);
                let font = egui::FontId::proportional((12.0 * zoom).clamp(8.0, 24.0));
                painter.text(
                    rect.min + vec2(8.0 * zoom, 6.0 * zoom),
                    egui::Align2::LEFT_TOP,
                    &item.metadata.name,
                    font,
                    self.muted_text_color(),
                );
            }
            ItemKind::TextLabel { text, font_size } => {
                if selected || pending_source {
                    painter.rect_stroke(rect, corner, stroke, StrokeKind::Inside);
                }
                let font = egui::FontId::proportional((font_size * zoom).clamp(6.0, 72.0));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    font,
                    self.text_color(),
                );
            }
            _ => {
                painter.rect_filled(rect, corner, fill);
                painter.rect_stroke(rect, corner, stroke, StrokeKind::Inside);

                let name_font = egui::FontId::proportional((13.0 * zoom).clamp(7.0, 26.0));
                let label_font = egui::FontId::proportional((10.0 * zoom).clamp(6.0, 20.0));
                let icon = if item.metadata.icon.is_empty() {
                    match &item.kind {
                        ItemKind::Image { .. } => "🖼",
                        ItemKind::Consumption => "📊",
                        ItemKind::Medallion { .. } => "🏅",
                        _ => "",
                    }
                } else {
                    item.metadata.icon.as_str()
                };
                let title = if icon.is_empty() {
                    item.metadata.name.clone()
                } else {
                    format!("{icon} {}", item.metadata.name)
                };
                painter.text(
                    rect.center() - vec2(0.0, 7.0 * zoom),
                    egui::Align2::CENTER_CENTER,
                    title,
                    name_font,
                    Color32::WHITE,
                );
                if !item.metadata.type_label.is_empty() {
                    painter.text(
                        rect.center() + vec2(0.0, 10.0 * zoom),
                        egui::Align2::CENTER_CENTER,
                        &item.metadata.type_label,
                        label_font,
                        Color32::from_gray(220),
                    );
                }
            }
        }

        if item.metadata.locked {
            let font = egui::FontId::proportional((10.0 * zoom).clamp(7.0, 18.0));
            painter.text(
                rect.right_top() + vec2(-4.0 * zoom, 3.0 * zoom),
                egui::Align2::RIGHT_TOP,
                "🔒",
                font,
                self.muted_text_color(),
            );
        }
    }

    /// Computes the canvas-space polyline for a connection, honoring the
    /// page connector shape and explicit anchors.
    pub fn connection_path(&self, connection: &Connection) -> Option<Vec<Pos2>> {
        let from = self.session.items.find(connection.from)?;
        let to = self.session.items.find(connection.to)?;

        let path = match (connection.anchor_from, connection.anchor_to) {
            (Some(a), Some(b)) => geometry::anchored_path(from.rect(), a, to.rect(), b),
            _ => match self.connector_shape {
                ConnectorShape::Curved => {
                    let curve = geometry::curved_path(from.rect(), to.rect());
                    (0..=24)
                        .map(|step| geometry::cubic_point(&curve, step as f32 / 24.0))
                        .collect()
                }
                ConnectorShape::Orthogonal => {
                    let obstacles: Vec<Rect> = self
                        .session
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
            },
        };
        Some(path)
    }

    /// Draws one connection: the routed polyline, an arrowhead at the `to`
    /// end and a smaller flow marker at the path midpoint.
    fn draw_connection(&self, painter: &egui::Painter, connection: &Connection) {
        let Some(path) = self.connection_path(connection) else {
            return;
        };
        let view = &self.session.view;
        let screen: Vec<Pos2> = path.iter().map(|p| view.to_screen(*p)).collect();

        let selected = self.controller.selected_connection() == Some(connection.id);
        let color = if selected {
            Color32::from_rgb(100, 150, 255)
        } else {
            connection
                .color
                .as_deref()
                .map(parse_hex_color)
                .unwrap_or_else(|| self.default_connection_color())
        };
        let stroke = Stroke::new(if selected { 3.0 } else { 2.0 }, color);

        for window in screen.windows(2) {
            painter.line_segment([window[0], window[1]], stroke);
        }

        // Arrowhead at the destination, oriented along the final segment.
        let Some(&tip) = path.last() else {
            return;
        };
        let angle = geometry::final_approach_angle(&path);
        let head = geometry::arrowhead(tip, angle, ARROW_LENGTH);
        painter.add(egui::Shape::convex_polygon(
            head.iter().map(|p| view.to_screen(*p)).collect(),
            color,
            Stroke::NONE,
        ));

        // Smaller marker at the midpoint so long connectors show direction
        // mid-line as well.
        if let Some((mid, mid_angle)) = geometry::path_midpoint(&path) {
            let marker = geometry::arrowhead(mid, mid_angle, MID_ARROW_LENGTH);
            painter.add(egui::Shape::convex_polygon(
                marker.iter().map(|p| view.to_screen(*p)).collect(),
                color,
                Stroke::NONE,
            ));
        }
    }

    /// Draws the dashed preview line for a pending manual-anchor
    /// connection and the solid preview for pending connect-mode clicks.
    fn draw_pending_previews(&self, painter: &egui::Painter) {
        let view = &self.session.view;
        let Some(hover) = self.controller.hover_pos() else {
            return;
        };
        let hover_screen = view.to_screen(hover);
        let preview_color = Color32::from_rgb(240, 180, 60);

        if let Some((item_id, anchor)) = self.controller.pending_anchor() {
            if let Some(item) = self.session.items.find(item_id) {
                let start = view.to_screen(geometry::anchor_point(item.rect(), Some(anchor)));
                painter.add(egui::Shape::dashed_line(
                    &[start, hover_screen],
                    Stroke::new(1.5, preview_color),
                    6.0,
                    4.0,
                ));
                painter.circle_filled(hover_screen, 3.5, preview_color);
            }
        }

        if let Some(source_id) = self.controller.pending_connect_source() {
            if let Some(item) = self.session.items.find(source_id) {
                let start = view.to_screen(item.rect().center());
                painter.line_segment([start, hover_screen], Stroke::new(1.5, preview_color));
                painter.circle_filled(hover_screen, 3.5, preview_color);
            }
        }
    }

    /// Draws resize handles on the single selected resizable item and
    /// anchor handles on every item while manual-anchor mode is active.
    fn draw_selection_overlays(&self, painter: &egui::Painter) {
        let view = &self.session.view;

        if self.controller.manual_anchor_mode() {
            for item in self.session.items.all() {
                for anchor in Anchor::ALL {
                    let point =
                        view.to_screen(geometry::anchor_point(item.rect(), Some(anchor)));
                    painter.circle_filled(point, 4.0, Color32::from_rgb(240, 180, 60));
                    painter.circle_stroke(point, 4.0, Stroke::new(1.0, Color32::from_gray(40)));
                }
            }
        }

        if let [selected] = self.controller.selection() {
            if let Some(item) = self.session.items.find(*selected) {
                if item.kind.resizable() && !item.metadata.locked {
                    let rect = view.rect_to_screen(item.rect());
                    let half = RESIZE_HANDLE_SIZE / 2.0;
                    for corner in [
                        rect.min,
                        pos2(rect.max.x, rect.min.y),
                        pos2(rect.min.x, rect.max.y),
                        rect.max,
                    ] {
                        let handle = Rect::from_center_size(corner, vec2(half * 2.0, half * 2.0));
                        painter.rect_filled(handle, 1.0, Color32::from_rgb(100, 150, 255));
                    }
                }
            }
        }
    }

    fn text_color(&self) -> Color32 {
        if self.dark_mode {
            Color32::from_gray(230)
        } else {
            Color32::from_gray(25)
        }
    }

    fn muted_text_color(&self) -> Color32 {
        if self.dark_mode {
            Color32::from_gray(170)
        } else {
            Color32::from_gray(90)
        }
    }

    fn default_connection_color(&self) -> Color32 {
        if self.dark_mode {
            Color32::from_gray(150)
        } else {
            Color32::from_gray(80)
        }
    }
}
