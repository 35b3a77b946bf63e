//! Pointer/keyboard interaction as an explicit state machine.
//!
//! The controller owns one current [`Mode`] with a typed context payload
//! per mode, plus three independent boolean toggles (connect mode,
//! manual-anchor mode, edit mode) layered on top. It is driven entirely by
//! synthetic events in canvas space, so the whole gesture vocabulary is
//! testable without a real pointer device; the egui layer is a thin
//! translator from raw input to these calls.
//!
//! Every handler guards against missing item records and no-ops instead of
//! panicking.

use crate::constants::{GRID_SIZE, MIN_ITEM_SIZE, RESIZE_HANDLE_SIZE};
use crate::geometry;
use crate::notify::Level;
use crate::session::DiagramSession;
use crate::types::{Anchor, ConnectionId, ItemId};
use egui::{pos2, Pos2, Rect, Vec2};

/// Which corner handle a resize gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    /// Top-left corner; adjusts position on both axes
    TopLeft,
    /// Top-right corner; adjusts y position
    TopRight,
    /// Bottom-left corner; adjusts x position
    BottomLeft,
    /// Bottom-right corner; pure size change
    BottomRight,
}

/// Context carried while items are being dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct DragContext {
    /// The pressed item whose displacement drives the whole selection
    pub primary: ItemId,
    /// Offset from the pointer to the primary item's center at press time
    pub grab_offset: Vec2,
    /// Set once the pointer actually moved; the pre-drag snapshot is taken
    /// on the first movement so plain clicks never pollute history
    pub moved: bool,
}

/// Context carried while a marquee rectangle is being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeContext {
    /// Canvas-space press position
    pub start: Pos2,
    /// Canvas-space current pointer position
    pub current: Pos2,
    /// Whether the marquee adds to the selection held at press time
    pub additive: bool,
    /// Selection as it was when the marquee started (kept for additive mode)
    pub base_selection: Vec<ItemId>,
}

impl MarqueeContext {
    /// The marquee rectangle in canvas space.
    pub fn rect(&self) -> Rect {
        Rect::from_two_pos(self.start, self.current)
    }
}

/// Context carried while a resize handle is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeContext {
    /// The item being resized
    pub item: ItemId,
    /// Which corner was grabbed
    pub handle: ResizeHandle,
    /// The item's rectangle at gesture start
    pub original: Rect,
}

/// The mutually-exclusive base interaction modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    /// Nothing in flight
    #[default]
    Idle,
    /// Moving the current selection by the primary item's displacement
    DraggingItems(DragContext),
    /// Drawing a selection rectangle over empty canvas
    Marquee(MarqueeContext),
    /// Dragging a corner handle of a resizable item
    Resizing(ResizeContext),
    /// Panning the view; positions here are screen-space
    Panning {
        /// Last screen position seen during the pan
        last_screen: Pos2,
    },
}

/// Modifier keys relevant to canvas gestures.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputModifiers {
    /// Shift/Cmd held: clicks toggle selection membership instead of
    /// replacing the selection
    pub toggle: bool,
}

/// The interaction controller for one diagram session.
#[derive(Debug, Default)]
pub struct InteractionController {
    /// Current base mode
    mode: Mode,
    /// Currently-selected item ids, in selection order
    selection: Vec<ItemId>,
    /// Currently-selected connection, if any
    selected_connection: Option<ConnectionId>,
    /// Two-click connect mode toggle
    connect_mode: bool,
    /// Manual-anchor mode toggle
    manual_anchor_mode: bool,
    /// Edit mode toggle (per-item affordances; connection click deletes)
    edit_mode: bool,
    /// Pending source item recorded by the first connect-mode click
    pending_connect_source: Option<ItemId>,
    /// Pending (item, anchor) recorded by the first manual-anchor click
    pending_anchor: Option<(ItemId, Anchor)>,
    /// Last pointer position in canvas space, for preview lines
    hover_pos: Option<Pos2>,
    /// Whether drag positions snap to the grid
    pub snap_enabled: bool,
}

impl InteractionController {
    /// Creates a controller in the idle state with snapping enabled.
    pub fn new() -> Self {
        Self {
            snap_enabled: true,
            ..Self::default()
        }
    }

    /// The current base mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The current selection, in selection order.
    pub fn selection(&self) -> &[ItemId] {
        &self.selection
    }

    /// The selected connection, if any.
    pub fn selected_connection(&self) -> Option<ConnectionId> {
        self.selected_connection
    }

    /// Whether two-click connect mode is active.
    pub fn connect_mode(&self) -> bool {
        self.connect_mode
    }

    /// Whether manual-anchor mode is active.
    pub fn manual_anchor_mode(&self) -> bool {
        self.manual_anchor_mode
    }

    /// Whether edit mode is active.
    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// The pending connect-mode source, for highlight rendering.
    pub fn pending_connect_source(&self) -> Option<ItemId> {
        self.pending_connect_source
    }

    /// The pending manual anchor, for the dashed preview line.
    pub fn pending_anchor(&self) -> Option<(ItemId, Anchor)> {
        self.pending_anchor
    }

    /// Last known pointer position in canvas space.
    pub fn hover_pos(&self) -> Option<Pos2> {
        self.hover_pos
    }

    /// Flips connect mode. Turning it off drops any pending source.
    pub fn toggle_connect_mode(&mut self) {
        self.connect_mode = !self.connect_mode;
        if !self.connect_mode {
            self.pending_connect_source = None;
        }
    }

    /// Flips manual-anchor mode. Turning it off drops any pending anchor.
    pub fn toggle_manual_anchor_mode(&mut self) {
        self.manual_anchor_mode = !self.manual_anchor_mode;
        if !self.manual_anchor_mode {
            self.pending_anchor = None;
        }
    }

    /// Flips edit mode.
    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
    }

    /// Replaces the selection with a single item.
    pub fn select_only(&mut self, id: ItemId) {
        self.selection.clear();
        self.selection.push(id);
        self.selected_connection = None;
    }

    /// Clears all selection state.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selected_connection = None;
    }

    /// Handles a primary-button press at a canvas-space position.
    pub fn pointer_pressed(
        &mut self,
        session: &mut DiagramSession,
        pos: Pos2,
        zoom: f32,
        modifiers: InputModifiers,
    ) {
        self.hover_pos = Some(pos);
        if self.mode != Mode::Idle {
            return;
        }

        // Connection toggles capture clicks before ordinary selection.
        if self.connect_mode {
            self.connect_click(session, pos);
            return;
        }
        if self.manual_anchor_mode {
            if let Some((item, anchor)) = self.anchor_at(session, pos, zoom) {
                self.anchor_click(session, item, anchor);
            } else if session.item_at(pos).is_none() {
                self.pending_anchor = None;
            }
            return;
        }

        // A resize handle on the single selected resizable item wins over
        // item selection underneath it.
        if let Some(context) = self.resize_hit(session, pos, zoom) {
            session.snapshot("resize item");
            self.mode = Mode::Resizing(context);
            return;
        }

        if let Some(item) = session.item_at(pos) {
            let id = item.id;
            let locked = item.metadata.locked;
            let center = item.rect().center();

            if modifiers.toggle {
                // Toggle membership; never starts a drag.
                if let Some(index) = self.selection.iter().position(|s| *s == id) {
                    self.selection.remove(index);
                } else {
                    self.selection.push(id);
                }
                self.selected_connection = None;
                return;
            }

            if !self.selection.contains(&id) {
                self.select_only(id);
            }
            self.selected_connection = None;

            if !locked {
                self.mode = Mode::DraggingItems(DragContext {
                    primary: id,
                    grab_offset: center - pos,
                    moved: false,
                });
            }
            return;
        }

        if let Some(connection_id) = session.connection_at(pos) {
            if self.edit_mode {
                // Click-to-delete is only available in edit mode.
                session.delete_connection(connection_id);
                session
                    .notifications
                    .notify("connection removed", Level::Success);
                self.selected_connection = None;
            } else {
                self.selected_connection = Some(connection_id);
                self.selection.clear();
            }
            return;
        }

        // Empty canvas: start a marquee. Selection reflects live overlap,
        // so a non-additive marquee clears the old selection immediately.
        let base_selection = if modifiers.toggle {
            self.selection.clone()
        } else {
            self.selection.clear();
            Vec::new()
        };
        self.selected_connection = None;
        self.mode = Mode::Marquee(MarqueeContext {
            start: pos,
            current: pos,
            additive: modifiers.toggle,
            base_selection,
        });
    }

    /// Handles pointer movement at a canvas-space position.
    pub fn pointer_moved(&mut self, session: &mut DiagramSession, pos: Pos2) {
        self.hover_pos = Some(pos);
        match self.mode.clone() {
            Mode::DraggingItems(context) => self.drag_moved(session, pos, context),
            Mode::Marquee(context) => self.marquee_moved(session, pos, context),
            Mode::Resizing(context) => {
                self.apply_resize(session, context.item, context.handle, context.original, pos)
            }
            Mode::Idle | Mode::Panning { .. } => {}
        }
    }

    fn drag_moved(&mut self, session: &mut DiagramSession, pos: Pos2, context: DragContext) {
        let Some(primary) = session.items.find(context.primary) else {
            // The item vanished mid-drag (e.g. a document load); abort
            // rather than panic.
            self.mode = Mode::Idle;
            return;
        };
        let snap = self.snap_enabled && !primary.kind.snap_exempt();
        let current = pos2(primary.position.0, primary.position.1);
        let candidate = geometry::snap_to_grid(pos + context.grab_offset, GRID_SIZE, snap);
        let delta = candidate - current;
        if delta == Vec2::ZERO {
            return;
        }
        if !context.moved {
            // First actual movement: capture the pre-drag arrangement so
            // one undo restores it.
            session.snapshot("move items");
            self.mode = Mode::DraggingItems(DragContext {
                moved: true,
                ..context
            });
        }
        self.apply_drag_delta(session, delta);
    }

    fn marquee_moved(&mut self, session: &DiagramSession, pos: Pos2, mut context: MarqueeContext) {
        context.current = pos;
        let rect = context.rect();

        // Selection reflects current overlap, not accumulated history:
        // items leaving the rectangle are deselected.
        let mut selection = if context.additive {
            context.base_selection.clone()
        } else {
            Vec::new()
        };
        for item in session.items.all() {
            if rect.intersects(item.rect()) && !selection.contains(&item.id) {
                selection.push(item.id);
            }
        }
        self.selection = selection;
        self.mode = Mode::Marquee(context);
    }

    /// Handles primary-button release.
    pub fn pointer_released(&mut self, session: &mut DiagramSession) {
        match &self.mode {
            Mode::DraggingItems(context) => {
                if context.moved {
                    session.mark_changed();
                }
            }
            Mode::Resizing(_) => {
                session.mark_changed();
            }
            _ => {}
        }
        if !matches!(self.mode, Mode::Idle) {
            self.mode = Mode::Idle;
        }
    }

    /// Starts a view pan at a screen-space position.
    pub fn begin_pan(&mut self, screen: Pos2) {
        if self.mode == Mode::Idle {
            self.mode = Mode::Panning {
                last_screen: screen,
            };
        }
    }

    /// Continues a pan; accumulates the screen-space delta into the view.
    pub fn pan_moved(&mut self, session: &mut DiagramSession, screen: Pos2) {
        if let Mode::Panning { last_screen } = &mut self.mode {
            let delta = screen - *last_screen;
            *last_screen = screen;
            session.view.pan_by(delta);
        }
    }

    /// Ends a pan.
    pub fn end_pan(&mut self) {
        if matches!(self.mode, Mode::Panning { .. }) {
            self.mode = Mode::Idle;
        }
    }

    /// The uniform abort gesture: cancels any pending connection, clears
    /// the selection, aborts an in-flight gesture and exits the connect,
    /// manual-anchor and edit toggles.
    pub fn escape(&mut self) {
        self.pending_connect_source = None;
        self.pending_anchor = None;
        self.connect_mode = false;
        self.manual_anchor_mode = false;
        self.edit_mode = false;
        self.clear_selection();
        self.mode = Mode::Idle;
    }

    /// Deletes the current selection (items with cascading connections, or
    /// the selected connection) as one undoable batch.
    pub fn delete_selected(&mut self, session: &mut DiagramSession) {
        if !self.selection.is_empty() {
            let removed = session.delete_items(&self.selection.clone());
            if removed > 0 {
                session
                    .notifications
                    .notify(format!("removed {removed} item(s)"), Level::Success);
            }
            self.selection.clear();
        } else if let Some(id) = self.selected_connection.take() {
            session.delete_connection(id);
            session
                .notifications
                .notify("connection removed", Level::Success);
        }
    }

    /// One click of the two-click connect sequence.
    ///
    /// First click on a connectable item records it as the pending source;
    /// a second click on a different item creates the directed connection;
    /// clicking the pending item again cancels.
    fn connect_click(&mut self, session: &mut DiagramSession, pos: Pos2) {
        let Some(item) = session.item_at(pos) else {
            self.pending_connect_source = None;
            return;
        };
        let id = item.id;
        match self.pending_connect_source {
            None => {
                self.pending_connect_source = Some(id);
            }
            Some(source) if source == id => {
                self.pending_connect_source = None;
            }
            Some(source) => {
                if session.connect(source, id, None, None).is_ok() {
                    session
                        .notifications
                        .notify("connection created", Level::Success);
                }
                self.pending_connect_source = None;
            }
        }
    }

    /// One click of the two-anchor manual sequence.
    pub fn anchor_click(&mut self, session: &mut DiagramSession, item: ItemId, anchor: Anchor) {
        if session.items.find(item).is_none() {
            return;
        }
        match self.pending_anchor {
            None => {
                self.pending_anchor = Some((item, anchor));
            }
            Some((source, _)) if source == item => {
                self.pending_anchor = None;
            }
            Some((source, source_anchor)) => {
                if session
                    .connect(source, item, Some(source_anchor), Some(anchor))
                    .is_ok()
                {
                    session
                        .notifications
                        .notify("connection created", Level::Success);
                }
                self.pending_anchor = None;
            }
        }
    }

    /// Finds an anchor handle under the pointer in manual-anchor mode.
    ///
    /// Anchor handles have a fixed screen size, so the canvas-space hit
    /// radius shrinks as the view zooms in.
    pub fn anchor_at(
        &self,
        session: &DiagramSession,
        pos: Pos2,
        zoom: f32,
    ) -> Option<(ItemId, Anchor)> {
        let radius = RESIZE_HANDLE_SIZE / zoom.max(f32::EPSILON);
        for item in session.items.all().iter().rev() {
            for anchor in Anchor::ALL {
                let point = geometry::anchor_point(item.rect(), Some(anchor));
                if (point - pos).length() <= radius {
                    return Some((item.id, anchor));
                }
            }
        }
        None
    }

    /// Hit-tests the corner resize handles of the single selected
    /// resizable item.
    fn resize_hit(
        &self,
        session: &DiagramSession,
        pos: Pos2,
        zoom: f32,
    ) -> Option<ResizeContext> {
        let [selected] = self.selection.as_slice() else {
            return None;
        };
        let item = session.items.find(*selected)?;
        if !item.kind.resizable() || item.metadata.locked {
            return None;
        }
        let rect = item.rect();
        let radius = RESIZE_HANDLE_SIZE / zoom.max(f32::EPSILON);
        let corners = [
            (rect.min, ResizeHandle::TopLeft),
            (pos2(rect.max.x, rect.min.y), ResizeHandle::TopRight),
            (pos2(rect.min.x, rect.max.y), ResizeHandle::BottomLeft),
            (rect.max, ResizeHandle::BottomRight),
        ];
        for (corner, handle) in corners {
            if (corner - pos).length() <= radius {
                return Some(ResizeContext {
                    item: item.id,
                    handle,
                    original: rect,
                });
            }
        }
        None
    }

    /// Applies the drag delta to every selected item, skipping locked ones.
    fn apply_drag_delta(&self, session: &mut DiagramSession, delta: Vec2) {
        for &id in &self.selection {
            let Some(item) = session.items.find(id) else {
                continue;
            };
            if item.metadata.locked {
                continue;
            }
            let position = (item.position.0 + delta.x, item.position.1 + delta.y);
            session.items.move_to(id, position);
        }
    }

    /// Recomputes an item's rect from the resize gesture, enforcing the
    /// minimum-size floor. Corner handles other than bottom-right also
    /// adjust the item's position so the opposite corner stays put.
    fn apply_resize(
        &self,
        session: &mut DiagramSession,
        item: ItemId,
        handle: ResizeHandle,
        original: Rect,
        pos: Pos2,
    ) {
        let (mut min, mut max) = (original.min, original.max);
        match handle {
            ResizeHandle::TopLeft => min = pos,
            ResizeHandle::TopRight => {
                max.x = pos.x;
                min.y = pos.y;
            }
            ResizeHandle::BottomLeft => {
                min.x = pos.x;
                max.y = pos.y;
            }
            ResizeHandle::BottomRight => max = pos,
        }

        // Enforce the floor by pushing the grabbed edge back out.
        if max.x - min.x < MIN_ITEM_SIZE {
            match handle {
                ResizeHandle::TopLeft | ResizeHandle::BottomLeft => min.x = max.x - MIN_ITEM_SIZE,
                _ => max.x = min.x + MIN_ITEM_SIZE,
            }
        }
        if max.y - min.y < MIN_ITEM_SIZE {
            match handle {
                ResizeHandle::TopLeft | ResizeHandle::TopRight => min.y = max.y - MIN_ITEM_SIZE,
                _ => max.y = min.y + MIN_ITEM_SIZE,
            }
        }

        let rect = Rect::from_min_max(min, max);
        let center = rect.center();
        session.items.move_to(item, (center.x, center.y));
        session.items.resize(item, (rect.width(), rect.height()));
    }
}
