use super::*;
use crate::types::ItemKind;
use egui::vec2;

/// Drives one headless egui frame with the given input events, rendering
/// the app's canvas inside a central panel.
fn run_canvas_frame(ctx: &egui::Context, app: &mut DesignerApp, events: Vec<egui::Event>) {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::ZERO,
        vec2(1200.0, 800.0),
    ));
    raw.events = events;
    let _ = ctx.run(raw, |ctx| {
        ctx.set_visuals(egui::Visuals::dark());
        egui::CentralPanel::default().show(ctx, |ui| {
            app.draw_canvas(ui);
        });
    });
}

/// App with an identity view transform so screen space equals canvas space.
fn app_with_identity_view() -> DesignerApp {
    let mut app = DesignerApp::default();
    app.view_initialized = true;
    app.session.view.pan = vec2(0.0, 0.0);
    app.session.view.zoom = 1.0;
    app
}

fn press(pos: egui::Pos2) -> Vec<egui::Event> {
    vec![
        egui::Event::PointerMoved(pos),
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        },
    ]
}

fn release(pos: egui::Pos2) -> Vec<egui::Event> {
    vec![egui::Event::PointerButton {
        pos,
        button: egui::PointerButton::Primary,
        pressed: false,
        modifiers: egui::Modifiers::NONE,
    }]
}

#[test]
fn clicking_canvas_selects_item() {
    let mut app = app_with_identity_view();
    let id = app.session.add_item(
        ItemKind::DataSource,
        (200.0, 150.0),
        Default::default(),
    );

    let ctx = egui::Context::default();
    let click = egui::pos2(200.0, 150.0);

    // Hover frame first so egui registers the pointer position.
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(click)]);
    run_canvas_frame(&ctx, &mut app, press(click));

    assert_eq!(app.controller.selection(), &[id]);
}

#[test]
fn canvas_drag_moves_selected_item() {
    let mut app = app_with_identity_view();
    app.controller.snap_enabled = false;
    let id = app.session.add_item(
        ItemKind::DataSource,
        (200.0, 150.0),
        Default::default(),
    );

    let ctx = egui::Context::default();
    run_canvas_frame(&ctx, &mut app, press(egui::pos2(200.0, 150.0)));
    run_canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::PointerMoved(egui::pos2(260.0, 190.0))],
    );
    run_canvas_frame(&ctx, &mut app, release(egui::pos2(260.0, 190.0)));

    let item = app.session.items.find(id).expect("item still exists");
    assert_eq!(item.position, (260.0, 190.0));
}

#[test]
fn marquee_over_empty_canvas_selects_contained_items() {
    let mut app = app_with_identity_view();
    let a = app
        .session
        .add_item(ItemKind::DataSource, (300.0, 300.0), Default::default());
    let b = app
        .session
        .add_item(ItemKind::DataSource, (380.0, 360.0), Default::default());
    let _far = app
        .session
        .add_item(ItemKind::DataSource, (900.0, 600.0), Default::default());

    let ctx = egui::Context::default();
    run_canvas_frame(&ctx, &mut app, press(egui::pos2(150.0, 150.0)));
    run_canvas_frame(
        &ctx,
        &mut app,
        vec![egui::Event::PointerMoved(egui::pos2(450.0, 450.0))],
    );
    run_canvas_frame(&ctx, &mut app, release(egui::pos2(450.0, 450.0)));

    assert_eq!(app.controller.selection(), &[a, b]);
}

#[test]
fn undo_shortcut_removes_last_created_item() {
    let mut app = app_with_identity_view();
    app.create_item_at(ItemKind::Consumption, (100.0, 100.0));
    let created = app.controller.selection()[0];
    assert!(app.session.items.find(created).is_some());

    let ctx = egui::Context::default();
    let mut raw = egui::RawInput::default();
    raw.modifiers = egui::Modifiers {
        command: true,
        ..Default::default()
    };
    raw.events = vec![egui::Event::Key {
        key: egui::Key::Z,
        physical_key: Some(egui::Key::Z),
        pressed: true,
        repeat: false,
        modifiers: egui::Modifiers {
            command: true,
            ..Default::default()
        },
    }];
    let _ = ctx.run(raw, |ctx| {
        app.handle_undo_redo_keys(ctx);
    });

    assert!(app.session.items.find(created).is_none());
}

#[test]
fn escape_key_exits_all_modes() {
    let mut app = app_with_identity_view();
    app.controller.toggle_connect_mode();
    app.controller.toggle_edit_mode();

    let ctx = egui::Context::default();
    let mut raw = egui::RawInput::default();
    raw.events = vec![egui::Event::Key {
        key: egui::Key::Escape,
        physical_key: Some(egui::Key::Escape),
        pressed: true,
        repeat: false,
        modifiers: egui::Modifiers::NONE,
    }];
    let _ = ctx.run(raw, |ctx| {
        app.handle_escape_key(ctx);
    });

    assert!(!app.controller.connect_mode());
    assert!(!app.controller.edit_mode());
}

#[test]
fn delete_key_removes_selection_with_connections() {
    let mut app = app_with_identity_view();
    let a = app
        .session
        .add_item(ItemKind::DataSource, (100.0, 100.0), Default::default());
    let b = app
        .session
        .add_item(ItemKind::Consumption, (400.0, 100.0), Default::default());
    app.session.connect(a, b, None, None).unwrap();
    app.controller.select_only(a);

    let ctx = egui::Context::default();
    let mut raw = egui::RawInput::default();
    raw.events = vec![egui::Event::Key {
        key: egui::Key::Delete,
        physical_key: Some(egui::Key::Delete),
        pressed: true,
        repeat: false,
        modifiers: egui::Modifiers::NONE,
    }];
    let _ = ctx.run(raw, |ctx| {
        app.handle_delete_key(ctx);
    });

    assert!(app.session.items.find(a).is_none());
    assert!(app.session.connections.is_empty());
    assert!(app.session.items.find(b).is_some());
}

#[test]
fn connection_path_recomputes_after_engine_move() {
    // The rendered path is derived from live registry state every frame,
    // so moving an item re-routes its connections with no extra wiring.
    let mut app = app_with_identity_view();
    let a = app
        .session
        .add_item(ItemKind::DataSource, (100.0, 100.0), Default::default());
    let b = app
        .session
        .add_item(ItemKind::Consumption, (400.0, 100.0), Default::default());
    app.session.connect(a, b, None, None).unwrap();

    let before = app
        .connection_path(&app.session.connections.all()[0].clone())
        .unwrap();
    assert_eq!(before[0], egui::pos2(100.0, 100.0));

    app.session.items.move_to(a, (100.0, 300.0));
    let after = app
        .connection_path(&app.session.connections.all()[0].clone())
        .unwrap();
    assert_eq!(after[0], egui::pos2(100.0, 300.0));
    assert_eq!(*after.last().unwrap(), egui::pos2(400.0, 100.0));
}
