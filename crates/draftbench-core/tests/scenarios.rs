//! End-to-end scenarios driving the editor through its public surface.

use draftbench_core::content::{point_from, points_from};
use draftbench_core::contents;
use draftbench_core::registry::ModelCtx;
use draftbench_core::{
    Content, Editor, EngineError, KeyEvent, Modifiers, MouseButton, Patch, PathSeg, PointerEvent,
    Registry, SelectionPath,
};
use kurbo::{Point, Rect};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn click(editor: &mut Editor, x: f64, y: f64) {
    editor.on_pointer(PointerEvent::Down {
        position: Point::new(x, y),
        button: MouseButton::Left,
        modifiers: Modifiers::default(),
    });
    editor.on_pointer(PointerEvent::Up {
        position: Point::new(x, y),
        button: MouseButton::Left,
    });
}

fn drag(editor: &mut Editor, from: (f64, f64), to: (f64, f64)) {
    editor.on_pointer(PointerEvent::Down {
        position: Point::new(from.0, from.1),
        button: MouseButton::Left,
        modifiers: Modifiers::default(),
    });
    editor.on_pointer(PointerEvent::Move {
        position: Point::new(to.0, to.1),
    });
    editor.on_pointer(PointerEvent::Up {
        position: Point::new(to.0, to.1),
        button: MouseButton::Left,
    });
}

fn press(editor: &mut Editor, key: &str) {
    editor.on_key(KeyEvent::Pressed(key.to_string()));
}

fn add_content(editor: &mut Editor, content: &Content) -> usize {
    let index = editor.committed().len();
    editor
        .commit(
            vec![Patch::add(vec![PathSeg::Index(index)], content.value().clone())],
            Vec::new(),
        )
        .unwrap();
    index
}

// ---------------------------------------------------------------------
// Scenario: two-point line then undo.

#[test]
fn two_point_line_then_undo() {
    init_logs();
    let mut editor = Editor::with_standard();
    editor.start_operation("line", None).unwrap();
    click(&mut editor, 0.0, 0.0);
    assert!(!editor.preview().is_empty() || editor.active_command() == Some("line"));
    click(&mut editor, 10.0, 0.0);

    assert_eq!(editor.committed().len(), 1);
    let content = editor.committed()[0].as_ref().unwrap();
    assert_eq!(content.type_tag(), "line");
    let points = points_from(content.get("points").unwrap()).unwrap();
    assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    // Commit ends the gesture.
    assert_eq!(editor.active_command(), None);

    assert!(editor.undo());
    assert_eq!(editor.committed().len(), 0);
    assert!(editor.query_region(Rect::new(-1e6, -1e6, 1e6, 1e6)).is_empty());
}

// ---------------------------------------------------------------------
// Scenario: deleting referenced content is blocked.

#[test]
fn delete_referenced_content_blocked() {
    init_logs();
    let mut editor = Editor::with_standard();
    let line = contents::line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
    add_content(&mut editor, &line);
    let block = contents::block::make(Point::new(0.0, 0.0), vec![0]);
    add_content(&mut editor, &block);
    let reference = contents::block_reference::make(1, Point::new(50.0, 0.0));
    add_content(&mut editor, &reference);

    // The block at 1 is referenced by 2; the delete predicate cannot even
    // select it, so the command parks in its selection gate.
    editor
        .start_operation("delete", Some(vec![SelectionPath::whole(1)]))
        .unwrap();
    assert_eq!(editor.active_command(), Some("delete"));
    assert!(editor.committed()[1].is_some());
    press(&mut editor, "Escape");
    assert_eq!(editor.active_command(), None);

    // Delete the reference first, then the block goes through.
    editor
        .start_operation("delete", Some(vec![SelectionPath::whole(2)]))
        .unwrap();
    assert!(editor.committed()[2].is_none());
    editor
        .start_operation("delete", Some(vec![SelectionPath::whole(1)]))
        .unwrap();
    assert!(editor.committed()[1].is_none());
    // And now the child line is unreferenced too.
    editor
        .start_operation("delete", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    assert!(editor.committed()[0].is_none());
}

// ---------------------------------------------------------------------
// Scenario: remote merge mid-gesture.

#[test]
fn remote_merge_mid_gesture() {
    init_logs();
    let mut editor = Editor::with_standard();
    editor.start_operation("polyline", None).unwrap();
    click(&mut editor, 0.0, 0.0);

    // A remote operator adds unrelated content while the gesture is open.
    let circle = contents::circle::make(Point::new(100.0, 100.0), 5.0);
    editor
        .apply_remote(
            vec![Patch::add(vec![PathSeg::Index(0)], circle.value().clone())],
            Vec::new(),
            42,
        )
        .unwrap();

    click(&mut editor, 10.0, 0.0);
    press(&mut editor, "Enter");

    // Both the remote circle and the committed polyline are present.
    assert_eq!(editor.committed().len(), 2);
    assert_eq!(editor.committed()[0].as_ref().unwrap().type_tag(), "circle");
    let polyline = editor.committed()[1].as_ref().unwrap();
    assert_eq!(polyline.type_tag(), "polyline");
    let points = points_from(polyline.get("points").unwrap()).unwrap();
    assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);

    // Local undo reverts only the polyline commit.
    assert!(editor.undo());
    assert_eq!(editor.committed().len(), 1);
    assert_eq!(editor.committed()[0].as_ref().unwrap().type_tag(), "circle");
    assert!(!editor.undo());
}

// ---------------------------------------------------------------------
// Index fidelity under randomized commit sequences.

/// Deterministic splitmix64 so failures reproduce.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn range(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    fn coord(&mut self) -> f64 {
        (self.next() % 2000) as f64 - 1000.0
    }
}

fn brute_force_query(store: &[Option<Content>], registry: &Registry, rect: Rect) -> Vec<usize> {
    let ctx = ModelCtx::new(store, registry);
    (0..store.len())
        .filter(|&i| {
            let Some(content) = store[i].as_ref() else {
                return false;
            };
            if !content.visible() {
                return false;
            }
            let Ok(geometry) = ctx.geometries_of(i) else {
                return false;
            };
            geometry.bounding.is_some_and(|b| {
                rect.x0 <= b.x1 && b.x0 <= rect.x1 && rect.y0 <= b.y1 && b.y0 <= rect.y1
            })
        })
        .collect()
}

#[test]
fn index_matches_brute_force_scan() {
    init_logs();
    let mut editor = Editor::with_standard();
    let mut rng = Rng(7);
    let whole_canvas = Rect::new(-1e6, -1e6, 1e6, 1e6);

    for step in 0..200 {
        let roll = rng.range(10);
        let len = editor.committed().len();
        if roll < 5 || len == 0 {
            let a = Point::new(rng.coord(), rng.coord());
            let b = Point::new(rng.coord(), rng.coord());
            let content = if roll % 2 == 0 && a.distance(b) > 1e-9 {
                contents::line::make(a, b)
            } else {
                contents::circle::make(a, 1.0 + rng.range(50) as f64)
            };
            add_content(&mut editor, &content);
        } else if roll < 8 {
            let slot = rng.range(len);
            editor
                .commit(vec![Patch::remove(vec![PathSeg::Index(slot)])], Vec::new())
                .unwrap();
        } else {
            let slot = rng.range(len);
            if editor.committed()[slot].is_some() {
                let replacement = contents::circle::make(
                    Point::new(rng.coord(), rng.coord()),
                    1.0 + rng.range(20) as f64,
                );
                editor
                    .commit(
                        vec![Patch::replace(
                            vec![PathSeg::Index(slot)],
                            replacement.value().clone(),
                        )],
                        Vec::new(),
                    )
                    .unwrap();
            }
        }

        let expected =
            brute_force_query(editor.committed(), editor.registry(), whole_canvas);
        assert_eq!(
            editor.query_region(whole_canvas),
            expected,
            "index diverged from brute force at step {step}"
        );

        // A smaller window as well, to exercise partial intersection.
        let window = Rect::new(-200.0, -200.0, 300.0, 250.0);
        let expected = brute_force_query(editor.committed(), editor.registry(), window);
        assert_eq!(editor.query_region(window), expected);
    }
}

// ---------------------------------------------------------------------
// Undo/redo round-trips restore identical state.

fn store_values(editor: &Editor) -> Vec<Option<serde_json::Value>> {
    editor
        .committed()
        .iter()
        .map(|slot| slot.as_ref().map(|c| c.value().clone()))
        .collect()
}

#[test]
fn undo_redo_roundtrip_is_identical() {
    init_logs();
    let mut editor = Editor::with_standard();
    let mut rng = Rng(99);
    for _ in 0..40 {
        let len = editor.committed().len();
        if rng.range(3) == 0 && len > 0 {
            let slot = rng.range(len);
            editor
                .commit(vec![Patch::remove(vec![PathSeg::Index(slot)])], Vec::new())
                .unwrap();
        } else {
            let content = contents::line::make(
                Point::new(rng.coord(), rng.coord()),
                Point::new(rng.coord(), rng.coord()),
            );
            add_content(&mut editor, &content);
        }
    }

    for _ in 0..10 {
        let before = store_values(&editor);
        assert!(editor.undo());
        assert!(editor.redo());
        assert_eq!(store_values(&editor), before, "undo();redo() drifted");

        assert!(editor.undo());
        let after_undo = store_values(&editor);
        assert!(editor.redo());
        assert!(editor.undo());
        assert_eq!(store_values(&editor), after_undo, "redo();undo() drifted");
    }
}

// ---------------------------------------------------------------------
// Truncation inverse through the editor surface.

#[test]
fn truncation_undo_restores_index() {
    init_logs();
    let mut editor = Editor::with_standard();
    for i in 0..4 {
        let content = contents::line::make(
            Point::new(i as f64 * 10.0, 0.0),
            Point::new(i as f64 * 10.0 + 5.0, 0.0),
        );
        add_content(&mut editor, &content);
    }
    editor.commit(vec![Patch::set_length(1)], Vec::new()).unwrap();
    assert_eq!(editor.committed().len(), 1);
    assert_eq!(editor.query_region(Rect::new(-1e6, -1e6, 1e6, 1e6)).len(), 1);

    assert!(editor.undo());
    assert_eq!(editor.committed().len(), 4);
    assert_eq!(editor.query_region(Rect::new(-1e6, -1e6, 1e6, 1e6)).len(), 4);
}

// ---------------------------------------------------------------------
// Snap determinism through the editor surface.

#[test]
fn snap_is_deterministic() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
    );
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 10.0), Point::new(10.0, 0.0)),
    );
    let cursor = Point::new(5.2, 5.1);
    let first = editor.get_snap_point(cursor, 10.0);
    for _ in 0..20 {
        assert_eq!(editor.get_snap_point(cursor, 10.0), first);
    }
    assert_eq!(first.position, Point::new(5.0, 5.0));
}

// ---------------------------------------------------------------------
// Marquee selection semantics.

#[test]
fn marquee_direction_picks_semantics() {
    init_logs();
    let mut editor = Editor::with_standard();
    // Fully inside the marquee.
    add_content(
        &mut editor,
        &contents::line::make(Point::new(10.0, 10.0), Point::new(20.0, 20.0)),
    );
    // Crosses the marquee edge but is not enclosed.
    add_content(
        &mut editor,
        &contents::line::make(Point::new(25.0, 15.0), Point::new(60.0, 15.0)),
    );

    // Left-to-right: enclosing only.
    drag(&mut editor, (0.0, 0.0), (30.0, 30.0));
    assert_eq!(editor.get_selection(), &[SelectionPath::whole(0)]);

    // Right-to-left: crossing picks both.
    drag(&mut editor, (30.0, 30.0), (0.0, 0.0));
    let mut selected: Vec<usize> = editor.get_selection().iter().map(|p| p.index).collect();
    selected.sort_unstable();
    assert_eq!(selected, vec![0, 1]);
}

// ---------------------------------------------------------------------
// Move command over a gated selection.

#[test]
fn move_command_translates_selection() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
    );
    editor
        .start_operation("move", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    click(&mut editor, 0.0, 0.0);
    // Far enough from the line that no snap candidate is in tolerance.
    click(&mut editor, 50.0, 70.0);

    let content = editor.committed()[0].as_ref().unwrap();
    let points = points_from(content.get("points").unwrap()).unwrap();
    assert_eq!(points, vec![Point::new(50.0, 70.0), Point::new(60.0, 70.0)]);

    // Undo restores the original position.
    assert!(editor.undo());
    let content = editor.committed()[0].as_ref().unwrap();
    let points = points_from(content.get("points").unwrap()).unwrap();
    assert_eq!(points[0], Point::new(0.0, 0.0));
}

// ---------------------------------------------------------------------
// Clone repeats after each commit.

#[test]
fn clone_command_repeats() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::circle::make(Point::new(0.0, 0.0), 2.0),
    );
    editor
        .start_operation("clone", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    click(&mut editor, 0.0, 0.0); // base
    click(&mut editor, 100.0, 0.0); // first copy
    assert_eq!(editor.active_command(), Some("clone"));
    click(&mut editor, 200.0, 0.0); // second copy

    assert_eq!(editor.committed().len(), 3);
    let second = editor.committed()[2].as_ref().unwrap();
    let center = point_from(second.get("center").unwrap()).unwrap();
    assert_eq!(center, Point::new(200.0, 0.0));

    press(&mut editor, "Escape");
    assert_eq!(editor.active_command(), None);
}

// ---------------------------------------------------------------------
// Transform commands honor their capability predicates.

#[test]
fn mirror_adds_reflected_copies() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(30.0, 10.0), Point::new(40.0, 10.0)),
    );
    editor
        .start_operation("mirror", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    // Vertical axis at x = 0 (clicked far from any snap candidate).
    click(&mut editor, 0.0, -100.0);
    click(&mut editor, 0.0, 100.0);

    assert_eq!(editor.committed().len(), 2);
    let image = editor.committed()[1].as_ref().unwrap();
    let points = points_from(image.get("points").unwrap()).unwrap();
    assert_eq!(points, vec![Point::new(-30.0, 10.0), Point::new(-40.0, 10.0)]);
}

#[test]
fn mirror_excludes_types_without_the_capability() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::arc::make(Point::new(0.0, 0.0), 5.0, 0.0, 1.0),
    );
    // Arcs opt out of mirroring, so the gate cannot be satisfied by this
    // selection and the command waits for a different one.
    editor
        .start_operation("mirror", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    assert_eq!(editor.active_command(), Some("mirror"));
    assert_eq!(editor.committed().len(), 1);
    press(&mut editor, "Escape");
}

#[test]
fn explode_replaces_polyline_with_lines() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::polyline::make(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]),
    );
    editor
        .start_operation("explode", Some(vec![SelectionPath::whole(0)]))
        .unwrap();

    assert!(editor.committed()[0].is_none());
    let tags: Vec<&str> = editor
        .committed()
        .iter()
        .flatten()
        .map(|c| c.type_tag())
        .collect();
    assert_eq!(tags, vec!["line", "line"]);

    // One undo reverts the whole decomposition atomically.
    assert!(editor.undo());
    assert_eq!(editor.committed().len(), 1);
    assert_eq!(editor.committed()[0].as_ref().unwrap().type_tag(), "polyline");
}

#[test]
fn break_splits_line_at_picked_point() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(100.0, 0.0)),
    );
    editor
        .start_operation("break", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    // The click snaps to the line midpoint and splits there.
    click(&mut editor, 50.0, 1.0);

    assert!(editor.committed()[0].is_none());
    let pieces: Vec<Vec<Point>> = editor
        .committed()
        .iter()
        .flatten()
        .map(|c| points_from(c.get("points").unwrap()).unwrap())
        .collect();
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0][1], Point::new(50.0, 0.0));
    assert_eq!(pieces[1][0], Point::new(50.0, 0.0));
}

#[test]
fn rotate_quarter_turn() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(100.0, 0.0), Point::new(200.0, 0.0)),
    );
    editor
        .start_operation("rotate", Some(vec![SelectionPath::whole(0)]))
        .unwrap();
    click(&mut editor, 0.0, 0.0); // rotation center
    click(&mut editor, 0.0, 300.0); // +90 degrees

    let content = editor.committed()[0].as_ref().unwrap();
    let points = points_from(content.get("points").unwrap()).unwrap();
    assert!((points[0].x - 0.0).abs() < 1e-9);
    assert!((points[0].y - 100.0).abs() < 1e-9);
    assert!((points[1].y - 200.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------
// Escape discards the preview without committing.

#[test]
fn escape_discards_preview() {
    init_logs();
    let mut editor = Editor::with_standard();
    editor.start_operation("line", None).unwrap();
    click(&mut editor, 0.0, 0.0);
    editor.on_pointer(PointerEvent::Move {
        position: Point::new(50.0, 50.0),
    });
    assert_eq!(editor.preview().len(), 1);
    press(&mut editor, "Escape");
    assert!(editor.preview().is_empty());
    assert_eq!(editor.committed().len(), 0);
}

// ---------------------------------------------------------------------
// Validation failures leave the store untouched.

#[test]
fn validation_rejects_structurally_invalid_commit() {
    init_logs();
    let mut editor = Editor::with_standard();
    let bad = serde_json::json!({
        "type": "polyline",
        "points": [{ "x": 0.0, "y": 0.0 }],
    });
    let result = editor.commit(vec![Patch::add(vec![PathSeg::Index(0)], bad)], Vec::new());
    assert!(matches!(result, Err(EngineError::Validation { .. })));
    assert_eq!(editor.committed().len(), 0);
}

// ---------------------------------------------------------------------
// Compress is exclusive and rewrites references.

#[test]
fn compress_requires_no_preview() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
    );
    editor.start_operation("line", None).unwrap();
    click(&mut editor, 0.0, 0.0);
    assert!(matches!(editor.compress(), Err(EngineError::PendingPreview)));
    press(&mut editor, "Escape");
    assert!(editor.compress().is_ok());
}

#[test]
fn compress_keeps_selection_on_renumbered_slots() {
    init_logs();
    let mut editor = Editor::with_standard();
    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
    );
    add_content(
        &mut editor,
        &contents::line::make(Point::new(20.0, 0.0), Point::new(30.0, 0.0)),
    );
    editor
        .commit(vec![Patch::remove(vec![PathSeg::Index(0)])], Vec::new())
        .unwrap();
    editor.set_selection(vec![SelectionPath::whole(1)]);

    editor.compress().unwrap();
    assert_eq!(editor.committed().len(), 1);
    assert_eq!(editor.get_selection(), &[SelectionPath::whole(0)]);
    // The index was rebuilt for the renumbered store.
    assert_eq!(editor.query_region(Rect::new(-1e6, -1e6, 1e6, 1e6)), vec![0]);
}

// ---------------------------------------------------------------------
// Change subscription delivers every committed transition.

#[test]
fn change_subscription_sees_local_and_remote() {
    init_logs();
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut editor = Editor::with_standard();
    let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
    let sink = Rc::clone(&seen);
    editor.subscribe(move |event| {
        sink.borrow_mut().push(event.patches.len());
    });

    add_content(
        &mut editor,
        &contents::line::make(Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
    );
    let circle = contents::circle::make(Point::new(5.0, 5.0), 1.0);
    editor
        .apply_remote(
            vec![Patch::add(vec![PathSeg::Index(1)], circle.value().clone())],
            Vec::new(),
            7,
        )
        .unwrap();
    editor.undo();

    // Local commit, remote merge, and undo each notified once.
    assert_eq!(seen.borrow().len(), 3);
}
