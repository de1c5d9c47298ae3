//! Multi-click polyline command. Enter finishes, Escape abandons.

use crate::command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    SelectCount,
};
use crate::content::Content;
use crate::contents::polyline;
use crate::input::MouseButton;
use kurbo::Point;

#[derive(Default)]
struct PolylineCommand {
    vertices: Vec<Point>,
    cursor: Option<Point>,
}

impl PolylineCommand {
    fn finish(&mut self) -> Flow {
        if self.vertices.len() < 2 {
            return Flow::Cancel;
        }
        let vertices = std::mem::take(&mut self.vertices);
        Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
            draft.add(polyline::make(&vertices));
        }))
    }
}

impl CommandHandler for PolylineCommand {
    fn on_event(&mut self, _ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            CommandEvent::PointerMove { snap, .. } => {
                self.cursor = Some(snap.position);
                Flow::Continue
            }
            CommandEvent::PointerDown {
                snap,
                button: MouseButton::Left,
                ..
            } => {
                let point = snap.position;
                if self.vertices.last().is_none_or(|last| last.distance(point) > 1e-9) {
                    self.vertices.push(point);
                }
                Flow::Continue
            }
            // Right click closes the gesture like Enter does.
            CommandEvent::PointerDown {
                button: MouseButton::Right,
                ..
            } => self.finish(),
            CommandEvent::Key { key: "Enter" } => self.finish(),
            _ => Flow::Continue,
        }
    }

    fn preview(&self, _ctx: &CommandCtx) -> Vec<Content> {
        let mut points = self.vertices.clone();
        if let Some(cursor) = self.cursor {
            if points.last().is_none_or(|last| last.distance(cursor) > 1e-9) {
                points.push(cursor);
            }
        }
        if points.len() < 2 {
            return Vec::new();
        }
        vec![polyline::make(&points)]
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.cursor = None;
    }
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "polyline",
        hotkey: Some("p"),
        select_count: SelectCount::None,
        select_predicate: None,
        select_part_mode: false,
        repeats: false,
        build: || Box::new(PolylineCommand::default()),
    }
}
