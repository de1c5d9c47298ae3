//! Center-then-radius circle command.

use crate::command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    SelectCount,
};
use crate::content::Content;
use crate::contents::circle;
use crate::input::MouseButton;
use kurbo::Point;

#[derive(Default)]
struct CircleCommand {
    center: Option<Point>,
    cursor: Option<Point>,
}

impl CommandHandler for CircleCommand {
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
                match self.center {
                    None => {
                        self.center = Some(point);
                        Flow::Continue
                    }
                    Some(center) => {
                        let radius = center.distance(point);
                        if radius < 1e-9 {
                            return Flow::Continue;
                        }
                        Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                            draft.add(circle::make(center, radius));
                        }))
                    }
                }
            }
            _ => Flow::Continue,
        }
    }

    fn preview(&self, _ctx: &CommandCtx) -> Vec<Content> {
        match (self.center, self.cursor) {
            (Some(center), Some(cursor)) if center.distance(cursor) > 1e-9 => {
                vec![circle::make(center, center.distance(cursor))]
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.center = None;
        self.cursor = None;
    }
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "circle",
        hotkey: Some("c"),
        select_count: SelectCount::None,
        select_predicate: None,
        select_part_mode: false,
        repeats: false,
        build: || Box::new(CircleCommand::default()),
    }
}
