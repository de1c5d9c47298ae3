//! Two-point line command.

use crate::command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    SelectCount,
};
use crate::content::Content;
use crate::contents::line;
use crate::input::MouseButton;
use kurbo::Point;

#[derive(Default)]
struct LineCommand {
    first: Option<Point>,
    cursor: Option<Point>,
}

impl CommandHandler for LineCommand {
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
                match self.first {
                    None => {
                        self.first = Some(point);
                        self.cursor = Some(point);
                        Flow::Continue
                    }
                    Some(first) => {
                        if first.distance(point) < 1e-9 {
                            return Flow::Continue;
                        }
                        Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                            draft.add(line::make(first, point));
                        }))
                    }
                }
            }
            _ => Flow::Continue,
        }
    }

    fn preview(&self, _ctx: &CommandCtx) -> Vec<Content> {
        match (self.first, self.cursor) {
            (Some(first), Some(cursor)) if first.distance(cursor) > 1e-9 => {
                vec![line::make(first, cursor)]
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.first = None;
        self.cursor = None;
    }
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "line",
        hotkey: Some("l"),
        select_count: SelectCount::None,
        select_predicate: None,
        select_part_mode: false,
        repeats: false,
        build: || Box::new(LineCommand::default()),
    }
}
