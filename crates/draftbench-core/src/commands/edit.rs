//! Selection-gated edit commands: move, delete, clone.

use crate::command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    PredicateCtx, SelectCount,
};
use crate::content::{Content, SelectionPath};
use crate::input::MouseButton;
use kurbo::{Point, Vec2};

/// Unique content indices of a selection path set, in order.
pub fn unique_indices(paths: &[SelectionPath]) -> Vec<usize> {
    let mut out = Vec::new();
    for path in paths {
        if !out.contains(&path.index) {
            out.push(path.index);
        }
    }
    out
}

/// Selectable for transforms: live, visible, writable, and the type opted
/// into `translate`. Capability absence filters here, never at commit.
fn movable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    let Some(content) = ctx.store.get(path.index).and_then(Option::as_ref) else {
        return false;
    };
    content.visible()
        && !content.readonly()
        && ctx
            .registry
            .model(content.type_tag())
            .is_some_and(|m| m.translate.is_some())
}

/// Selectable for deletion: live, writable, and not referenced by other
/// content. Reference integrity is enforced right here, so the delete
/// command cannot even select a block that still has references.
fn deletable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    let Some(content) = ctx.store.get(path.index).and_then(Option::as_ref) else {
        return false;
    };
    !content.readonly() && !ctx.refs.is_referenced(path.index)
}

/// Translate every selected content by `delta`, skipping stale slots and
/// types without the capability.
fn translate_mutation(indices: Vec<usize>, delta: Vec2) -> Mutation {
    Mutation::edit(move |draft: &mut Draft| {
        for index in indices {
            let Some(content) = draft.get(index) else {
                // Removed concurrently between selection and commit.
                continue;
            };
            let Some(translate) = draft
                .registry()
                .model(content.type_tag())
                .and_then(|m| m.translate)
            else {
                continue;
            };
            let moved = translate(content, delta);
            draft.replace(index, moved);
        }
    })
}

/// Translated copies of the selection, for previews and clone commits.
fn translated_copies(ctx: &CommandCtx, delta: Vec2) -> Vec<Content> {
    unique_indices(ctx.selection)
        .into_iter()
        .filter_map(|index| {
            let content = ctx.store.get(index).and_then(Option::as_ref)?;
            let translate = ctx
                .registry
                .model(content.type_tag())
                .and_then(|m| m.translate)?;
            Some(translate(content, delta))
        })
        .collect()
}

// ---------------------------------------------------------------------
// move

#[derive(Default)]
struct MoveCommand {
    base: Option<Point>,
    cursor: Option<Point>,
}

impl CommandHandler for MoveCommand {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            CommandEvent::PointerMove { snap, .. } => {
                self.cursor = Some(snap.position);
                Flow::Continue
            }
            CommandEvent::PointerDown {
                snap,
                button: MouseButton::Left,
                ..
            } => match self.base {
                None => {
                    self.base = Some(snap.position);
                    Flow::Continue
                }
                Some(base) => {
                    let delta = snap.position - base;
                    Flow::Commit(translate_mutation(unique_indices(ctx.selection), delta))
                }
            },
            _ => Flow::Continue,
        }
    }

    fn preview(&self, ctx: &CommandCtx) -> Vec<Content> {
        match (self.base, self.cursor) {
            (Some(base), Some(cursor)) => translated_copies(ctx, cursor - base),
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.base = None;
        self.cursor = None;
    }
}

pub fn move_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "move",
        hotkey: Some("m"),
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(movable),
        select_part_mode: false,
        repeats: false,
        build: || Box::new(MoveCommand::default()),
    }
}

// ---------------------------------------------------------------------
// delete

struct DeleteCommand;

impl CommandHandler for DeleteCommand {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            // Commits as soon as the selection gate is satisfied.
            CommandEvent::Start => {
                let indices = unique_indices(ctx.selection);
                Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                    for index in indices {
                        draft.remove(index);
                    }
                }))
            }
            _ => Flow::Continue,
        }
    }

    fn reset(&mut self) {}
}

pub fn delete_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "delete",
        hotkey: Some("Delete"),
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(deletable),
        select_part_mode: false,
        repeats: false,
        build: || Box::new(DeleteCommand),
    }
}

// ---------------------------------------------------------------------
// clone

#[derive(Default)]
struct CloneCommand {
    base: Option<Point>,
    cursor: Option<Point>,
}

impl CommandHandler for CloneCommand {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            CommandEvent::PointerMove { snap, .. } => {
                self.cursor = Some(snap.position);
                Flow::Continue
            }
            CommandEvent::PointerDown {
                snap,
                button: MouseButton::Left,
                ..
            } => match self.base {
                None => {
                    self.base = Some(snap.position);
                    Flow::Continue
                }
                Some(base) => {
                    // The base stays armed: the command repeats, each
                    // click placing another copy.
                    let copies = translated_copies(ctx, snap.position - base);
                    Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                        for copy in copies {
                            draft.add(copy);
                        }
                    }))
                }
            },
            _ => Flow::Continue,
        }
    }

    fn preview(&self, ctx: &CommandCtx) -> Vec<Content> {
        match (self.base, self.cursor) {
            (Some(base), Some(cursor)) => translated_copies(ctx, cursor - base),
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.base = None;
        self.cursor = None;
    }
}

pub fn clone_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "clone",
        hotkey: Some("d"),
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(movable),
        select_part_mode: false,
        repeats: true,
        build: || Box::new(CloneCommand::default()),
    }
}
