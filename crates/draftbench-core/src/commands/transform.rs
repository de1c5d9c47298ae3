//! Capability-driven transform commands: rotate, mirror, explode, break.

use crate::command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    PredicateCtx, SelectCount,
};
use crate::content::{Content, SelectionPath};
use crate::input::MouseButton;
use crate::registry::ModelCtx;
use kurbo::Point;

use super::unique_indices;

fn has_capability(
    ctx: &PredicateCtx,
    path: SelectionPath,
    check: fn(&crate::registry::ContentModel) -> bool,
) -> bool {
    let Some(content) = ctx.store.get(path.index).and_then(Option::as_ref) else {
        return false;
    };
    content.visible()
        && !content.readonly()
        && ctx
            .registry
            .model(content.type_tag())
            .is_some_and(check)
}

fn rotatable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    has_capability(ctx, path, |m| m.rotate.is_some())
}

fn mirrorable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    has_capability(ctx, path, |m| m.mirror.is_some())
}

fn explodable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    // Exploding removes the original, so reference integrity applies.
    has_capability(ctx, path, |m| m.explode.is_some())
        && !ctx.refs.is_referenced(path.index)
}

fn breakable(ctx: &PredicateCtx, path: SelectionPath) -> bool {
    has_capability(ctx, path, |m| m.break_at.is_some())
        && !ctx.refs.is_referenced(path.index)
}

// ---------------------------------------------------------------------
// rotate: center click, then a point fixing the angle.

#[derive(Default)]
struct RotateCommand {
    center: Option<Point>,
    cursor: Option<Point>,
}

fn rotation_angle(center: Point, to: Point) -> f64 {
    (to.y - center.y).atan2(to.x - center.x)
}

impl CommandHandler for RotateCommand {
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
            } => match self.center {
                None => {
                    self.center = Some(snap.position);
                    Flow::Continue
                }
                Some(center) => {
                    if center.distance(snap.position) < 1e-9 {
                        return Flow::Continue;
                    }
                    let angle = rotation_angle(center, snap.position);
                    let indices = unique_indices(ctx.selection);
                    Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                        for index in indices {
                            let Some(content) = draft.get(index) else {
                                continue;
                            };
                            let Some(rotate) = draft
                                .registry()
                                .model(content.type_tag())
                                .and_then(|m| m.rotate)
                            else {
                                continue;
                            };
                            let rotated = rotate(content, center, angle);
                            draft.replace(index, rotated);
                        }
                    }))
                }
            },
            _ => Flow::Continue,
        }
    }

    fn preview(&self, ctx: &CommandCtx) -> Vec<Content> {
        let (Some(center), Some(cursor)) = (self.center, self.cursor) else {
            return Vec::new();
        };
        if center.distance(cursor) < 1e-9 {
            return Vec::new();
        }
        let angle = rotation_angle(center, cursor);
        unique_indices(ctx.selection)
            .into_iter()
            .filter_map(|index| {
                let content = ctx.store.get(index).and_then(Option::as_ref)?;
                let rotate = ctx
                    .registry
                    .model(content.type_tag())
                    .and_then(|m| m.rotate)?;
                Some(rotate(content, center, angle))
            })
            .collect()
    }

    fn reset(&mut self) {
        self.center = None;
        self.cursor = None;
    }
}

pub fn rotate_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "rotate",
        hotkey: Some("r"),
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(rotatable),
        select_part_mode: false,
        repeats: false,
        build: || Box::new(RotateCommand::default()),
    }
}

// ---------------------------------------------------------------------
// mirror: two clicks define the reflection axis.

#[derive(Default)]
struct MirrorCommand {
    first: Option<Point>,
    cursor: Option<Point>,
}

fn mirrored_copies(ctx: &CommandCtx, a: Point, b: Point) -> Vec<Content> {
    unique_indices(ctx.selection)
        .into_iter()
        .filter_map(|index| {
            let content = ctx.store.get(index).and_then(Option::as_ref)?;
            let mirror = ctx
                .registry
                .model(content.type_tag())
                .and_then(|m| m.mirror)?;
            Some(mirror(content, a, b))
        })
        .collect()
}

impl CommandHandler for MirrorCommand {
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
            } => match self.first {
                None => {
                    self.first = Some(snap.position);
                    Flow::Continue
                }
                Some(first) => {
                    if first.distance(snap.position) < 1e-9 {
                        return Flow::Continue;
                    }
                    // Mirroring keeps the original and adds the image.
                    let copies = mirrored_copies(ctx, first, snap.position);
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
        match (self.first, self.cursor) {
            (Some(first), Some(cursor)) if first.distance(cursor) > 1e-9 => {
                mirrored_copies(ctx, first, cursor)
            }
            _ => Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.first = None;
        self.cursor = None;
    }
}

pub fn mirror_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "mirror",
        hotkey: None,
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(mirrorable),
        select_part_mode: false,
        repeats: false,
        build: || Box::new(MirrorCommand::default()),
    }
}

// ---------------------------------------------------------------------
// explode: replace each selected content with its decomposition.

struct ExplodeCommand;

impl CommandHandler for ExplodeCommand {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            CommandEvent::Start => {
                let indices = unique_indices(ctx.selection);
                Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                    for index in indices {
                        let Some(content) = draft.get(index) else {
                            continue;
                        };
                        let Some(explode) = draft
                            .registry()
                            .model(content.type_tag())
                            .and_then(|m| m.explode)
                        else {
                            continue;
                        };
                        let snapshot: Vec<Option<Content>> =
                            (0..draft.len()).map(|i| draft.get(i).cloned()).collect();
                        let ctx = ModelCtx::new(&snapshot, draft.registry());
                        let Some(pieces) = explode(content, &ctx) else {
                            continue;
                        };
                        draft.remove(index);
                        for piece in pieces {
                            draft.add(piece);
                        }
                    }
                }))
            }
            _ => Flow::Continue,
        }
    }

    fn reset(&mut self) {}
}

pub fn explode_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "explode",
        hotkey: None,
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(explodable),
        select_part_mode: false,
        repeats: false,
        build: || Box::new(ExplodeCommand),
    }
}

// ---------------------------------------------------------------------
// break: one click splits the selected content at the picked point.

struct BreakCommand;

impl CommandHandler for BreakCommand {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow {
        match event {
            CommandEvent::PointerDown {
                snap,
                button: MouseButton::Left,
                ..
            } => {
                let cut = snap.position;
                let indices = unique_indices(ctx.selection);
                Flow::Commit(Mutation::edit(move |draft: &mut Draft| {
                    for index in indices {
                        let Some(content) = draft.get(index) else {
                            continue;
                        };
                        let Some(break_at) = draft
                            .registry()
                            .model(content.type_tag())
                            .and_then(|m| m.break_at)
                        else {
                            continue;
                        };
                        let Some(pieces) = break_at(content, &[cut]) else {
                            // The cut missed this content; leave it whole.
                            continue;
                        };
                        draft.remove(index);
                        for piece in pieces {
                            draft.add(piece);
                        }
                    }
                }))
            }
            _ => Flow::Continue,
        }
    }

    fn reset(&mut self) {}
}

pub fn break_descriptor() -> CommandDescriptor {
    CommandDescriptor {
        name: "break",
        hotkey: None,
        select_count: SelectCount::AtLeast(1),
        select_predicate: Some(breakable),
        select_part_mode: true,
        repeats: false,
        build: || Box::new(BreakCommand),
    }
}
