//! Command descriptors, handlers, and the mutation draft they commit through.

use crate::content::{Content, SelectionPath};
use crate::document::ReferenceTracker;
use crate::input::{Modifiers, MouseButton};
use crate::patch::{Patch, PathSeg};
use crate::registry::Registry;
use crate::snap::SnapResult;
use kurbo::Point;

/// How many selected contents a command needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectCount {
    /// The command creates content and ignores the selection.
    None,
    /// At least this many selected contents must pass the predicate.
    AtLeast(usize),
}

/// Context available to selection predicates.
pub struct PredicateCtx<'a> {
    pub store: &'a [Option<Content>],
    pub registry: &'a Registry,
    pub refs: &'a ReferenceTracker,
}

/// Per-content filter deciding what a command may operate on. Capability
/// absence is expressed here, never as a commit-time failure.
pub type SelectPredicate = fn(&PredicateCtx, SelectionPath) -> bool;

/// A registered command (tool).
#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub hotkey: Option<&'static str>,
    pub select_count: SelectCount,
    pub select_predicate: Option<SelectPredicate>,
    /// Whether selection routes sub-feature paths to this command.
    pub select_part_mode: bool,
    /// Whether the command re-enters Operating right after a commit for
    /// rapid repeated placement.
    pub repeats: bool,
    /// Fresh handler state for one activation.
    pub build: fn() -> Box<dyn CommandHandler>,
}

/// Messages delivered to an active command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandEvent<'a> {
    /// The command became active with a satisfied selection.
    Start,
    PointerMove {
        position: Point,
        snap: SnapResult,
    },
    PointerDown {
        position: Point,
        snap: SnapResult,
        button: MouseButton,
        modifiers: Modifiers,
    },
    PointerUp {
        position: Point,
    },
    Key {
        key: &'a str,
    },
}

/// Read-only state an active command sees.
pub struct CommandCtx<'a> {
    pub store: &'a [Option<Content>],
    pub registry: &'a Registry,
    pub selection: &'a [SelectionPath],
}

/// What a command wants the engine to do after an event.
pub enum Flow {
    /// Keep the command active.
    Continue,
    /// Commit the staged mutation atomically through the patch log.
    Commit(Mutation),
    /// Abandon the command and its preview.
    Cancel,
}

/// A staged edit: either a callback the engine applies to a draft and
/// diffs into patches, or an already-prepared patch pair.
pub enum Mutation {
    Edit(Box<dyn for<'a> FnOnce(&mut Draft<'a>)>),
    Patches {
        forward: Vec<Patch>,
        inverse: Vec<Patch>,
    },
}

impl Mutation {
    /// Stage a draft-mutating callback.
    pub fn edit(f: impl for<'a> FnOnce(&mut Draft<'a>) + 'static) -> Self {
        Mutation::Edit(Box::new(f))
    }
}

/// The per-tool state machine behind one command activation.
///
/// Handlers own their preview exclusively; the engine discards it on
/// cancel, commit, and tool switch. All staging is local until the
/// returned `Flow::Commit` — there is no partial-commit state.
pub trait CommandHandler {
    fn on_event(&mut self, ctx: &CommandCtx, event: CommandEvent) -> Flow;

    /// Speculative contents rendered over the committed store. Never
    /// indexed; hit-testing against it is the caller's linear scan.
    fn preview(&self, ctx: &CommandCtx) -> Vec<Content> {
        let _ = ctx;
        Vec::new()
    }

    /// Drop gesture state (Escape, or repeat re-entry).
    fn reset(&mut self);
}

/// A speculative copy of the committed store that commands mutate;
/// the engine diffs it into a forward/inverse patch pair.
///
/// Deletion tombstones slots and nothing here shrinks the store, so slot
/// indices never shift under a draft.
pub struct Draft<'a> {
    base: &'a [Option<Content>],
    registry: &'a Registry,
    work: Vec<Option<Content>>,
}

impl<'a> Draft<'a> {
    pub fn new(base: &'a [Option<Content>], registry: &'a Registry) -> Self {
        Self {
            base,
            registry,
            work: base.to_vec(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Content> {
        self.work.get(index).and_then(Option::as_ref)
    }

    /// Append new content, returning its slot index.
    pub fn add(&mut self, content: Content) -> usize {
        self.work.push(Some(content));
        self.work.len() - 1
    }

    /// Replace the content at a live slot; a stale (empty) target is
    /// skipped so concurrently removed content no-ops instead of failing
    /// the whole commit.
    pub fn replace(&mut self, index: usize, content: Content) {
        match self.work.get_mut(index) {
            Some(slot) if slot.is_some() => *slot = Some(content),
            _ => log::debug!("draft replace of stale slot {index} skipped"),
        }
    }

    /// Tombstone the content at a slot.
    pub fn remove(&mut self, index: usize) {
        if let Some(slot) = self.work.get_mut(index) {
            *slot = None;
        }
    }

    /// Diff the draft against its base into forward patches (applied in
    /// ascending slot order) and inverses in undo-application order.
    pub fn into_patches(self) -> (Vec<Patch>, Vec<Patch>) {
        let mut forward = Vec::new();
        let mut inverse = Vec::new();
        for index in 0..self.work.len().max(self.base.len()) {
            let old = self.base.get(index).and_then(Option::as_ref);
            let new = self.work.get(index).and_then(Option::as_ref);
            match (old, new) {
                (None, Some(content)) => {
                    forward.push(Patch::add(
                        vec![PathSeg::Index(index)],
                        content.value().clone(),
                    ));
                    if index < self.base.len() {
                        inverse.push(Patch::remove(vec![PathSeg::Index(index)]));
                    }
                }
                (Some(old), Some(new)) => {
                    if old.identity() != new.identity() && old.value() != new.value() {
                        forward.push(Patch::replace(
                            vec![PathSeg::Index(index)],
                            new.value().clone(),
                        ));
                        inverse.push(Patch::replace(
                            vec![PathSeg::Index(index)],
                            old.value().clone(),
                        ));
                    }
                }
                (Some(old), None) => {
                    forward.push(Patch::remove(vec![PathSeg::Index(index)]));
                    inverse.push(Patch::add(
                        vec![PathSeg::Index(index)],
                        old.value().clone(),
                    ));
                }
                (None, None) => {}
            }
        }
        if self.work.len() > self.base.len() {
            // Undo of appended content shrinks the store back.
            inverse.push(Patch::set_length(self.base.len()));
        }
        (forward, inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents;
    use crate::patch::PatchOp;

    #[test]
    fn test_draft_add_diff() {
        let registry = contents::standard_registry();
        let base: Vec<Option<Content>> = Vec::new();
        let mut draft = Draft::new(&base, &registry);
        let index = draft.add(contents::line::make(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        ));
        assert_eq!(index, 0);
        let (forward, inverse) = draft.into_patches();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].op, PatchOp::Add);
        assert_eq!(inverse, vec![Patch::set_length(0)]);
    }

    #[test]
    fn test_draft_replace_diff() {
        let registry = contents::standard_registry();
        let original = contents::line::make(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let base = vec![Some(original.clone())];
        let mut draft = Draft::new(&base, &registry);
        let updated = contents::line::make(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        draft.replace(0, updated.clone());
        let (forward, inverse) = draft.into_patches();
        assert_eq!(forward, vec![Patch::replace(
            vec![PathSeg::Index(0)],
            updated.value().clone(),
        )]);
        assert_eq!(inverse, vec![Patch::replace(
            vec![PathSeg::Index(0)],
            original.value().clone(),
        )]);
    }

    #[test]
    fn test_draft_untouched_is_empty_diff() {
        let registry = contents::standard_registry();
        let base = vec![Some(contents::line::make(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        ))];
        let draft = Draft::new(&base, &registry);
        let (forward, inverse) = draft.into_patches();
        assert!(forward.is_empty());
        assert!(inverse.is_empty());
    }

    #[test]
    fn test_draft_stale_replace_skipped() {
        let registry = contents::standard_registry();
        let base = vec![None];
        let mut draft = Draft::new(&base, &registry);
        draft.replace(0, contents::line::make(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        ));
        let (forward, _) = draft.into_patches();
        assert!(forward.is_empty());
    }

    #[test]
    fn test_draft_remove_diff() {
        let registry = contents::standard_registry();
        let line = contents::line::make(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let base = vec![Some(line.clone())];
        let mut draft = Draft::new(&base, &registry);
        draft.remove(0);
        let (forward, inverse) = draft.into_patches();
        assert_eq!(forward, vec![Patch::remove(vec![PathSeg::Index(0)])]);
        assert_eq!(inverse, vec![Patch::add(
            vec![PathSeg::Index(0)],
            line.value().clone(),
        )]);
    }
}
