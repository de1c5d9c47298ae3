//! Content model registry: capability tables keyed by type tag.

use crate::command::CommandDescriptor;
use crate::content::Content;
use crate::geometry::Geometries;
use crate::snap::SnapPoint;
use kurbo::{Point, Vec2};
use std::collections::HashMap;

/// Context handed to capability functions that must resolve other slots
/// (block instances, snap point collection over containers).
pub struct ModelCtx<'a> {
    pub store: &'a [Option<Content>],
    pub registry: &'a Registry,
    depth: std::cell::Cell<usize>,
}

/// Containers stop resolving past this depth; deeper chains (including
/// reference cycles) are treated as malformed and the cache degrades the
/// failing content to empty geometry.
const MAX_RESOLVE_DEPTH: usize = 8;

impl<'a> ModelCtx<'a> {
    pub fn new(store: &'a [Option<Content>], registry: &'a Registry) -> Self {
        Self {
            store,
            registry,
            depth: std::cell::Cell::new(0),
        }
    }

    /// The content at a slot, if the slot is live.
    pub fn content(&self, index: usize) -> Option<&Content> {
        self.store.get(index).and_then(Option::as_ref)
    }

    /// Uncached geometry of another slot, for containers that compose
    /// children. Child containers re-enter here, so the shared depth
    /// counter bounds cycles as well as honest nesting.
    pub fn geometries_of(&self, index: usize) -> Result<Geometries, String> {
        if self.depth.get() >= MAX_RESOLVE_DEPTH {
            return Err(format!("reference chain deeper than {MAX_RESOLVE_DEPTH}"));
        }
        let Some(content) = self.content(index) else {
            // A dangling reference renders as nothing rather than failing
            // the whole container.
            return Ok(Geometries::empty());
        };
        let Some(compute) = self
            .registry
            .model(content.type_tag())
            .and_then(|m| m.geometries)
        else {
            return Ok(Geometries::empty());
        };
        self.depth.set(self.depth.get() + 1);
        let out = compute(content, self);
        self.depth.set(self.depth.get() - 1);
        out
    }
}

/// One editable feature point of a content, for in-place point editing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditPoint {
    pub point: Point,
    /// Sub-feature the point belongs to, when addressable on its own.
    pub part: Option<usize>,
}

/// The capability table a content type registers.
///
/// Every field is optional: a type opts into exactly the operations that
/// make sense for it, and the generic engine checks for presence before
/// invoking — absence means "unsupported", surfaced through selection
/// predicates rather than commit-time failures. There is no inheritance
/// and no default implementation.
#[derive(Default, Clone, Copy)]
pub struct ContentModel {
    /// Type tag this table is registered under.
    pub type_tag: &'static str,
    /// Displace the content by a vector.
    pub translate: Option<fn(&Content, Vec2) -> Content>,
    /// Rotate around a center by radians.
    pub rotate: Option<fn(&Content, Point, f64) -> Content>,
    /// Mirror across the axis through two points.
    pub mirror: Option<fn(&Content, Point, Point) -> Content>,
    /// Split at the given points into pieces.
    pub break_at: Option<fn(&Content, &[Point]) -> Option<Vec<Content>>>,
    /// Decompose into simpler contents.
    pub explode: Option<fn(&Content, &ModelCtx) -> Option<Vec<Content>>>,
    /// Derived geometry; the cache memoizes this per identity.
    pub geometries: Option<fn(&Content, &ModelCtx) -> Result<Geometries, String>>,
    /// Editable feature points.
    pub edit_points: Option<fn(&Content) -> Vec<EditPoint>>,
    /// Fixed snap candidates (endpoints, midpoints, centers).
    pub snap_points: Option<fn(&Content, &ModelCtx) -> Vec<SnapPoint>>,
    /// Slot indices this content references.
    pub ref_ids: Option<fn(&Content) -> Vec<usize>>,
    /// Rewrite reference fields through an old→new index map.
    pub update_ref_id: Option<fn(&Content, &HashMap<usize, usize>) -> Content>,
    /// Structural validation; an Err blocks the commit.
    pub is_valid: Option<fn(&Content) -> Result<(), String>>,
    /// Resolve a child slot by a picked point (containers).
    pub child_by_point: Option<fn(&Content, &ModelCtx, Point) -> Option<usize>>,
}

/// Lookup table for content models and command descriptors.
///
/// Constructed once at startup and passed by reference to every component
/// that needs lookups; there is no ambient global registry. Plugins may
/// register in any order and must not assume others are present.
#[derive(Default)]
pub struct Registry {
    models: HashMap<&'static str, ContentModel>,
    commands: HashMap<&'static str, CommandDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content model under its type tag. Re-registration
    /// replaces the previous table (latest plugin wins).
    pub fn register_model(&mut self, model: ContentModel) {
        self.models.insert(model.type_tag, model);
    }

    /// The capability table for a type tag.
    pub fn model(&self, type_tag: &str) -> Option<&ContentModel> {
        self.models.get(type_tag)
    }

    /// Register a command descriptor under its name.
    pub fn register_command(&mut self, command: CommandDescriptor) {
        self.commands.insert(command.name, command);
    }

    /// The descriptor for a command name.
    pub fn command(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    /// The command bound to a hotkey, if any.
    pub fn command_for_hotkey(&self, key: &str) -> Option<&CommandDescriptor> {
        self.commands.values().find(|c| c.hotkey == Some(key))
    }

    /// Registered command names, sorted for deterministic listings.
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
