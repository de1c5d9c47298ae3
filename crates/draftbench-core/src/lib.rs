//! Draftbench Core Library
//!
//! Interactive content-editing engine for a 2D CAD canvas: the content
//! model and its capability registry, the patch-based multi-writer
//! undo/redo log, the spatial index, the snap resolver, and the command
//! state machine. Rendering, property panels, and plugin loading are host
//! collaborators that talk to the [`Editor`] surface.

pub mod command;
pub mod commands;
pub mod content;
pub mod contents;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod math;
pub mod patch;
pub mod registry;
pub mod selection;
pub mod snap;
pub mod spatial;
pub mod viewport;

pub use command::{
    CommandCtx, CommandDescriptor, CommandEvent, CommandHandler, Draft, Flow, Mutation,
    PredicateCtx, SelectCount,
};
pub use content::{Content, SelectionPath};
pub use document::{ChangeEvent, ChangeOrigin, Document, PeerId, ReferenceTracker};
pub use editor::Editor;
pub use error::EngineError;
pub use geometry::{Geometries, GeometryCache};
pub use input::{KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use patch::{Patch, PatchOp, PathSeg};
pub use registry::{ContentModel, EditPoint, ModelCtx, Registry};
pub use selection::SelectionController;
pub use snap::{SnapConfig, SnapKind, SnapPoint, SnapResult, SnapTargetRef};
pub use spatial::SpatialIndex;
pub use viewport::Viewport;

/// A registry carrying the shipped content models and commands.
pub fn standard_registry() -> Registry {
    let mut registry = Registry::new();
    contents::register_models(&mut registry);
    commands::register_commands(&mut registry);
    registry
}

impl Editor {
    /// An editor over the shipped content models and commands.
    pub fn with_standard() -> Self {
        Editor::new(standard_registry())
    }
}
