//! The editor facade: document, derived structures, and the command
//! state machine behind one pointer/keyboard timeline.

use crate::command::{
    CommandCtx, CommandEvent, CommandHandler, Draft, Flow, Mutation, PredicateCtx, SelectCount,
};
use crate::content::{Content, SelectionPath};
use crate::document::{ChangeEvent, ChangeOrigin, Document, PeerId};
use crate::error::EngineError;
use crate::geometry::GeometryCache;
use crate::input::{KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::math::{point_in_polygon, point_to_segment_dist, polyline_intersects_rect};
use crate::patch::Patch;
use crate::registry::Registry;
use crate::selection::SelectionController;
use crate::snap::{SnapConfig, SnapResult, resolve_snap};
use crate::spatial::SpatialIndex;
use crate::viewport::Viewport;
use kurbo::{Point, Rect};

/// Default snap/hit tolerance in screen pixels.
const PICK_TOLERANCE_PX: f64 = 10.0;
/// Pointer travel below this (in pixels) counts as a click, not a drag.
const CLICK_SLOP_PX: f64 = 4.0;

/// How pointer and keyboard events are routed.
enum OperationState {
    /// No tool active; pointer input builds the selection.
    Selecting,
    /// A command was invoked with an unmet selection requirement; input
    /// goes to selection until it is satisfied, then the command resumes.
    AwaitingSelection { name: &'static str },
    /// The command's own handler consumes events.
    Operating {
        name: &'static str,
        handler: Box<dyn CommandHandler>,
        repeats: bool,
    },
}

/// An in-progress pointer drag while selecting.
struct DragState {
    start: Point,
    current: Point,
    modifiers: Modifiers,
}

type ChangeSubscriber = Box<dyn FnMut(&ChangeEvent)>;

/// The interactive content-editing engine.
///
/// Owns the committed document, the derived spatial index and geometry
/// cache (maintained only through the change-notification path), the
/// selection controller, and the active command. All mutation flows
/// through the patch log; previews live in the active command and are
/// discarded on cancel, commit, or tool switch.
pub struct Editor {
    registry: Registry,
    document: Document,
    index: SpatialIndex,
    cache: GeometryCache,
    selection: SelectionController,
    operation: OperationState,
    drag: Option<DragState>,
    pub snap: SnapConfig,
    pub viewport: Viewport,
    subscribers: Vec<ChangeSubscriber>,
    last_error: Option<EngineError>,
}

impl Editor {
    /// Create an editor over a prepared registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            document: Document::new(),
            index: SpatialIndex::new(),
            cache: GeometryCache::new(),
            selection: SelectionController::new(),
            operation: OperationState::Selecting,
            drag: None,
            snap: SnapConfig::default(),
            viewport: Viewport::new(),
            subscribers: Vec::new(),
            last_error: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The committed slots.
    pub fn committed(&self) -> &[Option<Content>] {
        self.document.contents()
    }

    /// Subscribe to committed transitions (local and remote alike).
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ChangeEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// The most recent rejected operation, if any.
    pub fn take_last_error(&mut self) -> Option<EngineError> {
        self.last_error.take()
    }

    // -----------------------------------------------------------------
    // Commit surface

    /// Commit a host-prepared patch pair (property panels and other
    /// editor collaborators route every update through here).
    pub fn commit(&mut self, forward: Vec<Patch>, inverse: Vec<Patch>) -> Result<(), EngineError> {
        let event = self.document.commit_local(&self.registry, forward, inverse)?;
        self.after_change(&event);
        Ok(())
    }

    /// Merge patches received from another operator.
    pub fn apply_remote(
        &mut self,
        forward: Vec<Patch>,
        inverse: Vec<Patch>,
        peer: PeerId,
    ) -> Result<(), EngineError> {
        let event = self
            .document
            .apply_remote(&self.registry, forward, inverse, peer)?;
        self.after_change(&event);
        Ok(())
    }

    /// Revert the latest local commit. Returns false on an empty stack.
    pub fn undo(&mut self) -> bool {
        match self.document.undo(&self.registry) {
            Some(event) => {
                self.after_change(&event);
                true
            }
            None => false,
        }
    }

    /// Re-apply the latest undone commit. Returns false on an empty stack.
    pub fn redo(&mut self) -> bool {
        match self.document.redo(&self.registry) {
            Some(event) => {
                self.after_change(&event);
                true
            }
            None => false,
        }
    }

    /// Replace the whole store (initial load or container switch).
    /// Rejected while a command holds preview state.
    pub fn load(&mut self, contents: Vec<Option<Content>>) -> Result<(), EngineError> {
        if matches!(self.operation, OperationState::Operating { .. }) {
            return Err(EngineError::PendingPreview);
        }
        let event = self.document.load(contents, &self.registry);
        self.selection.clear_selected();
        self.selection.clear_hovering();
        self.after_change(&event);
        Ok(())
    }

    /// Permanently drop tombstoned slots, renumbering live content and
    /// every reference to it. Exclusive: rejected while a preview exists.
    pub fn compress(&mut self) -> Result<(), EngineError> {
        if matches!(self.operation, OperationState::Operating { .. }) {
            return Err(EngineError::PendingPreview);
        }
        let (event, remap) = self.document.compress(&self.registry)?;
        self.selection.remap(&remap);
        self.after_change(&event);
        Ok(())
    }

    /// Update one content through a mutator, committed as a patch pair.
    pub fn update_content(
        &mut self,
        index: usize,
        mutator: impl FnOnce(&Content) -> Content,
    ) -> Result<(), EngineError> {
        let mut draft = Draft::new(self.document.contents(), &self.registry);
        if let Some(current) = draft.get(index) {
            let updated = mutator(current);
            draft.replace(index, updated);
        }
        let (forward, inverse) = draft.into_patches();
        if forward.is_empty() {
            return Ok(());
        }
        self.commit(forward, inverse)
    }

    // -----------------------------------------------------------------
    // Queries

    /// All live, visible content whose bounding box intersects `region`.
    pub fn query_region(&self, region: Rect) -> Vec<usize> {
        self.index
            .query(region)
            .into_iter()
            .filter(|&i| self.document.get(i).is_some_and(Content::visible))
            .collect()
    }

    /// Resolve the best snap near `cursor`. Tolerance is in screen pixels
    /// and converted through the viewport.
    pub fn get_snap_point(&mut self, cursor: Point, tolerance_px: f64) -> SnapResult {
        let tolerance = self.viewport.pixels_to_model(tolerance_px);
        resolve_snap(
            cursor,
            tolerance,
            self.document.contents(),
            &self.registry,
            &self.index,
            &mut self.cache,
            &self.snap,
        )
    }

    pub fn get_selection(&self) -> &[SelectionPath] {
        self.selection.selected()
    }

    pub fn set_selection(&mut self, paths: Vec<SelectionPath>) {
        let live: Vec<SelectionPath> = paths
            .into_iter()
            .filter(|p| self.document.get(p.index).is_some())
            .collect();
        self.selection.set_selected(live);
    }

    pub fn hovering(&self) -> &[SelectionPath] {
        self.selection.hovering()
    }

    /// The active command's speculative contents, for rendering. Never
    /// indexed; the spatial index mirrors committed state only.
    pub fn preview(&self) -> Vec<Content> {
        match &self.operation {
            OperationState::Operating { handler, .. } => handler.preview(&CommandCtx {
                store: self.document.contents(),
                registry: &self.registry,
                selection: self.selection.selected(),
            }),
            _ => Vec::new(),
        }
    }

    /// Hit-test the active command's preview contents.
    ///
    /// Preview is never indexed (the spatial index mirrors committed
    /// state only), so this is a linear scan over the small preview set.
    /// Returns positions into the preview list.
    pub fn preview_hit_test(&self, position: Point, tolerance: f64) -> Vec<usize> {
        let preview = self.preview();
        let ctx = crate::registry::ModelCtx::new(self.document.contents(), &self.registry);
        preview
            .iter()
            .enumerate()
            .filter(|(_, content)| {
                let Some(compute) = self
                    .registry
                    .model(content.type_tag())
                    .and_then(|m| m.geometries)
                else {
                    return false;
                };
                let Ok(geometry) = compute(content, &ctx) else {
                    return false;
                };
                geometry
                    .lines
                    .iter()
                    .any(|(a, b)| point_to_segment_dist(position, *a, *b) <= tolerance)
                    || geometry
                        .regions
                        .iter()
                        .any(|region| point_in_polygon(position, region))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Editable feature points of one content, for in-place editing UIs.
    pub fn edit_points(&self, index: usize) -> Vec<crate::registry::EditPoint> {
        let Some(content) = self.document.get(index) else {
            return Vec::new();
        };
        self.registry
            .model(content.type_tag())
            .and_then(|m| m.edit_points)
            .map(|edit_points| edit_points(content))
            .unwrap_or_default()
    }

    /// Resolve a container's child slot under a picked point, when the
    /// container's type supports it.
    pub fn child_at(&self, index: usize, position: Point) -> Option<usize> {
        let content = self.document.get(index)?;
        let child_by_point = self
            .registry
            .model(content.type_tag())
            .and_then(|m| m.child_by_point)?;
        let ctx = crate::registry::ModelCtx::new(self.document.contents(), &self.registry);
        child_by_point(content, &ctx, position)
    }

    /// The name of the active or pending command.
    pub fn active_command(&self) -> Option<&'static str> {
        match &self.operation {
            OperationState::Selecting => None,
            OperationState::AwaitingSelection { name } => Some(name),
            OperationState::Operating { name, .. } => Some(name),
        }
    }

    // -----------------------------------------------------------------
    // Command state machine

    /// Invoke a command, optionally with an explicit selection.
    ///
    /// If the command's selection requirement is unmet, the engine parks
    /// in a selection gate and resumes the command automatically once
    /// pointer input has built a satisfying selection.
    pub fn start_operation(
        &mut self,
        name: &str,
        selection: Option<Vec<SelectionPath>>,
    ) -> Result<(), EngineError> {
        self.cancel_operation();
        let descriptor = self
            .registry
            .command(name)
            .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))?;
        let descriptor = *descriptor;
        if let Some(paths) = selection {
            self.set_selection(paths);
        }
        let outcome = {
            let ctx = PredicateCtx {
                store: self.document.contents(),
                registry: &self.registry,
                refs: self.document.references(),
            };
            let predicate = descriptor.select_predicate;
            let count = match descriptor.select_count {
                SelectCount::None => Some(0),
                SelectCount::AtLeast(n) => Some(n),
            };
            self.selection.filter_selection(
                |path| predicate.is_none_or(|p| p(&ctx, path)),
                count,
                None,
            )
        };
        if matches!(descriptor.select_count, SelectCount::AtLeast(_)) && outcome.need_select {
            self.operation = OperationState::AwaitingSelection {
                name: descriptor.name,
            };
            return Ok(());
        }
        self.selection.set_selected(outcome.result);
        self.operation = OperationState::Operating {
            name: descriptor.name,
            handler: (descriptor.build)(),
            repeats: descriptor.repeats,
        };
        self.dispatch(CommandEvent::Start);
        Ok(())
    }

    /// Abandon the active command and any pending selection gate. The
    /// in-progress preview is discarded, never committed.
    pub fn cancel_operation(&mut self) {
        if let OperationState::Operating { mut handler, .. } =
            std::mem::replace(&mut self.operation, OperationState::Selecting)
        {
            handler.reset();
        }
        self.drag = None;
    }

    /// Feed a pointer event through the state machine.
    pub fn on_pointer(&mut self, event: PointerEvent) {
        match &self.operation {
            OperationState::Selecting | OperationState::AwaitingSelection { .. } => {
                self.pointer_while_selecting(event);
            }
            OperationState::Operating { .. } => {
                let command_event = match event {
                    PointerEvent::Move { position } => CommandEvent::PointerMove {
                        position,
                        snap: self.get_snap_point(position, PICK_TOLERANCE_PX),
                    },
                    PointerEvent::Down {
                        position,
                        button,
                        modifiers,
                    } => CommandEvent::PointerDown {
                        position,
                        snap: self.get_snap_point(position, PICK_TOLERANCE_PX),
                        button,
                        modifiers,
                    },
                    PointerEvent::Up { position, .. } => CommandEvent::PointerUp { position },
                    PointerEvent::Scroll { .. } => return,
                };
                self.dispatch(command_event);
            }
        }
    }

    /// Feed a keyboard event through the state machine.
    pub fn on_key(&mut self, event: KeyEvent) {
        let KeyEvent::Pressed(key) = event else {
            return;
        };
        if key == "Escape" {
            self.cancel_operation();
            return;
        }
        match &self.operation {
            OperationState::Operating { .. } => {
                self.dispatch(CommandEvent::Key { key: &key });
            }
            OperationState::Selecting | OperationState::AwaitingSelection { .. } => {
                if let Some(descriptor) = self.registry.command_for_hotkey(&key) {
                    let name = descriptor.name;
                    if let Err(err) = self.start_operation(name, None) {
                        log::warn!("hotkey `{key}` failed to start {name}: {err}");
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, event: CommandEvent) {
        let OperationState::Operating {
            name,
            mut handler,
            repeats,
        } = std::mem::replace(&mut self.operation, OperationState::Selecting)
        else {
            return;
        };
        let flow = handler.on_event(
            &CommandCtx {
                store: self.document.contents(),
                registry: &self.registry,
                selection: self.selection.selected(),
            },
            event,
        );
        match flow {
            Flow::Continue => {
                self.operation = OperationState::Operating {
                    name,
                    handler,
                    repeats,
                };
            }
            Flow::Cancel => {
                handler.reset();
            }
            Flow::Commit(mutation) => {
                if let Err(err) = self.commit_mutation(mutation) {
                    log::warn!("command `{name}` commit rejected: {err}");
                    self.last_error = Some(err);
                }
                if repeats {
                    // Repeat commands re-enter Operating immediately for
                    // rapid repeated placement.
                    self.operation = OperationState::Operating {
                        name,
                        handler,
                        repeats,
                    };
                }
            }
        }
    }

    fn commit_mutation(&mut self, mutation: Mutation) -> Result<(), EngineError> {
        match mutation {
            Mutation::Patches { forward, inverse } => self.commit(forward, inverse),
            Mutation::Edit(edit) => {
                let mut draft = Draft::new(self.document.contents(), &self.registry);
                edit(&mut draft);
                let (forward, inverse) = draft.into_patches();
                if forward.is_empty() {
                    return Ok(());
                }
                self.commit(forward, inverse)
            }
        }
    }

    // -----------------------------------------------------------------
    // Selection input

    fn pointer_while_selecting(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                modifiers,
            } => {
                self.drag = Some(DragState {
                    start: position,
                    current: position,
                    modifiers,
                });
            }
            PointerEvent::Move { position } => {
                if let Some(drag) = &mut self.drag {
                    drag.current = position;
                } else {
                    let tolerance = self.viewport.pixels_to_model(PICK_TOLERANCE_PX);
                    let hits = self.hit_test_point(position, tolerance);
                    self.selection.set_hovering(match hits.first() {
                        Some(&top) => vec![top],
                        None => Vec::new(),
                    });
                }
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                let Some(drag) = self.drag.take() else {
                    return;
                };
                let slop = self.viewport.pixels_to_model(CLICK_SLOP_PX);
                if drag.start.distance(position) <= slop {
                    self.click_select(position, drag.modifiers);
                } else {
                    // Drag direction picks the marquee semantics:
                    // left-to-right encloses, right-to-left crosses.
                    let crossing = position.x < drag.start.x;
                    let rect = Rect::new(drag.start.x, drag.start.y, position.x, position.y);
                    let hits = self.hit_test_region(rect, crossing);
                    if drag.modifiers.shift {
                        for hit in hits {
                            self.selection.add_selected(hit);
                        }
                    } else {
                        self.selection.set_selected(hits);
                    }
                }
                self.resume_gated_command();
            }
            _ => {}
        }
    }

    fn click_select(&mut self, position: Point, modifiers: Modifiers) {
        let tolerance = self.viewport.pixels_to_model(PICK_TOLERANCE_PX);
        let hits = self.hit_test_point(position, tolerance);
        match hits.first() {
            Some(&top) => {
                if modifiers.shift {
                    self.selection.toggle_selected(top);
                } else {
                    self.selection.set_selected(vec![top]);
                }
            }
            None => {
                if !modifiers.shift {
                    self.selection.clear_selected();
                }
            }
        }
    }

    /// While a command waits for selection, re-check its gate after every
    /// selection change and resume it once satisfied.
    fn resume_gated_command(&mut self) {
        let OperationState::AwaitingSelection { name } = &self.operation else {
            return;
        };
        let name = *name;
        let Some(descriptor) = self.registry.command(name).copied() else {
            self.operation = OperationState::Selecting;
            return;
        };
        let outcome = {
            let ctx = PredicateCtx {
                store: self.document.contents(),
                registry: &self.registry,
                refs: self.document.references(),
            };
            let predicate = descriptor.select_predicate;
            let count = match descriptor.select_count {
                SelectCount::None => Some(0),
                SelectCount::AtLeast(n) => Some(n),
            };
            self.selection.filter_selection(
                |path| predicate.is_none_or(|p| p(&ctx, path)),
                count,
                None,
            )
        };
        if !outcome.need_select {
            self.selection.set_selected(outcome.result);
            self.operation = OperationState::Operating {
                name: descriptor.name,
                handler: (descriptor.build)(),
                repeats: descriptor.repeats,
            };
            self.dispatch(CommandEvent::Start);
        }
    }

    // -----------------------------------------------------------------
    // Hit-testing

    /// Contents under a point, front to back. With a part-mode command
    /// pending, the nearest sub-feature is addressed instead of the whole.
    pub fn hit_test_point(&mut self, position: Point, tolerance: f64) -> Vec<SelectionPath> {
        let part_mode = self
            .active_command()
            .and_then(|name| self.registry.command(name))
            .is_some_and(|d| d.select_part_mode);
        let region = Rect::new(
            position.x - tolerance,
            position.y - tolerance,
            position.x + tolerance,
            position.y + tolerance,
        );
        let mut hits: Vec<(f64, usize, Option<usize>)> = Vec::new();
        for slot in self.index.query(region) {
            let Some(content) = self.document.get(slot) else {
                continue;
            };
            if !content.visible() {
                continue;
            }
            let geometry = self
                .cache
                .geometries(slot, self.document.contents(), &self.registry);
            let mut best: Option<(f64, Option<usize>)> = None;
            for (part, (a, b)) in geometry.lines.iter().enumerate() {
                let dist = point_to_segment_dist(position, *a, *b);
                if dist <= tolerance && best.is_none_or(|(d, _)| dist < d) {
                    best = Some((dist, Some(part)));
                }
            }
            if best.is_none() {
                let filled = geometry
                    .regions
                    .iter()
                    .any(|region| point_in_polygon(position, region));
                if filled {
                    best = Some((tolerance, None));
                }
            }
            if let Some((dist, part)) = best {
                hits.push((dist, slot, part));
            }
        }
        // Front first: explicit z above, then later slots above earlier.
        hits.sort_by(|a, b| {
            let za = self.document.get(a.1).and_then(|c| c.z()).unwrap_or(0.0);
            let zb = self.document.get(b.1).and_then(|c| c.z()).unwrap_or(0.0);
            zb.partial_cmp(&za)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
        });
        hits.into_iter()
            .map(|(_, slot, part)| match part {
                Some(part) if part_mode => SelectionPath::part(slot, part),
                _ => SelectionPath::whole(slot),
            })
            .collect()
    }

    /// Contents in a marquee rectangle. Enclosing requires the bounding
    /// box fully inside; crossing also takes anything whose geometry
    /// intersects the rectangle.
    pub fn hit_test_region(&mut self, rect: Rect, crossing: bool) -> Vec<SelectionPath> {
        let rect = Rect::new(
            rect.x0.min(rect.x1),
            rect.y0.min(rect.y1),
            rect.x0.max(rect.x1),
            rect.y0.max(rect.y1),
        );
        let mut out = Vec::new();
        for slot in self.index.query(rect) {
            let Some(content) = self.document.get(slot) else {
                continue;
            };
            if !content.visible() {
                continue;
            }
            let geometry = self
                .cache
                .geometries(slot, self.document.contents(), &self.registry);
            let Some(bounding) = geometry.bounding else {
                continue;
            };
            let enclosed = rect.x0 <= bounding.x0
                && rect.y0 <= bounding.y0
                && rect.x1 >= bounding.x1
                && rect.y1 >= bounding.y1;
            let selected = if crossing {
                enclosed
                    || geometry.lines.iter().any(|(a, b)| {
                        polyline_intersects_rect(&[*a, *b], rect)
                    })
            } else {
                enclosed
            };
            if selected {
                out.push(SelectionPath::whole(slot));
            }
        }
        out
    }

    // -----------------------------------------------------------------
    // Derived-structure maintenance

    /// The sole maintenance path for the spatial index and geometry
    /// cache, driven by committed change notifications.
    fn after_change(&mut self, event: &ChangeEvent) {
        match event.origin {
            ChangeOrigin::BulkLoad => {
                // Linear rebuild beats incremental diffing at this
                // boundary.
                self.cache.clear();
                self.index.clear();
                for slot in 0..self.document.len() {
                    if self.document.get(slot).is_some() {
                        self.reindex_slot(slot);
                    }
                }
            }
            _ => {
                for slot in event.touched_slots() {
                    self.index.remove(slot);
                    if self.document.get(slot).is_some() {
                        self.reindex_slot(slot);
                    }
                }
                // Content whose geometry depends on a touched slot keeps a
                // stale bounding entry otherwise.
                for referrer in touched_referrers(event, &self.document) {
                    self.index.remove(referrer);
                    if self.document.get(referrer).is_some() {
                        self.reindex_slot(referrer);
                    }
                }
            }
        }
        self.cache.prune(self.document.contents());
        self.selection.retain_live(|index| {
            event
                .new
                .get(index)
                .and_then(Option::as_ref)
                .is_some()
        });
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }

    fn reindex_slot(&mut self, slot: usize) {
        let geometry = self
            .cache
            .geometries(slot, self.document.contents(), &self.registry);
        if let Some(bounding) = geometry.bounding {
            self.index.insert(slot, bounding);
        }
    }
}

/// Live slots whose geometry depends on a touched slot, transitively: a
/// block reference changes when a line inside its block does.
fn touched_referrers(event: &ChangeEvent, document: &Document) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = event.touched_slots();
    while let Some(slot) = queue.pop() {
        for referrer in document.references().referrers(slot) {
            if !out.contains(&referrer) {
                out.push(referrer);
                queue.push(referrer);
            }
        }
    }
    out
}
