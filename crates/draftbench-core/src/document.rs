//! Document state: the content store, its patch log, and reference tracking.

use crate::content::Content;
use crate::error::EngineError;
use crate::patch::{Patch, PatchOp, PathSeg, apply_at, read_at};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Maximum number of undo entries to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// A distinct editing participant whose patches are merged into the store.
pub type PeerId = u64;

/// Where a committed transition originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Local,
    Remote(PeerId),
    Undo,
    Redo,
    /// Initial load, compress, or container switch: consumers rebuild
    /// rather than diff.
    BulkLoad,
}

/// Notification for one committed store transition.
///
/// `old` and `new` are full snapshots; slots are shared `Arc`s, so the
/// clones are cheap and consumers can diff by identity.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub origin: ChangeOrigin,
    pub patches: Vec<Patch>,
    pub old: Vec<Option<Content>>,
    pub new: Vec<Option<Content>>,
}

impl ChangeEvent {
    /// Slot indices whose content identity changed in this transition.
    pub fn touched_slots(&self) -> Vec<usize> {
        let len = self.old.len().max(self.new.len());
        (0..len)
            .filter(|&i| {
                let old = self.old.get(i).and_then(Option::as_ref);
                let new = self.new.get(i).and_then(Option::as_ref);
                match (old, new) {
                    (None, None) => false,
                    (Some(a), Some(b)) => a.identity() != b.identity(),
                    _ => true,
                }
            })
            .collect()
    }
}

/// One undoable transition: forward patches and the inverses computed at
/// commit time (never regenerated later).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatchPair {
    forward: Vec<Patch>,
    inverse: Vec<Patch>,
}

/// Cross-reference bookkeeping over the committed store.
///
/// Kept consistent by the document's commit path; destructive commands
/// consult `is_referenced` through their selection predicates.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    /// Slot → slots it references.
    outgoing: HashMap<usize, Vec<usize>>,
    /// Slot → slots referencing it.
    incoming: HashMap<usize, HashSet<usize>>,
}

impl ReferenceTracker {
    fn rebuild(&mut self, store: &[Option<Content>], registry: &Registry) {
        self.outgoing.clear();
        self.incoming.clear();
        for index in 0..store.len() {
            self.refresh_slot(index, store, registry);
        }
    }

    fn refresh_slot(&mut self, index: usize, store: &[Option<Content>], registry: &Registry) {
        if let Some(old) = self.outgoing.remove(&index) {
            for target in old {
                if let Some(set) = self.incoming.get_mut(&target) {
                    set.remove(&index);
                }
            }
        }
        let refs = store
            .get(index)
            .and_then(Option::as_ref)
            .and_then(|content| {
                registry
                    .model(content.type_tag())
                    .and_then(|m| m.ref_ids)
                    .map(|ref_ids| ref_ids(content))
            })
            .unwrap_or_default();
        for &target in &refs {
            self.incoming.entry(target).or_default().insert(index);
        }
        if !refs.is_empty() {
            self.outgoing.insert(index, refs);
        }
    }

    /// Whether any live content references the slot.
    pub fn is_referenced(&self, target: usize) -> bool {
        self.incoming.get(&target).is_some_and(|s| !s.is_empty())
    }

    /// The slots referencing a target, sorted.
    pub fn referrers(&self, target: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .incoming
            .get(&target)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }
}

/// The single source of truth for committed content, plus the forward/
/// inverse patch log that makes every transition auditable and reversible.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// Ordered content slots; `None` is a tombstone left by deletion so
    /// numeric references elsewhere stay valid.
    contents: Vec<Option<Content>>,
    #[serde(skip)]
    undo_stack: Vec<PatchPair>,
    #[serde(skip)]
    redo_stack: Vec<PatchPair>,
    #[serde(skip)]
    refs: ReferenceTracker,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            contents: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            refs: ReferenceTracker::default(),
        }
    }

    /// The committed slots.
    pub fn contents(&self) -> &[Option<Content>] {
        &self.contents
    }

    /// The content at a slot, if live.
    pub fn get(&self, index: usize) -> Option<&Content> {
        self.contents.get(index).and_then(Option::as_ref)
    }

    /// Slot count, tombstones included.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether no live content exists.
    pub fn is_empty(&self) -> bool {
        self.contents.iter().all(Option::is_none)
    }

    /// Indices of live slots.
    pub fn live_indices(&self) -> Vec<usize> {
        (0..self.contents.len())
            .filter(|&i| self.contents[i].is_some())
            .collect()
    }

    pub fn is_referenced(&self, target: usize) -> bool {
        self.refs.is_referenced(target)
    }

    pub fn references(&self) -> &ReferenceTracker {
        &self.refs
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Replace the whole store (initial load or container switch).
    /// History is cleared; consumers rebuild their derived structures.
    pub fn load(&mut self, contents: Vec<Option<Content>>, registry: &Registry) -> ChangeEvent {
        let old = std::mem::replace(&mut self.contents, contents);
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.refs.rebuild(&self.contents, registry);
        ChangeEvent {
            origin: ChangeOrigin::BulkLoad,
            patches: Vec::new(),
            old,
            new: self.contents.clone(),
        }
    }

    /// Commit a locally produced patch pair.
    ///
    /// Applies the forward patches, pushes the pair onto the undo stack,
    /// and clears the redo stack. Inverses for store truncations are
    /// synthesized here, at commit time, regardless of what the caller
    /// provided — by undo time the slots beyond the new length may have
    /// been overwritten, so a path-only inverse would be wrong.
    pub fn commit_local(
        &mut self,
        registry: &Registry,
        forward: Vec<Patch>,
        inverse: Vec<Patch>,
    ) -> Result<ChangeEvent, EngineError> {
        let inverse = if inverse.is_empty() || forward.iter().any(|p| p.is_length()) {
            invert_patches(&self.contents, &forward)?
        } else {
            inverse
        };
        let new = self.apply_validated(registry, &forward)?;
        let old = std::mem::replace(&mut self.contents, new);
        self.undo_stack.push(PatchPair {
            forward: forward.clone(),
            inverse,
        });
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        self.refresh_refs(registry, &old);
        Ok(ChangeEvent {
            origin: ChangeOrigin::Local,
            patches: forward,
            old,
            new: self.contents.clone(),
        })
    }

    /// Apply patches received from another operator.
    ///
    /// The local undo/redo stacks are left untouched so a later local
    /// `undo` cannot revert the other operator's edit. Patches are applied
    /// in receipt order; redundant replays are tolerated (remove/replace
    /// of an empty slot is a no-op).
    pub fn apply_remote(
        &mut self,
        registry: &Registry,
        forward: Vec<Patch>,
        _inverse: Vec<Patch>,
        peer: PeerId,
    ) -> Result<ChangeEvent, EngineError> {
        for patch in &forward {
            if let Some(slot) = patch.slot() {
                let pending = self
                    .undo_stack
                    .iter()
                    .flat_map(|pair| pair.forward.iter())
                    .any(|local| local.slot() == Some(slot));
                if pending {
                    log::warn!(
                        "remote patch from peer {peer} touches slot {slot} present in local history"
                    );
                }
            }
        }
        let new = self.apply_validated(registry, &forward)?;
        let old = std::mem::replace(&mut self.contents, new);
        self.refresh_refs(registry, &old);
        Ok(ChangeEvent {
            origin: ChangeOrigin::Remote(peer),
            patches: forward,
            old,
            new: self.contents.clone(),
        })
    }

    /// Revert the most recent local commit. No-op on an empty stack.
    pub fn undo(&mut self, registry: &Registry) -> Option<ChangeEvent> {
        let pair = self.undo_stack.pop()?;
        let new = match self.apply_validated(registry, &pair.inverse) {
            Ok(new) => new,
            Err(err) => {
                log::warn!("undo failed to apply recorded inverse: {err}");
                self.undo_stack.push(pair);
                return None;
            }
        };
        let patches = pair.inverse.clone();
        let old = std::mem::replace(&mut self.contents, new);
        self.redo_stack.push(pair);
        self.refresh_refs(registry, &old);
        Some(ChangeEvent {
            origin: ChangeOrigin::Undo,
            patches,
            old,
            new: self.contents.clone(),
        })
    }

    /// Re-apply the most recently undone commit. No-op on an empty stack.
    pub fn redo(&mut self, registry: &Registry) -> Option<ChangeEvent> {
        let pair = self.redo_stack.pop()?;
        let new = match self.apply_validated(registry, &pair.forward) {
            Ok(new) => new,
            Err(err) => {
                log::warn!("redo failed to apply recorded patches: {err}");
                self.redo_stack.push(pair);
                return None;
            }
        };
        let patches = pair.forward.clone();
        let old = std::mem::replace(&mut self.contents, new);
        self.undo_stack.push(pair);
        self.refresh_refs(registry, &old);
        Some(ChangeEvent {
            origin: ChangeOrigin::Redo,
            patches,
            old,
            new: self.contents.clone(),
        })
    }

    /// Permanently remove tombstoned slots and renumber live indices,
    /// rewriting every reference field through the registered
    /// `update_ref_id` capabilities. All-or-nothing; the caller must
    /// ensure no preview is pending. Because every slot path recorded in
    /// history becomes invalid, both history stacks are cleared.
    ///
    /// Returns the change event and the old→new index mapping so the
    /// caller can rewrite selection paths.
    pub fn compress(
        &mut self,
        registry: &Registry,
    ) -> Result<(ChangeEvent, HashMap<usize, usize>), EngineError> {
        let mut remap = HashMap::new();
        let mut packed: Vec<Option<Content>> = Vec::new();
        for (index, slot) in self.contents.iter().enumerate() {
            if let Some(content) = slot {
                remap.insert(index, packed.len());
                packed.push(Some(content.clone()));
            }
        }
        for slot in packed.iter_mut() {
            let Some(content) = slot.as_ref() else { continue };
            if let Some(update) = registry
                .model(content.type_tag())
                .and_then(|m| m.update_ref_id)
            {
                *slot = Some(update(content, &remap));
            }
        }
        let old = std::mem::replace(&mut self.contents, packed);
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.refs.rebuild(&self.contents, registry);
        Ok((
            ChangeEvent {
                origin: ChangeOrigin::BulkLoad,
                patches: Vec::new(),
                old,
                new: self.contents.clone(),
            },
            remap,
        ))
    }

    /// Serialize the document to JSON. History is runtime state and is
    /// not persisted.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON and rebuild reference tracking.
    pub fn from_json(json: &str, registry: &Registry) -> Result<Self, EngineError> {
        let mut doc: Document = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidDocument(e.to_string()))?;
        doc.refs.rebuild(&doc.contents, registry);
        Ok(doc)
    }

    /// Apply patches to a scratch copy, validate every touched live slot,
    /// and return the new store. The committed store is untouched on error.
    fn apply_validated(
        &self,
        registry: &Registry,
        patches: &[Patch],
    ) -> Result<Vec<Option<Content>>, EngineError> {
        let mut scratch = self.contents.clone();
        for patch in patches {
            apply_patch(&mut scratch, patch)?;
        }
        for (index, slot) in scratch.iter().enumerate() {
            let Some(content) = slot else { continue };
            let unchanged = self
                .contents
                .get(index)
                .and_then(Option::as_ref)
                .is_some_and(|old| old.identity() == content.identity());
            if unchanged {
                continue;
            }
            if let Some(is_valid) = registry
                .model(content.type_tag())
                .and_then(|m| m.is_valid)
            {
                if let Err(reason) = is_valid(content) {
                    return Err(EngineError::Validation { index, reason });
                }
            }
        }
        Ok(scratch)
    }

    fn refresh_refs(&mut self, registry: &Registry, old: &[Option<Content>]) {
        let len = old.len().max(self.contents.len());
        for index in 0..len {
            let before = old.get(index).and_then(Option::as_ref).map(Content::identity);
            let after = self.get(index).map(Content::identity);
            if before != after {
                self.refs.refresh_slot(index, &self.contents, registry);
            }
        }
    }
}

/// Apply one patch to a store.
fn apply_patch(store: &mut Vec<Option<Content>>, patch: &Patch) -> Result<(), EngineError> {
    if patch.is_length() {
        if patch.op != PatchOp::Replace {
            return Err(EngineError::MalformedPatch(
                "length patch must be a replace".into(),
            ));
        }
        let len = patch.length_value()?;
        store.resize(len, None);
        return Ok(());
    }
    let Some(PathSeg::Index(index)) = patch.path.first() else {
        return Err(EngineError::MalformedPatch(
            "store patch must start with a slot index or `length`".into(),
        ));
    };
    let index = *index;
    if patch.path.len() == 1 {
        match patch.op {
            PatchOp::Add => {
                let value = patch.value.clone().ok_or_else(|| {
                    EngineError::MalformedPatch("add without value".into())
                })?;
                if index >= store.len() {
                    store.resize(index + 1, None);
                }
                store[index] = Some(Content::from_value(value)?);
            }
            PatchOp::Replace => match store.get_mut(index) {
                Some(slot) if slot.is_some() => {
                    let value = patch.value.clone().ok_or_else(|| {
                        EngineError::MalformedPatch("replace without value".into())
                    })?;
                    *slot = Some(Content::from_value(value)?);
                }
                _ => log::debug!("replace of empty slot {index} ignored"),
            },
            PatchOp::Remove => match store.get_mut(index) {
                Some(slot) if slot.is_some() => *slot = None,
                _ => log::debug!("remove of empty slot {index} ignored"),
            },
        }
        return Ok(());
    }
    // Field-level patch inside a slot's value.
    match store.get_mut(index) {
        Some(Some(content)) => {
            let mut value: Value = content.value().clone();
            apply_at(&mut value, &patch.path[1..], patch.op, patch.value.as_ref())?;
            *content = Content::from_value(value)?;
        }
        _ => log::debug!("field patch for empty slot {index} ignored"),
    }
    Ok(())
}

/// Compute inverse patches for a forward list against a store snapshot.
///
/// Inverses are produced in undo-application order (reverse of the forward
/// order). A store truncation expands into an explicit length restore plus
/// one replace per live slot at-or-beyond the new length, captured now so
/// the inverse stays correct no matter what happens to those slots later.
pub fn invert_patches(
    store: &[Option<Content>],
    forward: &[Patch],
) -> Result<Vec<Patch>, EngineError> {
    let mut scratch: Vec<Option<Content>> = store.to_vec();
    let mut groups: Vec<Vec<Patch>> = Vec::new();
    for patch in forward {
        groups.push(invert_one(&scratch, patch)?);
        apply_patch(&mut scratch, patch)?;
    }
    groups.reverse();
    Ok(groups.into_iter().flatten().collect())
}

fn invert_one(store: &[Option<Content>], patch: &Patch) -> Result<Vec<Patch>, EngineError> {
    if patch.is_length() {
        let old_len = store.len();
        let new_len = patch.length_value()?;
        // Restore the length first, then refill every live slot at or
        // beyond the new length from values captured now. The refills are
        // adds, not replaces: after the re-extension those slots are
        // empty, and a replace of an empty slot is a no-op by contract.
        let mut group = vec![Patch::set_length(old_len)];
        for index in new_len..old_len {
            if let Some(content) = store.get(index).and_then(Option::as_ref) {
                group.push(Patch::add(
                    vec![PathSeg::Index(index)],
                    content.value().clone(),
                ));
            }
        }
        return Ok(group);
    }
    let Some(PathSeg::Index(index)) = patch.path.first() else {
        return Err(EngineError::MalformedPatch(
            "store patch must start with a slot index or `length`".into(),
        ));
    };
    let index = *index;
    let current = store.get(index).and_then(Option::as_ref);
    if patch.path.len() == 1 {
        let group = match (patch.op, current) {
            (PatchOp::Add, _) if index >= store.len() => {
                // The add extended the store; shrinking back drops the
                // padding slots along with it.
                vec![Patch::set_length(store.len())]
            }
            (PatchOp::Add | PatchOp::Replace, Some(old)) => vec![Patch::replace(
                vec![PathSeg::Index(index)],
                old.value().clone(),
            )],
            (PatchOp::Add, None) => vec![Patch::remove(vec![PathSeg::Index(index)])],
            (PatchOp::Remove, Some(old)) => vec![Patch::add(
                vec![PathSeg::Index(index)],
                old.value().clone(),
            )],
            // Forward op was an idempotent no-op on an empty slot.
            (PatchOp::Replace | PatchOp::Remove, None) => Vec::new(),
        };
        return Ok(group);
    }
    let Some(content) = current else {
        return Ok(Vec::new());
    };
    let old = read_at(content.value(), &patch.path[1..]);
    let group = match (patch.op, old) {
        (PatchOp::Add, Some(old)) => {
            // Adding over an existing object key; restore the old value.
            vec![Patch::replace(patch.path.clone(), old.clone())]
        }
        (PatchOp::Add, None) => vec![Patch::remove(patch.path.clone())],
        (PatchOp::Replace, Some(old)) => vec![Patch::replace(patch.path.clone(), old.clone())],
        (PatchOp::Remove, Some(old)) => vec![Patch::add(patch.path.clone(), old.clone())],
        (PatchOp::Replace | PatchOp::Remove, None) => Vec::new(),
    };
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents;
    use kurbo::Point;

    fn line_value(x1: f64, x2: f64) -> Value {
        contents::line::make(Point::new(x1, 0.0), Point::new(x2, 0.0))
            .value()
            .clone()
    }

    fn add_line(doc: &mut Document, registry: &Registry, x1: f64, x2: f64) -> usize {
        let index = doc.len();
        doc.commit_local(
            registry,
            vec![Patch::add(vec![PathSeg::Index(index)], line_value(x1, x2))],
            Vec::new(),
        )
        .unwrap();
        index
    }

    #[test]
    fn test_commit_and_undo_roundtrip() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        assert_eq!(doc.len(), 1);
        assert!(doc.can_undo());

        let before = doc.contents().to_vec();
        doc.undo(&registry).unwrap();
        assert_eq!(doc.len(), 0);
        doc.redo(&registry).unwrap();
        assert_eq!(doc.contents().len(), before.len());
        assert_eq!(
            doc.get(0).unwrap().value(),
            before[0].as_ref().unwrap().value()
        );
    }

    #[test]
    fn test_undo_empty_stack_is_noop() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        assert!(doc.undo(&registry).is_none());
        assert!(doc.redo(&registry).is_none());
    }

    #[test]
    fn test_commit_clears_redo() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        doc.undo(&registry).unwrap();
        assert!(doc.can_redo());
        add_line(&mut doc, &registry, 0.0, 20.0);
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_remote_does_not_touch_local_history() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        doc.apply_remote(
            &registry,
            vec![Patch::add(vec![PathSeg::Index(0)], line_value(0.0, 5.0))],
            Vec::new(),
            77,
        )
        .unwrap();
        add_line(&mut doc, &registry, 0.0, 10.0);
        assert_eq!(doc.len(), 2);
        // Local undo reverts only the local commit; the remote content and
        // the remote transition itself stay.
        doc.undo(&registry).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.get(0).is_some());
        assert!(doc.undo(&registry).is_none());
    }

    #[test]
    fn test_remote_replay_is_idempotent() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        let remove = vec![Patch::remove(vec![PathSeg::Index(0)])];
        doc.apply_remote(&registry, remove.clone(), Vec::new(), 7).unwrap();
        assert!(doc.get(0).is_none());
        // Replaying the same removal must not error.
        doc.apply_remote(&registry, remove, Vec::new(), 7).unwrap();
        assert!(doc.get(0).is_none());
    }

    #[test]
    fn test_truncation_inverse_restores_slots() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        add_line(&mut doc, &registry, 0.0, 20.0);
        add_line(&mut doc, &registry, 0.0, 30.0);
        let snapshot: Vec<_> = doc.contents().to_vec();

        doc.commit_local(&registry, vec![Patch::set_length(1)], Vec::new())
            .unwrap();
        assert_eq!(doc.len(), 1);

        // A remote commit lands between truncation and undo, overwriting
        // the one surviving slot.
        doc.apply_remote(
            &registry,
            vec![Patch::replace(vec![PathSeg::Index(0)], line_value(0.0, 99.0))],
            Vec::new(),
            9,
        )
        .unwrap();

        doc.undo(&registry).unwrap();
        assert_eq!(doc.len(), 3);
        // Slots beyond the truncation point come back from the inverses
        // captured at commit time.
        for i in 1..3 {
            assert_eq!(
                doc.get(i).unwrap().value(),
                snapshot[i].as_ref().unwrap().value(),
                "slot {i} not restored"
            );
        }
        // The remote edit below the truncation point is not reverted.
        assert_eq!(doc.get(0).unwrap().value(), &line_value(0.0, 99.0));
    }

    #[test]
    fn test_validation_rejects_commit() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        let bad = serde_json::json!({ "type": "polyline", "points": [{ "x": 0.0, "y": 0.0 }] });
        let result = doc.commit_local(
            &registry,
            vec![Patch::add(vec![PathSeg::Index(0)], bad)],
            Vec::new(),
        );
        assert!(matches!(result, Err(EngineError::Validation { index: 0, .. })));
        assert_eq!(doc.len(), 0);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_reference_tracking() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        let block = contents::block::make(Point::new(0.0, 0.0), vec![0]);
        doc.commit_local(
            &registry,
            vec![Patch::add(vec![PathSeg::Index(1)], block.value().clone())],
            Vec::new(),
        )
        .unwrap();
        assert!(doc.is_referenced(0));
        assert!(!doc.is_referenced(1));
        assert_eq!(doc.references().referrers(0), vec![1]);

        doc.commit_local(
            &registry,
            vec![Patch::remove(vec![PathSeg::Index(1)])],
            Vec::new(),
        )
        .unwrap();
        assert!(!doc.is_referenced(0));
    }

    #[test]
    fn test_compress_renumbers_and_rewrites_refs() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0); // 0, will be deleted
        add_line(&mut doc, &registry, 0.0, 20.0); // 1 → 0
        let block = contents::block::make(Point::new(0.0, 0.0), vec![1]);
        doc.commit_local(
            &registry,
            vec![Patch::add(vec![PathSeg::Index(2)], block.value().clone())],
            Vec::new(),
        )
        .unwrap(); // 2 → 1
        doc.commit_local(
            &registry,
            vec![Patch::remove(vec![PathSeg::Index(0)])],
            Vec::new(),
        )
        .unwrap();

        let (_, remap) = doc.compress(&registry).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(remap.get(&1), Some(&0));
        assert_eq!(remap.get(&2), Some(&1));
        let block = doc.get(1).unwrap();
        let children: Vec<usize> = block.get("children").unwrap().as_array().unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap() as usize)
            .collect();
        assert_eq!(children, vec![0]);
        assert!(doc.is_referenced(0));
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_json_roundtrip() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        doc.commit_local(
            &registry,
            vec![Patch::remove(vec![PathSeg::Index(0)])],
            Vec::new(),
        )
        .unwrap();
        add_line(&mut doc, &registry, 5.0, 15.0);

        let json = doc.to_json().unwrap();
        let back = Document::from_json(&json, &registry).unwrap();
        assert_eq!(back.len(), doc.len());
        assert!(back.get(0).is_none());
        assert_eq!(
            back.get(1).unwrap().value(),
            doc.get(1).unwrap().value()
        );
        // History is runtime state, not persisted.
        assert!(!back.can_undo());
    }

    #[test]
    fn test_field_level_patch_and_inverse() {
        let registry = contents::standard_registry();
        let mut doc = Document::new();
        add_line(&mut doc, &registry, 0.0, 10.0);
        let path = vec![
            PathSeg::Index(0),
            PathSeg::field("points"),
            PathSeg::Index(1),
            PathSeg::field("x"),
        ];
        doc.commit_local(
            &registry,
            vec![Patch::replace(path.clone(), serde_json::json!(42.0))],
            Vec::new(),
        )
        .unwrap();
        let moved = read_at(doc.get(0).unwrap().value(), &path[1..]).unwrap().clone();
        assert_eq!(moved, serde_json::json!(42.0));
        doc.undo(&registry).unwrap();
        let restored = read_at(doc.get(0).unwrap().value(), &path[1..]).unwrap().clone();
        assert_eq!(restored, serde_json::json!(10.0));
    }
}
