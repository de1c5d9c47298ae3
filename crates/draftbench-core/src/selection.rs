//! Selection and hover state, separated from content data.

use crate::content::SelectionPath;

/// Outcome of asking whether the current selection can satisfy a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// The paths that satisfy the command's predicate and count.
    pub result: Vec<SelectionPath>,
    /// Whether an explicit selection step must run before the command.
    pub need_select: bool,
}

/// Tracks the selected and hovered path sets and mediates the
/// select-then-operate / operate-then-select sequencing.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected: Vec<SelectionPath>,
    hovering: Vec<SelectionPath>,
    /// Optional cap on how many paths may be selected.
    pub max_selected: Option<usize>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[SelectionPath] {
        &self.selected
    }

    pub fn hovering(&self) -> &[SelectionPath] {
        &self.hovering
    }

    /// Replace the selection, honoring the cap.
    pub fn set_selected(&mut self, mut paths: Vec<SelectionPath>) {
        if let Some(max) = self.max_selected {
            paths.truncate(max);
        }
        self.selected = paths;
    }

    /// Add one path to the selection; duplicates are ignored.
    pub fn add_selected(&mut self, path: SelectionPath) {
        if self.selected.contains(&path) {
            return;
        }
        if self
            .max_selected
            .is_some_and(|max| self.selected.len() >= max)
        {
            return;
        }
        self.selected.push(path);
    }

    /// Toggle a path in or out of the selection.
    pub fn toggle_selected(&mut self, path: SelectionPath) {
        if let Some(pos) = self.selected.iter().position(|p| *p == path) {
            self.selected.remove(pos);
        } else {
            self.add_selected(path);
        }
    }

    pub fn clear_selected(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, path: SelectionPath) -> bool {
        self.selected.contains(&path)
            || (path.part.is_some()
                && self
                    .selected
                    .contains(&SelectionPath::whole(path.index)))
    }

    pub fn set_hovering(&mut self, paths: Vec<SelectionPath>) {
        self.hovering = paths;
    }

    pub fn clear_hovering(&mut self) {
        self.hovering.clear();
    }

    /// Drop selection/hover paths whose slot no longer holds content.
    pub fn retain_live(&mut self, live: impl Fn(usize) -> bool) {
        self.selected.retain(|p| live(p.index));
        self.hovering.retain(|p| live(p.index));
    }

    /// Rewrite slot indices through a compress remap; paths whose slot was
    /// dropped disappear.
    pub fn remap(&mut self, map: &std::collections::HashMap<usize, usize>) {
        let rewrite = |paths: &mut Vec<SelectionPath>| {
            paths.retain_mut(|p| match map.get(&p.index) {
                Some(&new_index) => {
                    p.index = new_index;
                    true
                }
                None => false,
            });
        };
        rewrite(&mut self.selected);
        rewrite(&mut self.hovering);
    }

    /// Check the current selection against a command's requirement.
    ///
    /// If enough of the current selection passes `predicate`, it is reused
    /// (operate-after-select); otherwise the caller must run an explicit
    /// selection step first (select-before-operate). `count` of `None`
    /// means "at least one".
    pub fn filter_selection(
        &self,
        predicate: impl Fn(SelectionPath) -> bool,
        count: Option<usize>,
        candidates: Option<&[SelectionPath]>,
    ) -> FilterOutcome {
        let source = candidates.unwrap_or(&self.selected);
        let result: Vec<SelectionPath> =
            source.iter().copied().filter(|p| predicate(*p)).collect();
        let need_select = match count {
            Some(required) => result.len() < required,
            None => result.is_empty(),
        };
        FilterOutcome {
            result,
            need_select,
        }
    }
}
