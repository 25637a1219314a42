//! Domain types, snapshot assembly and change reconciliation for the reunion board.

/// Calendar date display helpers.
pub mod date;
/// Model validation errors.
pub mod error;
/// Change feed payloads.
pub mod event;
/// Identifier types.
pub mod id;
/// Table row shapes.
pub mod model;
/// The fixed month axis.
pub mod month;
/// Filtered, render-ready views and progress counters.
pub mod projection;
/// Cell status vocabulary.
pub mod status;
/// Case-insensitive search.
pub mod text_matcher;

use crate::event::{BoardChange, ChangeAction, RowChange};
use crate::event::{CellKey, MilestoneKey, SectionKey, TaskKey};
use crate::id::{CellId, SectionId, TaskId};
use crate::model::{Milestone, Section, SectionPatch, Task, TaskCell, TaskPatch};
use crate::month::MonthId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub use crate::error::ModelError;
pub use crate::event::BoardUpdate;
pub use crate::projection::{BoardFilter, BoardProjection, Progress, ProjectedSection, StatusFilter};
pub use crate::status::CellStatus;

/// A task together with its cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    /// Task row.
    #[serde(flatten)]
    pub task: Task,
    /// At most one cell per month.
    #[serde(default)]
    pub cells: Vec<TaskCell>,
}

impl TaskView {
    /// Wrap a task row with the given cells.
    #[must_use]
    pub const fn new(task: Task, cells: Vec<TaskCell>) -> Self {
        Self { task, cells }
    }

    /// Cell occupying the given month, if any.
    #[must_use]
    pub fn cell(&self, month_id: MonthId) -> Option<&TaskCell> {
        self.cells.iter().find(|cell| cell.month_id == month_id)
    }

    /// True when at least one cell is done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.cells.iter().any(TaskCell::is_done)
    }

    /// True when at least one cell is planned.
    #[must_use]
    pub fn is_planned(&self) -> bool {
        self.cells.iter().any(TaskCell::is_planned)
    }

    /// True when no cell is done or planned. Free-text cells do not count.
    #[must_use]
    pub fn is_undetermined(&self) -> bool {
        !self.is_completed() && !self.is_planned()
    }

    /// Remove the cell with `old_id`, append `new`, keep one cell per id and per month.
    ///
    /// Returns `true` when the cell list changed.
    fn fold_cell(&mut self, old_id: Option<&CellId>, new: Option<&TaskCell>) -> bool {
        let before = self.cells.len();
        if let Some(old_id) = old_id {
            self.cells.retain(|cell| &cell.id != old_id);
        }
        let removed = self.cells.len() != before;

        let Some(cell) = new else {
            return removed;
        };
        self.cells
            .retain(|existing| existing.id == cell.id || existing.month_id != cell.month_id);
        self.cells.push(cell.clone());
        dedup_keep_last(&mut self.cells);
        true
    }
}

/// A section together with its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionView {
    /// Section row.
    #[serde(flatten)]
    pub section: Section,
    /// Tasks in display order.
    #[serde(default)]
    pub tasks: Vec<TaskView>,
}

/// Whether a fold changed the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// The snapshot was modified.
    Applied,
    /// Nothing matched; the snapshot is unchanged.
    Ignored,
}

impl FoldOutcome {
    /// True for [`FoldOutcome::Applied`].
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    const fn from_changed(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::Ignored }
    }
}

/// Nested Sections → Tasks → Cells plus the flat milestone list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Sections in display order.
    pub sections: Vec<SectionView>,
    /// At most one milestone per month.
    pub milestones: Vec<Milestone>,
}

impl BoardSnapshot {
    /// Nest independently fetched rows.
    ///
    /// Tasks keep their input order within each section and cells keep theirs within each
    /// task. Tasks pointing at an unknown section are left out, and so are their cells.
    #[must_use]
    pub fn assemble(
        sections: Vec<Section>,
        tasks: Vec<Task>,
        cells: Vec<TaskCell>,
        milestones: Vec<Milestone>,
    ) -> Self {
        let mut cells_by_task: HashMap<TaskId, Vec<TaskCell>> = HashMap::new();
        for cell in cells {
            cells_by_task.entry(cell.task_id.clone()).or_default().push(cell);
        }

        let mut tasks_by_section: HashMap<SectionId, Vec<TaskView>> = HashMap::new();
        for task in tasks {
            let cells = cells_by_task.remove(&task.id).unwrap_or_default();
            tasks_by_section
                .entry(task.section_id.clone())
                .or_default()
                .push(TaskView::new(task, cells));
        }

        let sections = sections
            .into_iter()
            .map(|section| SectionView {
                tasks: tasks_by_section.remove(&section.id).unwrap_or_default(),
                section,
            })
            .collect();

        Self {
            sections,
            milestones,
        }
    }

    /// Iterate every task across sections.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskView> {
        self.sections.iter().flat_map(|section| section.tasks.iter())
    }

    /// Look up a section.
    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&SectionView> {
        self.sections.iter().find(|view| &view.section.id == id)
    }

    /// Look up a task in any section.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&TaskView> {
        self.tasks().find(|view| &view.task.id == id)
    }

    /// Cell at a task/month slot.
    #[must_use]
    pub fn cell(&self, task_id: &TaskId, month_id: MonthId) -> Option<&TaskCell> {
        self.task(task_id).and_then(|view| view.cell(month_id))
    }

    /// Milestone for a month.
    #[must_use]
    pub fn milestone(&self, month_id: MonthId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.month_id == month_id)
    }

    fn section_mut(&mut self, id: &SectionId) -> Option<&mut SectionView> {
        self.sections.iter_mut().find(|view| &view.section.id == id)
    }

    fn task_mut(&mut self, id: &TaskId) -> Option<&mut TaskView> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.tasks.iter_mut())
            .find(|view| &view.task.id == id)
    }

    fn owner_of_cell(&self, cell_id: &CellId) -> Option<TaskId> {
        self.tasks()
            .find(|view| view.cells.iter().any(|cell| &cell.id == cell_id))
            .map(|view| view.task.id.clone())
    }

    /// Fold a live change or a local editor result into the snapshot.
    pub fn fold(&mut self, update: &BoardUpdate) -> FoldOutcome {
        match update {
            BoardUpdate::Change(change) => self.apply(change),
            BoardUpdate::TaskCreated(view) => self.insert_task_view(view),
            BoardUpdate::SectionCreated(section) => self.insert_section(section),
        }
    }

    /// Apply one change event in place.
    pub fn apply(&mut self, change: &BoardChange) -> FoldOutcome {
        match change {
            BoardChange::Section(row) => self.apply_section(row),
            BoardChange::Task(row) => self.apply_task(row),
            BoardChange::Cell(row) => self.apply_cell(row),
            BoardChange::Milestone(row) => self.apply_milestone(row),
        }
    }

    fn apply_cell(&mut self, row: &RowChange<TaskCell, CellKey>) -> FoldOutcome {
        let old_id = row.old.as_ref().map(|old| &old.id);
        let stale_id = old_id.or_else(|| row.new.as_ref().map(|cell| &cell.id));
        let previous_owner = row
            .old
            .as_ref()
            .and_then(|old| old.task_id.clone())
            .or_else(|| stale_id.and_then(|id| self.owner_of_cell(id)));
        let new_owner = row.new.as_ref().map(|cell| &cell.task_id);

        let mut changed = false;
        // A cell id lives in exactly one task; leaving owners drop it first.
        if let Some(previous) = previous_owner.filter(|owner| new_owner != Some(owner))
            && let Some(view) = self.task_mut(&previous)
        {
            changed |= view.fold_cell(stale_id, None);
        }
        if let Some(cell) = &row.new
            && let Some(view) = self.task_mut(&cell.task_id)
        {
            changed |= view.fold_cell(old_id, Some(cell));
        }
        FoldOutcome::from_changed(changed)
    }

    fn apply_task(&mut self, row: &RowChange<TaskPatch, TaskKey>) -> FoldOutcome {
        match row.action {
            ChangeAction::Delete => {
                let id = row
                    .old
                    .as_ref()
                    .map(|old| &old.id)
                    .or_else(|| row.new.as_ref().map(|patch| &patch.id));
                id.map_or(FoldOutcome::Ignored, |id| self.remove_task(id))
            }
            ChangeAction::Insert | ChangeAction::Update => {
                let Some(patch) = &row.new else {
                    return FoldOutcome::Ignored;
                };
                // Unknown tasks only enter through the add-task fold, which carries their cells.
                let Some(view) = self.task_mut(&patch.id) else {
                    return FoldOutcome::Ignored;
                };
                patch.apply_to(&mut view.task);
                FoldOutcome::Applied
            }
        }
    }

    fn remove_task(&mut self, id: &TaskId) -> FoldOutcome {
        let mut removed = false;
        for section in &mut self.sections {
            let before = section.tasks.len();
            section.tasks.retain(|view| &view.task.id != id);
            removed |= section.tasks.len() != before;
        }
        FoldOutcome::from_changed(removed)
    }

    fn apply_milestone(&mut self, row: &RowChange<Milestone, MilestoneKey>) -> FoldOutcome {
        match row.action {
            ChangeAction::Delete => {
                let month = row
                    .old
                    .as_ref()
                    .map(|old| old.month_id)
                    .or_else(|| row.new.as_ref().map(|m| m.month_id));
                let Some(month) = month else {
                    return FoldOutcome::Ignored;
                };
                let before = self.milestones.len();
                self.milestones.retain(|m| m.month_id != month);
                FoldOutcome::from_changed(self.milestones.len() != before)
            }
            ChangeAction::Insert | ChangeAction::Update => {
                let Some(milestone) = &row.new else {
                    return FoldOutcome::Ignored;
                };
                if let Some(existing) = self
                    .milestones
                    .iter_mut()
                    .find(|m| m.month_id == milestone.month_id)
                {
                    existing.clone_from(milestone);
                } else {
                    self.milestones.push(milestone.clone());
                }
                FoldOutcome::Applied
            }
        }
    }

    fn apply_section(&mut self, row: &RowChange<SectionPatch, SectionKey>) -> FoldOutcome {
        if row.action == ChangeAction::Delete {
            return FoldOutcome::Ignored;
        }
        let Some(patch) = &row.new else {
            return FoldOutcome::Ignored;
        };
        let Some(view) = self.section_mut(&patch.id) else {
            return FoldOutcome::Ignored;
        };
        patch.apply_to(&mut view.section);
        FoldOutcome::Applied
    }

    fn insert_task_view(&mut self, view: &TaskView) -> FoldOutcome {
        let target = &view.task.section_id;
        if self.section(target).is_none() {
            return FoldOutcome::Ignored;
        }
        for section in &mut self.sections {
            if &section.section.id != target {
                section.tasks.retain(|existing| existing.task.id != view.task.id);
            }
        }

        let mut view = view.clone();
        dedup_keep_last(&mut view.cells);
        let Some(section) = self.section_mut(target) else {
            return FoldOutcome::Ignored;
        };
        if let Some(existing) = section
            .tasks
            .iter_mut()
            .find(|existing| existing.task.id == view.task.id)
        {
            *existing = view;
        } else {
            section.tasks.push(view);
        }
        FoldOutcome::Applied
    }

    fn insert_section(&mut self, section: &Section) -> FoldOutcome {
        if let Some(existing) = self.section_mut(&section.id) {
            existing.section.clone_from(section);
        } else {
            self.sections.push(SectionView {
                section: section.clone(),
                tasks: Vec::new(),
            });
        }
        FoldOutcome::Applied
    }
}

/// Pure form of [`BoardSnapshot::apply`]: returns the folded copy.
#[must_use]
pub fn apply_change(snapshot: &BoardSnapshot, change: &BoardChange) -> BoardSnapshot {
    let mut next = snapshot.clone();
    next.apply(change);
    next
}

fn dedup_keep_last(cells: &mut Vec<TaskCell>) {
    let mut seen = HashSet::new();
    let mut kept: Vec<TaskCell> = cells
        .drain(..)
        .rev()
        .filter(|cell| seen.insert(cell.id.clone()))
        .collect();
    kept.reverse();
    *cells = kept;
}
