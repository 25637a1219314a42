//! Filtered, render-ready view of a [`BoardSnapshot`].

use std::fmt;
use std::ops::AddAssign;

use crate::model::{Milestone, Section};
use crate::text_matcher::TextMatcher;
use crate::{BoardSnapshot, SectionView, TaskView};

/// Status dimension of the board filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every task.
    #[default]
    All,
    /// Tasks with at least one done cell.
    Done,
    /// Tasks with at least one planned cell.
    Planned,
    /// Tasks with neither a done nor a planned cell.
    Undetermined,
}

impl StatusFilter {
    /// Apply the status rule to a task.
    #[must_use]
    pub fn matches(self, view: &TaskView) -> bool {
        match self {
            Self::All => true,
            Self::Done => view.is_completed(),
            Self::Planned => view.is_planned(),
            Self::Undetermined => view.is_undetermined(),
        }
    }
}

/// Search text plus status filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    /// Substring searched in task names as typed; empty matches everything.
    pub text: Option<String>,
    /// Status rule.
    pub status: StatusFilter,
}

impl BoardFilter {
    /// Filter that keeps every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// True when the filter hides nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status == StatusFilter::All && self.text.as_deref().is_none_or(str::is_empty)
    }

    fn matcher(&self) -> Option<TextMatcher> {
        self.text.as_deref().and_then(TextMatcher::new)
    }
}

/// Completed-task counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Tasks with at least one done cell.
    pub completed: usize,
    /// Tasks counted.
    pub total: usize,
}

impl Progress {
    /// Count completed tasks.
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a TaskView>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut acc, view| {
            acc.total += 1;
            if view.is_completed() {
                acc.completed += 1;
            }
            acc
        })
    }

    /// Whole percentage, half rounding up; 0 for an empty count.
    #[must_use]
    pub const fn percentage(self) -> usize {
        if self.total == 0 {
            return 0;
        }
        (200 * self.completed + self.total) / (2 * self.total)
    }
}

impl AddAssign for Progress {
    fn add_assign(&mut self, rhs: Self) {
        self.completed += rhs.completed;
        self.total += rhs.total;
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.completed, self.total, self.percentage())
    }
}

/// A section with its visible tasks.
#[derive(Debug, Clone)]
pub struct ProjectedSection<'a> {
    /// Section row.
    pub section: &'a Section,
    /// Tasks passing the filter, in snapshot order.
    pub tasks: Vec<&'a TaskView>,
    /// Progress over the visible tasks of the section.
    pub progress: Progress,
}

/// Render-ready board.
#[derive(Debug, Clone)]
pub struct BoardProjection<'a> {
    /// Every section, possibly with no visible task.
    pub sections: Vec<ProjectedSection<'a>>,
    /// Milestones, unfiltered.
    pub milestones: &'a [Milestone],
    /// Board-wide progress over the unfiltered snapshot.
    pub progress: Progress,
}

impl BoardProjection<'_> {
    /// Number of tasks passing the filter.
    #[must_use]
    pub fn visible_tasks(&self) -> usize {
        self.sections.iter().map(|section| section.tasks.len()).sum()
    }
}

/// Apply `filter` to `snapshot`.
#[must_use]
pub fn project<'a>(snapshot: &'a BoardSnapshot, filter: &BoardFilter) -> BoardProjection<'a> {
    let matcher = filter.matcher();
    let keep = |view: &TaskView| {
        matcher.as_ref().is_none_or(|m| m.matches(view)) && filter.status.matches(view)
    };

    let mut progress = Progress::default();
    let sections = snapshot
        .sections
        .iter()
        .map(|SectionView { section, tasks }| {
            progress += Progress::of(tasks);
            let kept: Vec<&TaskView> = tasks.iter().filter(|view| keep(*view)).collect();
            ProjectedSection {
                section,
                progress: Progress::of(kept.iter().copied()),
                tasks: kept,
            }
        })
        .collect();

    BoardProjection {
        sections,
        milestones: &snapshot.milestones,
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskCell};
    use crate::month::MonthId;
    use crate::status::CellStatus;

    fn view(id: &str, name: &str, cells: &[(i64, &str)]) -> TaskView {
        let cells = cells
            .iter()
            .enumerate()
            .map(|(idx, (month, content))| TaskCell {
                id: format!("{id}-c{idx}").into(),
                task_id: id.into(),
                month_id: MonthId::new(*month).unwrap_or_else(|err| panic!("month: {err}")),
                content: CellStatus::parse(content),
                assignee: None,
                memo: None,
                cell_date: None,
            })
            .collect();
        TaskView::new(
            Task {
                id: id.into(),
                section_id: "s1".into(),
                name: name.into(),
                due_date: None,
                sort_order: 0,
            },
            cells,
        )
    }

    fn board() -> BoardSnapshot {
        BoardSnapshot {
            sections: vec![
                SectionView {
                    section: Section {
                        id: "s1".into(),
                        name: "準備".into(),
                        color: None,
                        is_sub: false,
                        sort_order: 0,
                        is_open: true,
                    },
                    tasks: vec![
                        view("a", "会場予約", &[(3, "済")]),
                        view("b", "案内状発送", &[(5, "予定")]),
                        view("c", "名簿作成", &[]),
                    ],
                },
                SectionView {
                    section: Section {
                        id: "s2".into(),
                        name: "広報".into(),
                        color: None,
                        is_sub: true,
                        sort_order: 1,
                        is_open: true,
                    },
                    tasks: vec![view("d", "SNS告知", &[(2, "下見")])],
                },
            ],
            milestones: Vec::new(),
        }
    }

    fn visible(projection: &BoardProjection<'_>) -> Vec<String> {
        projection
            .sections
            .iter()
            .flat_map(|section| section.tasks.iter().map(|view| view.task.id.to_string()))
            .collect()
    }

    #[test]
    fn done_filter_keeps_tasks_with_done_cell() {
        let snapshot = board();
        let filter = BoardFilter {
            status: StatusFilter::Done,
            ..BoardFilter::default()
        };
        assert_eq!(visible(&project(&snapshot, &filter)), vec!["a"]);
    }

    #[test]
    fn undetermined_filter_excludes_done_and_planned() {
        let snapshot = board();
        let filter = BoardFilter {
            status: StatusFilter::Undetermined,
            ..BoardFilter::default()
        };
        assert_eq!(visible(&project(&snapshot, &filter)), vec!["c", "d"]);
    }

    #[test]
    fn text_and_status_combine_and_sections_survive() {
        let snapshot = board();
        let filter = BoardFilter {
            text: Some("案内".into()),
            status: StatusFilter::Planned,
        };
        let projection = project(&snapshot, &filter);
        assert_eq!(visible(&projection), vec!["b"]);
        assert_eq!(projection.sections.len(), 2);
        assert!(projection.sections[1].tasks.is_empty());
        assert_eq!(projection.visible_tasks(), 1);
    }

    #[test]
    fn board_progress_ignores_the_filter() {
        let snapshot = board();
        let filter = BoardFilter {
            text: Some("存在しない".into()),
            status: StatusFilter::All,
        };
        let projection = project(&snapshot, &filter);
        assert_eq!(projection.visible_tasks(), 0);
        assert_eq!(projection.progress, Progress { completed: 1, total: 4 });
        assert_eq!(projection.sections[0].progress, Progress::default());
        assert_eq!(projection.sections[1].progress.percentage(), 0);
    }

    #[test]
    fn section_progress_counts_only_visible_tasks() {
        let snapshot = board();
        let unfiltered = project(&snapshot, &BoardFilter::all());
        assert_eq!(unfiltered.sections[0].progress, Progress { completed: 1, total: 3 });

        let filter = BoardFilter {
            status: StatusFilter::Done,
            ..BoardFilter::default()
        };
        let projection = project(&snapshot, &filter);
        assert_eq!(projection.sections[0].progress, Progress { completed: 1, total: 1 });
        assert_eq!(projection.sections[0].progress.to_string(), "1/1 (100%)");
        assert_eq!(projection.sections[1].progress, Progress::default());
        assert_eq!(projection.progress, Progress { completed: 1, total: 4 });

        let by_name = project(
            &snapshot,
            &BoardFilter {
                text: Some("案内".into()),
                status: StatusFilter::All,
            },
        );
        assert_eq!(by_name.sections[0].progress, Progress { completed: 0, total: 1 });
    }

    #[test]
    fn percentage_rounds_half_up() {
        let pct = |completed, total| Progress { completed, total }.percentage();
        assert_eq!(pct(1, 3), 33);
        assert_eq!(pct(2, 3), 67);
        assert_eq!(pct(1, 2), 50);
        assert_eq!(pct(1, 8), 13);
        assert_eq!(pct(0, 0), 0);
        assert_eq!(pct(3, 3), 100);
    }

    #[test]
    fn empty_text_filter_is_empty() {
        assert!(BoardFilter::all().is_empty());
        assert!(
            BoardFilter {
                text: Some(String::new()),
                status: StatusFilter::All
            }
            .is_empty()
        );
        let spaced = BoardFilter {
            text: Some("  ".into()),
            status: StatusFilter::All,
        };
        assert!(!spaced.is_empty());
        assert_eq!(project(&board(), &spaced).visible_tasks(), 0);
    }
}
