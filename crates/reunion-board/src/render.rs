//! Plain-text rendering of a board projection.

use std::io::{self, Write};

use reunion_board_app::BoardSettings;
use reunion_board_core::date::{days_until, iso, short_date};
use reunion_board_core::model::TaskCell;
use reunion_board_core::month::{MONTHS, Month, MonthId};
use reunion_board_core::status::CellStatus;
use reunion_board_core::{BoardProjection, ProjectedSection, TaskView};
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

const NAME_WIDTH: usize = 14;
const COLUMN_WIDTH: usize = 7;
const GLYPH_LIMIT: usize = 2;

const DONE_GLYPH: &str = "✓";
const PLANNED_GLYPH: &str = "●";
const EMPTY_GLYPH: &str = "·";
const CURRENT_MARKER: &str = "▶";
const MAIN_MARKER: &str = "★";

/// Write the header, month axis, milestones and every visible section.
pub fn render_board(
    out: &mut impl Write,
    projection: &BoardProjection<'_>,
    settings: &BoardSettings,
    today: Date,
) -> io::Result<()> {
    writeln!(
        out,
        "{} | 進捗 {}",
        countdown(settings.event_date(), today),
        projection.progress
    )?;
    writeln!(out, "{}", axis_line(settings.current_month()))?;

    for milestone in projection.milestones {
        let marker = if milestone.is_main { MAIN_MARKER } else { " " };
        writeln!(out, "{marker} {:<6} {}", milestone.month_id.month().label, milestone.text)?;
    }

    for section in &projection.sections {
        writeln!(out)?;
        render_section(out, section)?;
    }
    Ok(())
}

fn render_section(out: &mut impl Write, projected: &ProjectedSection<'_>) -> io::Result<()> {
    let section = projected.section;
    let fold = if section.is_open { "▾" } else { "▸" };
    writeln!(out, "{fold} {} {}", section.name, projected.progress)?;
    if !section.is_open {
        return Ok(());
    }
    for view in &projected.tasks {
        writeln!(out, "{}", task_line(view))?;
    }
    Ok(())
}

fn countdown(event_date: Date, today: Date) -> String {
    match days_until(event_date, today) {
        0 => format!("本日開催 ({})", iso(event_date)),
        days if days < 0 => format!("開催済み ({})", iso(event_date)),
        days => format!("あと {days} 日 ({})", iso(event_date)),
    }
}

fn axis_line(current: MonthId) -> String {
    let mut line = pad("", NAME_WIDTH);
    for month in &MONTHS {
        line.push_str(&pad(&axis_label(month, current), COLUMN_WIDTH));
    }
    line.trim_end().to_owned()
}

fn axis_label(month: &Month, current: MonthId) -> String {
    let mut label = String::new();
    if month.id == current {
        label.push_str(CURRENT_MARKER);
    }
    label.push_str(month.label);
    if month.is_main {
        label.push_str(MAIN_MARKER);
    }
    label
}

fn task_line(view: &TaskView) -> String {
    let mut name = view.task.name.clone();
    if let Some(due) = view.task.due_date {
        name = format!("{name} 〆{}", short_date(due));
    }
    let mut line = pad(&format!("  {name}"), NAME_WIDTH);
    for month in &MONTHS {
        line.push_str(&pad(&cell_glyph(view.cell(month.id)), COLUMN_WIDTH));
    }
    line.trim_end().to_owned()
}

/// Glyph of one grid cell.
pub fn cell_glyph(cell: Option<&TaskCell>) -> String {
    match cell.and_then(|cell| cell.content.as_ref()) {
        None => EMPTY_GLYPH.to_owned(),
        Some(CellStatus::Done) => DONE_GLYPH.to_owned(),
        Some(CellStatus::Planned) => PLANNED_GLYPH.to_owned(),
        Some(CellStatus::Custom(text)) => text.trim().graphemes(true).take(GLYPH_LIMIT).collect(),
    }
}

/// Truncate or right-pad to `width` graphemes, keeping one trailing space.
fn pad(text: &str, width: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    let keep = graphemes.len().min(width.saturating_sub(1));
    let mut padded: String = graphemes[..keep].concat();
    padded.push_str(&" ".repeat(width - keep));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use reunion_board_core::model::{Milestone, Section, Task};
    use reunion_board_core::projection::project;
    use reunion_board_core::{BoardFilter, BoardSnapshot};
    use time::macros::date;

    fn cell(content: &str) -> TaskCell {
        TaskCell {
            id: "c1".into(),
            task_id: "t1".into(),
            month_id: MonthId::MAIN_EVENT,
            content: CellStatus::parse(content),
            assignee: None,
            memo: None,
            cell_date: None,
        }
    }

    #[test]
    fn glyphs_cover_every_status() {
        assert_eq!(cell_glyph(None), "·");
        assert_eq!(cell_glyph(Some(&cell("済"))), "✓");
        assert_eq!(cell_glyph(Some(&cell("予定"))), "●");
        assert_eq!(cell_glyph(Some(&cell("未定"))), "·");
        assert_eq!(cell_glyph(Some(&cell("下見に行く"))), "下見");
        assert_eq!(cell_glyph(Some(&cell("👨‍👩‍👧‍👦OK"))), "👨‍👩‍👧‍👦O");
    }

    #[test]
    fn countdown_handles_past_and_today() {
        let event = date!(2026 - 10 - 17);
        assert_eq!(countdown(event, date!(2026 - 10 - 7)), "あと 10 日 (2026-10-17)");
        assert_eq!(countdown(event, event), "本日開催 (2026-10-17)");
        assert_eq!(countdown(event, date!(2026 - 10 - 18)), "開催済み (2026-10-17)");
    }

    #[test]
    fn pad_truncates_long_names() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("同窓会の会場予約", 4), "同窓会 ");
    }

    #[test]
    fn renders_collapsed_sections_without_tasks() -> io::Result<()> {
        let mut open = Section {
            id: "s1".into(),
            name: "準備".into(),
            color: None,
            is_sub: false,
            sort_order: 0,
            is_open: true,
        };
        let mut closed = open.clone();
        closed.id = "s2".into();
        closed.name = "当日".into();
        closed.sort_order = 1;
        closed.is_open = false;
        open.color = Some("blue".into());

        let mut done = cell("済");
        done.month_id = MonthId::new(1).unwrap_or_else(|err| panic!("month: {err}"));
        let snapshot = BoardSnapshot::assemble(
            vec![open, closed],
            vec![
                Task {
                    id: "t1".into(),
                    section_id: "s1".into(),
                    name: "会場予約".into(),
                    due_date: Some(date!(2026 - 2 - 14)),
                    sort_order: 0,
                },
                Task {
                    id: "t2".into(),
                    section_id: "s2".into(),
                    name: "受付".into(),
                    due_date: None,
                    sort_order: 0,
                },
            ],
            vec![done],
            vec![Milestone {
                month_id: MonthId::MAIN_EVENT,
                text: "同窓会".into(),
                is_main: true,
            }],
        );

        let mut out = Vec::new();
        let projection = project(&snapshot, &BoardFilter::all());
        render_board(&mut out, &projection, &BoardSettings::default(), date!(2026 - 10 - 7))?;
        let text = String::from_utf8_lossy(&out);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "あと 10 日 (2026-10-17) | 進捗 1/2 (50%)");
        assert!(lines[1].contains("▶R8.2"));
        assert!(lines[1].ends_with("R8.10★"));
        assert_eq!(lines[2], "★ R8.10  同窓会");
        assert!(text.contains("▾ 準備 1/1 (100%)"));
        assert!(text.contains("会場予約 〆2/14"));
        assert!(text.contains("▸ 当日 0/1 (0%)"));
        assert!(!text.contains("受付"));
        Ok(())
    }
}
