#![allow(missing_docs)]

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use reunion_board_core::BoardSnapshot;
use reunion_board_core::event::BoardChange;
use reunion_board_core::model::{Section, Task, TaskCell};
use reunion_board_core::month::month_ids;
use reunion_board_core::status::CellStatus;

fn build_board(task_count: usize) -> BoardSnapshot {
    let section = Section {
        id: "bench".into(),
        name: "bench".into(),
        color: None,
        is_sub: false,
        sort_order: 0,
        is_open: true,
    };
    let tasks = (0..task_count)
        .map(|idx| Task {
            id: format!("task-{idx}").into(),
            section_id: section.id.clone(),
            name: format!("task {idx}"),
            due_date: None,
            sort_order: 0,
        })
        .collect();
    BoardSnapshot::assemble(vec![section], tasks, Vec::new(), Vec::new())
}

fn build_events(task_count: usize) -> Vec<BoardChange> {
    (0..task_count)
        .flat_map(|task| {
            month_ids().map(move |month_id| TaskCell {
                id: format!("cell-{task}-{month_id}").into(),
                task_id: format!("task-{task}").into(),
                month_id,
                content: Some(CellStatus::Planned),
                assignee: None,
                memo: None,
                cell_date: None,
            })
        })
        .map(|cell| BoardChange::cell_saved(cell, false))
        .collect()
}

fn fold_cells_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_cell_fold");
    for &task_count in &[8usize, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(task_count),
            &task_count,
            |b, &tasks| {
                let events = build_events(tasks);
                b.iter_batched(
                    || build_board(tasks),
                    |mut board| {
                        for event in &events {
                            board.apply(event);
                        }
                        black_box(board);
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, fold_cells_benchmark);
criterion_main!(benches);
