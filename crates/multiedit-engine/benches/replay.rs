use criterion::{Criterion, criterion_group, criterion_main};
use multiedit_engine::{
    CompiledPattern, CursorSet, Direction, Document, EditOp, MacroApplier, OperationLog,
    SessionController, Settings, UnitKind,
};
mod common;

fn bench_mark_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("mark_all");
    group.sample_size(10);

    let content = common::generate_source(200);
    let doc = Document::new(&content);

    group.bench_function("literal", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let mut session = SessionController::new(Settings::default());
            let outcome = session.mark_all_instances(
                &mut d,
                Some(CompiledPattern::literal(std::hint::black_box("total")).unwrap()),
            );
            std::hint::black_box(outcome)
        });
    });

    group.bench_function("lines", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let mut session = SessionController::new(Settings::default());
            std::hint::black_box(session.mark_all_lines(&mut d))
        });
    });

    group.bench_function("defuns", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let mut session = SessionController::new(Settings::default());
            std::hint::black_box(session.mark_all_units(&mut d, UnitKind::Defun))
        });
    });

    // About 100 KB of prose, one cursor per word
    let prose = Document::new(&common::generate_prose(1600));

    group.bench_function("words_100kb", |b| {
        b.iter(|| {
            let mut d = prose.clone();
            let mut session = SessionController::new(Settings::default());
            std::hint::black_box(session.mark_all_units(&mut d, UnitKind::Word))
        });
    });

    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(10);

    let content = common::generate_prose(200);
    let doc = Document::new(&content);
    let offsets: Vec<usize> = content.match_indices("fox").map(|(start, _)| start).collect();
    let log = OperationLog::new(vec![
        EditOp::insert("["),
        EditOp::MoveByUnit {
            kind: UnitKind::Word,
            direction: Direction::Forward,
        },
        EditOp::insert("]"),
    ]);

    group.bench_function("wrap_word_200_cursors", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            let mut set = CursorSet::new();
            for &offset in &offsets {
                set.insert_bare(offset);
            }
            let count = MacroApplier::default()
                .apply(&mut d, std::hint::black_box(log.clone()), &mut set)
                .unwrap();
            std::hint::black_box(count)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_mark_all, bench_replay);
criterion_main!(benches);
