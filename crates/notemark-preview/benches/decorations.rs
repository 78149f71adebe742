use criterion::{Criterion, black_box, criterion_group, criterion_main};
use notemark_core::{Selection, Viewport};
use notemark_preview::{BidiMode, DecorationEngine, compute_decorations, compute_directions};
use notemark_syntax::parse;

fn large_note(sections: usize) -> String {
    let mut out = String::with_capacity(sections * 160);
    for i in 0..sections {
        out.push_str(&format!(
            "## Section {i}\n\nSome **bold**, *italic*, ==marked== and `code` text with a [link](https://example.com/{i}).\n\n> quoted line {i}\n\n"
        ));
    }
    out
}

fn bench_full_recompute(c: &mut Criterion) {
    let text = large_note(2_000);
    let tree = parse(&text);
    let viewport = Viewport::new(0, tree.len());
    c.bench_function("decorations/full_document", |b| {
        b.iter(|| {
            let set = compute_decorations(black_box(&tree), &Selection::cursor(0), viewport);
            black_box(set.len());
        })
    });
}

fn bench_visible_range(c: &mut Criterion) {
    let text = large_note(2_000);
    let tree = parse(&text);
    let middle = tree.len() / 2;
    let viewport = Viewport::new(middle, middle + 4_000);
    c.bench_function("decorations/visible_range", |b| {
        b.iter(|| {
            let set = compute_decorations(black_box(&tree), &Selection::cursor(middle), viewport);
            black_box(set.len());
        })
    });
}

fn bench_cursor_moves(c: &mut Criterion) {
    let text = large_note(500);
    let tree = parse(&text);
    let viewport = Viewport::new(0, 8_000);
    c.bench_function("decorations/cursor_moves_100", |b| {
        let mut engine = DecorationEngine::new();
        b.iter(|| {
            for pos in (0..8_000).step_by(80) {
                let set = engine.decorations(1, &tree, &Selection::cursor(pos), viewport);
                black_box(set.len());
            }
        })
    });
}

fn bench_bidi_auto(c: &mut Criterion) {
    let text = large_note(2_000);
    let doc = notemark_core::Document::new(&text);
    let viewport = Viewport::new(0, doc.len_chars());
    c.bench_function("bidi/auto_full_document", |b| {
        b.iter(|| black_box(compute_directions(BidiMode::Auto, &doc, viewport).len()))
    });
}

criterion_group!(
    benches,
    bench_full_recompute,
    bench_visible_range,
    bench_cursor_moves,
    bench_bidi_auto
);
criterion_main!(benches);
