use criterion::{Criterion, black_box, criterion_group, criterion_main};
use quire::compositor::Painter;
use quire::renderer::{FontCache, Renderer};

const CSS: &str = "p { color: #333 } .note { background-color: lightyellow; border-radius: 4px } \
                   #main li b { font-weight: bold } div:has(p.note) { opacity: 0.9 }";

/// Synthetic article with nested lists, inline formatting and soft hyphens
fn sample_markup() -> String {
    let mut markup = String::from("<div id=main><h1>Benchmark</h1>");
    for i in 0..200 {
        markup.push_str(&format!(
            "<p class=note>Paragraph {i} with <b>bold</b>, <i>italic</i> and hyper&shy;con&shy;nected words.</p>\
             <ul><li>item <b>{i}</b></li><li>second &amp; last</li></ul>"
        ));
    }
    markup.push_str("</div>");
    markup
}

/// Benchmark group for each rendering stage
fn benchmark_rendering(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let markup = sample_markup();
    let renderer = Renderer::default();
    let fonts = FontCache::approximate();
    let painter = Painter::default();
    let sheet = renderer.parse_css(CSS);

    let mut group = c.benchmark_group("rendering");

    group.bench_function("html_parsing", |b| b.iter(|| renderer.parse_html(black_box(&markup))));

    group.bench_function("css_parsing", |b| b.iter(|| renderer.parse_css(black_box(CSS))));

    let mut doc = renderer.parse_html(&markup);
    group.bench_function("cascade", |b| {
        b.iter(|| renderer.compute_styles(black_box(&mut doc), std::slice::from_ref(&sheet)))
    });

    group.bench_function("layout", |b| b.iter(|| renderer.layout(black_box(&doc), &fonts)));

    let tree = renderer.layout(&doc, &fonts);
    group.bench_function("paint", |b| b.iter(|| painter.paint(black_box(&tree), &doc, &fonts)));

    group.finish();
}

criterion_group!(benches, benchmark_rendering);
criterion_main!(benches);
