//! Merge, split and compress benchmarks
//!
//! Run with: `cargo bench merge_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pdfgraft::{
    compress_document, merge_documents, split_document, Dictionary, Document, Object, SaveOptions,
    Stream,
};

/// A document of `pages` pages sharing one font and one image
fn create_document(pages: usize) -> Vec<u8> {
    let mut doc = Document::new();

    let mut font = Dictionary::new();
    font.set("Type", Object::name("Font"));
    font.set("Subtype", Object::name("Type1"));
    font.set("BaseFont", Object::name("Helvetica"));
    let font = doc.add_object(font);

    let image = doc.add_object(Stream::new(vec![0x7F; 4096]));

    let mut fonts = Dictionary::new();
    fonts.set("F1", font);
    let mut xobjects = Dictionary::new();
    xobjects.set("Im1", image);
    let mut resources = Dictionary::new();
    resources.set("Font", fonts);
    resources.set("XObject", xobjects);
    let resources = doc.add_object(resources);

    for i in 0..pages {
        let text = format!("BT /F1 12 Tf 72 720 Td (Page {i}) Tj ET q /Im1 Do Q");
        let content = doc.add_object(Stream::new(text.into_bytes()));
        let mut page = Dictionary::new();
        page.set("Type", Object::name("Page"));
        page.set("Resources", resources);
        page.set("Contents", content);
        let page = doc.add_object(page);
        let _ = doc.append_page(page);
    }

    doc.save(&SaveOptions::default()).unwrap_or_default()
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for pages in [1, 10, 100].iter() {
        let data = create_document(*pages);
        group.bench_with_input(BenchmarkId::new("pages", pages), &data, |b, data| {
            b.iter(|| Document::parse(black_box(data)))
        });
    }
    group.finish();
}

fn benchmark_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for pages in [1, 10, 100].iter() {
        let sources = vec![create_document(*pages), create_document(*pages)];
        group.bench_with_input(BenchmarkId::new("two_sources", pages), &sources, |b, sources| {
            b.iter(|| merge_documents(black_box(sources), Some(&[1, 0, 1])))
        });
    }
    group.finish();
}

fn benchmark_split(c: &mut Criterion) {
    let data = create_document(100);
    let mut group = c.benchmark_group("split");

    for count in [1i64, 10, 50].iter() {
        let numbers: Vec<i64> = (1..=*count).rev().collect();
        group.bench_with_input(BenchmarkId::new("pages", count), &numbers, |b, numbers| {
            b.iter(|| split_document(black_box(&data), black_box(numbers)))
        });
    }
    group.finish();
}

fn benchmark_compress(c: &mut Criterion) {
    let data = create_document(100);
    c.bench_function("compress_100_pages", |b| {
        b.iter(|| compress_document(black_box(&data)))
    });
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_merge,
    benchmark_split,
    benchmark_compress
);
criterion_main!(benches);
