//! Benchmarks for mdocx layout and packaging.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic Markdown documents.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mdocx::chart::PendingCharts;
use mdocx::render::{column_lengths, layout_document, TableLayout};
use mdocx::{parse_markdown, DocxWriter, RenderOptions, StyleConfig};

/// Creates a Markdown document with the given number of sections.
fn create_test_markdown(sections: usize) -> String {
    let mut md = String::from("# 基准测试报告\n\n");
    for i in 0..sections {
        md.push_str(&format!("## 第{}节\n\n", i + 1));
        md.push_str(
            "这是一个包含**粗体**、*斜体*、`代码`和[链接](https://example.com)的段落，\
             用于测量布局性能。\n\n",
        );
        md.push_str("- 要点一\n- 要点二\n  - 子项\n\n");
        md.push_str("| 区域 | 指标 | 数值 |\n|---|---|---|\n");
        for row in 0..4 {
            md.push_str(&format!("| 华东 | 指标{} | {} |\n", row, row * 10));
        }
        md.push_str("\n> 引用说明文字。\n\n");
        md.push_str("```rust\nfn main() {}\n```\n\n");
    }
    md
}

/// Benchmark Markdown parsing at various sizes.
fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for sections in [1, 10, 50].iter() {
        let md = create_test_markdown(*sections);
        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| parse_markdown(black_box(&md)));
        });
    }

    group.finish();
}

/// Benchmark layout of a parsed tree.
fn bench_layout(c: &mut Criterion) {
    let config = StyleConfig::default();
    let options = RenderOptions::default();
    let mut group = c.benchmark_group("layout");

    for sections in [1, 10, 50].iter() {
        let root = parse_markdown(&create_test_markdown(*sections));
        group.bench_function(format!("{}_sections", sections), |b| {
            b.iter(|| layout_document(black_box(&root), &config, &options, PendingCharts::new()));
        });
    }

    group.finish();
}

/// Benchmark package serialization.
fn bench_packaging(c: &mut Criterion) {
    let config = StyleConfig::default();
    let root = parse_markdown(&create_test_markdown(10));
    let result = layout_document(&root, &config, &RenderOptions::default(), PendingCharts::new());
    let writer = DocxWriter::new();

    c.bench_function("docx_10_sections", |b| {
        b.iter(|| writer.to_bytes(black_box(&result.document)).unwrap());
    });
}

/// Benchmark column width allocation.
fn bench_column_widths(c: &mut Criterion) {
    let layout = TableLayout::default();
    let root = parse_markdown(&create_test_markdown(1));
    let table = root
        .descendants()
        .into_iter()
        .find_map(|n| match &n.kind {
            mdocx::NodeKind::Table(data) => Some(data.clone()),
            _ => None,
        })
        .unwrap();
    let lengths = column_lengths(&table);

    c.bench_function("column_widths", |b| {
        b.iter(|| layout.column_widths(black_box(&lengths)));
    });
}

criterion_group!(
    benches,
    bench_parsing,
    bench_layout,
    bench_packaging,
    bench_column_widths,
);
criterion_main!(benches);
