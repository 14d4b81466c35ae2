use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use menu_core::{
    ActionRegistry,
    composition::{CompositionEngine, DynamicFilter, FilterMode, default_compositions, render_text},
    registry::{HandlerRef, Registration},
};

// Registry with `per_group` actions in every group the default layouts use
fn populated_registry(per_group: usize) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    let groups = [
        "tb_info", "tb_folders", "tb_debug", "tb_settings", "tbox", "lbox", "help", "tools",
        "lb_files/videos", "lb_files/subtitles",
    ];

    for group in groups {
        for i in 0..per_group {
            let handler = HandlerRef::new(format!("{group}_{i}"), || {});
            registry.register(
                Registration::new(handler, group)
                    .label(format!("{group} action {i}"))
                    .icon("•"),
            );
        }
    }
    registry
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("composition_build");

    for per_group in [4usize, 32, 256] {
        let registry = populated_registry(per_group);
        let engine = CompositionEngine::new(
            default_compositions(),
            DynamicFilter::default(),
            FilterMode::All,
        );

        group.throughput(Throughput::Elements(per_group as u64));

        group.bench_with_input(
            BenchmarkId::new("tb_debug", per_group),
            &registry,
            |b, registry| b.iter(|| black_box(engine.build(black_box("tb_debug"), registry))),
        );

        group.bench_with_input(
            BenchmarkId::new("lb_files_dynamic", per_group),
            &registry,
            |b, registry| b.iter(|| black_box(engine.build(black_box("lb_files"), registry))),
        );

        group.bench_with_input(
            BenchmarkId::new("render_text", per_group),
            &engine.build("lb_files", &registry),
            |b, items| b.iter(|| black_box(render_text(items))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
