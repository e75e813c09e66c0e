//! # Bug Entry Benchmarks
//!
//! | Area | Operation | Shape |
//! |------|-----------|-------|
//! | Propagation | `set(product)` with N components | linear in N |
//! | Diff | `update_plan` with a large cc list | linear in list size |

use bb_02_field_registry::{FieldDescriptor, FieldOption, FieldRegistry, FieldType};
use bb_03_bug_entity::BugState;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_types::FieldValue;
use std::sync::Arc;

fn registry(components: usize) -> Arc<FieldRegistry> {
    let options = (0..components).map(|i| {
        let product = if i % 2 == 0 { "Core" } else { "UI" };
        FieldOption::new(format!("component-{i}"))
            .sort_key((i % 7) as i64)
            .visible_for([product])
    });
    let descriptors = vec![
        FieldDescriptor::new("product", FieldType::Select)
            .options([FieldOption::new("Core"), FieldOption::new("UI")]),
        FieldDescriptor::new("component", FieldType::Select)
            .value_field("product")
            .options(options),
        FieldDescriptor::new("cc", FieldType::User).multivalue(),
    ];
    match FieldRegistry::build(descriptors) {
        Ok(registry) => Arc::new(registry),
        Err(e) => panic!("benchmark schema is invalid: {e}"),
    }
}

fn bench_product_switch(c: &mut Criterion) {
    let mut group = c.benchmark_group("bb-03-propagation");

    for size in [10, 100, 1000] {
        let record = json!({"id": 1, "product": "Core", "component": "component-0"});
        let record = record.as_object().cloned().unwrap_or_default();
        let mut state = BugState::from_record(registry(size), &record);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("set_product", size), &size, |b, _| {
            let mut toggle = false;
            b.iter(|| {
                toggle = !toggle;
                let product = if toggle { "UI" } else { "Core" };
                black_box(state.set("product", FieldValue::from(product)).ok())
            })
        });
    }

    group.finish();
}

fn bench_update_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("bb-03-diff");

    for size in [10, 100, 1000] {
        let confirmed: Vec<String> = (0..size).map(|i| format!("user{i}@example.com")).collect();
        let record = json!({"id": 1, "cc": confirmed});
        let record = record.as_object().cloned().unwrap_or_default();
        let mut state = BugState::from_record(registry(2), &record);
        let edited: Vec<String> = (size / 2..size + size / 2)
            .map(|i| format!("user{i}@example.com"))
            .collect();
        let _ = state.set("cc", FieldValue::list(edited));

        group.bench_with_input(BenchmarkId::new("cc_delta", size), &size, |b, _| {
            b.iter(|| black_box(state.update_plan("comment").ok()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_product_switch, bench_update_plan);
criterion_main!(benches);
