use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

use time_block::{
    Call, ScopeOptions, StatsSnapshot, TimeBlock, TimeBlockConfig, TimeBlockError,
    profiling::{CallPath, NoMemory, Sample, format_stats},
};

/// Silent instance with a constant memory reader, so only bookkeeping is timed.
fn quiet_block() -> TimeBlock {
    TimeBlock::builder()
        .config(TimeBlockConfig::default().root_label("").notices(false))
        .memory_reader(NoMemory)
        .build()
}

fn bench_scope_enter_exit(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope");

    let tb = quiet_block();
    group.bench_function("flat", |b| {
        b.iter(|| tb.ctx("flat", || black_box(1)));
    });

    group.bench_function("nested_3", |b| {
        b.iter(|| tb.ctx("a", || tb.ctx("b", || tb.ctx("c", || black_box(1)))));
    });

    let sampled = TimeBlock::builder()
        .config(TimeBlockConfig::default().root_label("").notices(false))
        .build();
    group.bench_function("flat_process_memory", |b| {
        b.iter(|| sampled.ctx("flat", || black_box(1)));
    });

    let decor = tb.decor(ScopeOptions::quiet().print_args(true));
    group.bench_function("decor_with_args", |b| {
        b.iter(|| decor.call(Call::new("work").arg(&42).kwarg("mode", "fast"), || black_box(1)));
    });

    group.finish();
}

fn bench_concurrent_tasks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tasks");
    let rt = Runtime::new().unwrap();
    group.sample_size(10);

    for task_count in [8u64, 64].iter() {
        group.throughput(Throughput::Elements(*task_count));
        group.bench_with_input(
            BenchmarkId::new("spawned_actx", task_count),
            task_count,
            |b, &task_count| {
                b.to_async(&rt).iter(|| async move {
                    let tb = Arc::new(quiet_block());
                    let handles: Vec<_> = (0..task_count)
                        .map(|i| {
                            let tb = tb.clone();
                            tokio::spawn(async move {
                                tb.actx(format!("task{}", i % 4), async {
                                    tb.actx("step", tokio::task::yield_now()).await;
                                })
                                .await;
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                    black_box(tb.get_stats().sample_count())
                });
            },
        );
    }

    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    for paths in [10usize, 200].iter() {
        let mut stats = StatsSnapshot::default();
        for p in 0..*paths {
            for s in 0..20 {
                stats.push(
                    CallPath::new(["root".to_string(), format!("child{}", p)]),
                    Sample::new(0.001 * s as f64, 1024 * s),
                );
            }
        }

        group.throughput(Throughput::Elements(*paths as u64));
        group.bench_with_input(BenchmarkId::new("format_stats", paths), &stats, |b, stats| {
            b.iter(|| black_box(format_stats(stats)));
        });
        group.bench_with_input(BenchmarkId::new("msgpack_state", paths), &stats, |b, stats| {
            let tb = quiet_block();
            tb.add_stats(stats);
            b.iter(|| -> Result<usize, TimeBlockError> {
                Ok(black_box(tb.state().to_msgpack()?.len()))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scope_enter_exit,
    bench_concurrent_tasks,
    bench_report
);
criterion_main!(benches);
