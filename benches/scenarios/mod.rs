//! End-to-end scenario benchmarks
//!
//! A single harness is built up front so every iteration reuses the same
//! workers and timer drivers. Configuration comes from the `GUARDFLOW_*`
//! environment variables.

use criterion::{BenchmarkId, Criterion, Throughput};
use guardflow::{contains_fallback, Harness, HarnessConfig, Scenario};

pub fn bench_scenarios(c: &mut Criterion) {
    let config = HarnessConfig::from_env().unwrap();
    let total = config.total as u64;
    let harness = Harness::new(config).unwrap();

    let mut group = c.benchmark_group("scenarios");
    group.throughput(Throughput::Elements(total));

    for scenario in Scenario::ALL {
        group.bench_function(BenchmarkId::from_parameter(scenario), |b| {
            b.iter(|| {
                let list = harness.run(scenario).unwrap();
                assert!(!contains_fallback(&list), "{scenario} fell back");
                list
            })
        });
    }

    group.finish();
}
