//! Partitioned runs across the publisher workers

use std::sync::Arc;

use guardflow::{Element, FixedDeadline, Harness, HarnessConfig, Scenario};
use test_case::test_case;

use crate::common::{expected, patient_harness, sorted};

#[test]
fn test_three_publishers_cover_every_value_once() {
    let total = 30_000;
    let harness = patient_harness(total);

    for scenario in [
        Scenario::DefaultParallelWithPublishers,
        Scenario::SingleWithPublishers,
    ] {
        let list = harness.run(scenario).unwrap();
        assert_eq!(list.len(), total);
        assert_eq!(sorted(list), expected(total));
    }
}

#[test]
fn test_per_publisher_order_is_preserved() {
    let total = 9_000;
    let harness = patient_harness(total);
    let list = harness.single_with_publishers().unwrap();

    let share = (total / 3) as Element;
    for publisher in 0..3 {
        let range = publisher * share..(publisher + 1) * share;
        let values: Vec<_> = list.iter().copied().filter(|v| range.contains(v)).collect();
        assert_eq!(values, range.collect::<Vec<_>>());
    }
}

#[test_case(10, 3 ; "remainder goes to the last share")]
#[test_case(2, 3 ; "fewer elements than publishers")]
#[test_case(1_001, 7 ; "seven publishers")]
fn test_uneven_partitions(total: usize, partitions: usize) {
    let config = HarnessConfig::default()
        .with_total(total)
        .with_partitions(partitions);
    let harness = Harness::with_deadlines(config, Arc::new(FixedDeadline::unbounded())).unwrap();

    let list = harness.default_parallel_with_publishers().unwrap();
    assert_eq!(sorted(list), expected(total));
}
