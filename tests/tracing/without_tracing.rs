//! Tests that the library works correctly without tracing feature

use guardflow::{contains_fallback, Scenario};

use crate::common::{expected, patient_harness, sorted};

#[test]
fn test_every_scenario_without_tracing() {
    let harness = patient_harness(500);

    for scenario in Scenario::ALL {
        let list = harness.run(scenario).unwrap();
        assert!(!contains_fallback(&list));
        assert_eq!(sorted(list), expected(500));
    }
}
