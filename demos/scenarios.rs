//! # Scenario Demo
//!
//! Runs each of the four benchmark scenarios once with the configuration taken
//! from the environment and reports what came back.
//!
//! ## Running This Demo
//!
//! ```bash
//! # Reference configuration
//! cargo run --example scenarios --features tracing
//!
//! # Tight deadlines, to watch fallbacks appear
//! GUARDFLOW_DEADLINE_MIN_MS=0 GUARDFLOW_DEADLINE_MAX_MS=1 \
//!     cargo run --example scenarios --features tracing
//!
//! # Worker, timer and fallback events
//! RUST_LOG=guardflow=debug cargo run --example scenarios --features tracing
//! ```

use std::process::ExitCode;
use std::time::Instant;

use guardflow::{contains_fallback, Harness, HarnessConfig, Scenario};

use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guardflow=info")),
        )
        .init();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    println!("=== Timeout-Guarded Producer Scenarios ===\n");
    println!(
        "total={} deadlines=[{}ms, {}ms) publishers={} outer bound={}ms\n",
        config.total,
        config.deadline_min.as_millis(),
        config.deadline_max.as_millis(),
        config.partitions,
        config.outer_bound.as_millis(),
    );

    let harness = match Harness::new(config) {
        Ok(harness) => harness,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for scenario in Scenario::ALL {
        let started = Instant::now();
        match harness.run(scenario) {
            Ok(list) => println!(
                "{:<34} {:>8} elements  fallback={:<5}  {:?}",
                scenario.name(),
                list.len(),
                contains_fallback(&list),
                started.elapsed()
            ),
            Err(err) => {
                failed = true;
                println!("{:<34} failed: {err}", scenario.name());
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
