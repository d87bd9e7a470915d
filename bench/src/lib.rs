//! Benchmark utilities for the component storage core.
//!
//! - **Container benchmarks**: Registration, lookup, soft delete + optimize, immediate removal,
//!   and destruction with deletion callbacks, for both index implementations
//! - **Scenario benchmarks**: A particle workload churning entities every frame
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_ecs_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_ecs_bench -- optimize
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod components;
pub mod scenarios;
