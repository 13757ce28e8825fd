//! Background Tasks Module
//!
//! Contains work run against a cache from several threads at once.
//!
//! # Tasks
//! - Workload: Mixed put/get load used by the binary to exercise eviction

mod workload;

pub use workload::{run_workload, WorkloadConfig, WorkloadReport};
