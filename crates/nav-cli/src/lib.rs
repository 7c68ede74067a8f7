//! Navigator command line support
//!
//! Configuration loading plus the two workloads behind the `navigator`
//! binary:
//! - `simulate` drives a preview controller with a burst of edits against
//!   a simulated calculation service
//! - `cache-report` runs synthetic traffic through the cache registry

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod simulator;
pub mod workload;

pub use config::{ConfigError, ConfigFormat, NavigatorConfig};
pub use simulator::{run_simulation, SimulatedTransport, SimulationOptions, SimulationReport};
pub use workload::{run_cache_workload, WorkloadOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
