pub mod counters;
pub mod engine;
pub mod gate;
pub mod state;
pub mod types;

pub use engine::MonitorScheduler;
pub use types::{ConfigError, CycleReport, DispatchOutcome, MonitorConfig, MonitorPhase};
