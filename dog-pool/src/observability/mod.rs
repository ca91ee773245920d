pub mod monitor;

#[cfg(feature = "tracing-basic")]
pub mod tracing;

pub use monitor::PoolMonitor;

#[cfg(feature = "tracing-basic")]
pub use self::tracing::{init_json_tracing, init_tracing};
