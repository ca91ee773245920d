pub mod ids;
pub mod events;
pub mod output;

pub use ids::RunId;
pub use events::PoolEvent;
pub use output::PoolOutput;
