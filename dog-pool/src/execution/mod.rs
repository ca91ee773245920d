pub mod handler;
pub mod pool;
mod runner;

pub use handler::ItemProcessor;
pub use pool::TaskPool;
