pub mod aggregator;
pub mod provider;
pub mod queue;
pub mod queue_store;
pub mod server;

pub use aggregator::Aggregator;
pub use queue::QueueManager;
pub use queue_store::{QueueStore, SqliteQueueStore};
pub use server::{run_server, RequestsLoggingLevel};
