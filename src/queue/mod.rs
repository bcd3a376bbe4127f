mod manager;
mod models;

pub use manager::QueueManager;
pub use models::{PlaybackStatus, QueueStatus};
