use axum::extract::FromRef;

use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::Aggregator;
use crate::queue::QueueManager;
use crate::queue_store::QueueStore;

use super::websocket::ConnectionManager;
use super::ServerConfig;

pub type GuardedQueueStore = Arc<dyn QueueStore>;
pub type GuardedQueueManager = Arc<QueueManager>;
pub type GuardedAggregator = Arc<Aggregator>;
pub type GuardedConnectionManager = Arc<ConnectionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub queue_store: GuardedQueueStore,
    pub queue_manager: GuardedQueueManager,
    pub aggregator: GuardedAggregator,
    pub ws_connection_manager: GuardedConnectionManager,
}

impl FromRef<ServerState> for GuardedQueueStore {
    fn from_ref(input: &ServerState) -> Self {
        input.queue_store.clone()
    }
}

impl FromRef<ServerState> for GuardedQueueManager {
    fn from_ref(input: &ServerState) -> Self {
        input.queue_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedAggregator {
    fn from_ref(input: &ServerState) -> Self {
        input.aggregator.clone()
    }
}

impl FromRef<ServerState> for GuardedConnectionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ws_connection_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
