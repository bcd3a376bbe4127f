use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::error;

use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::websocket::{ws_handler, ConnectionManager};
use super::{log_requests, state::*, ServerConfig};
use crate::aggregator::Aggregator;
use crate::provider::MusicProvider;
use crate::queue::QueueManager;
use crate::queue_store::{NewTrack, QueueStore, VenueSettingUpdate};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub connected_observers: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{context}: {err}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        connected_observers: state.ws_connection_manager.connection_count().await,
    };
    Json(stats)
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search(
    Query(params): Query<SearchParams>,
    State(aggregator): State<GuardedAggregator>,
) -> Response {
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query parameter 'q' is required");
    }

    match aggregator.search_all(&query).await {
        Ok(results) => Json(serde_json::json!({ "results": results })).into_response(),
        Err(err) => internal_error("search failed", err),
    }
}

async fn add_to_queue(
    State(queue_manager): State<GuardedQueueManager>,
    Json(body): Json<NewTrack>,
) -> Response {
    if body.duration < 0 {
        return error_response(StatusCode::BAD_REQUEST, "Duration must be non-negative");
    }
    if body.title.trim().is_empty() || body.track_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Track id and title are required");
    }

    match queue_manager.add_to_queue(&body).await {
        Ok(track) => Json(serde_json::json!({ "success": true, "track": track })).into_response(),
        Err(err) => internal_error("failed to add track to queue", err),
    }
}

async fn get_queue(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.get_queue_status().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => internal_error("failed to read queue", err),
    }
}

async fn get_playback_status(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.get_playback_status().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => internal_error("failed to read playback status", err),
    }
}

async fn play_next(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.play_next().await {
        Ok(next) => Json(serde_json::json!({ "success": true, "nextTrack": next })).into_response(),
        Err(err) => internal_error("failed to advance queue", err),
    }
}

async fn skip_track(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.skip_track().await {
        Ok(next) => Json(serde_json::json!({ "success": true, "nextTrack": next })).into_response(),
        Err(err) => internal_error("failed to skip track", err),
    }
}

async fn pause_playback(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.pause().await {
        Ok(_) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(err) => internal_error("failed to pause playback", err),
    }
}

async fn resume_playback(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.resume().await {
        Ok(_) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(err) => internal_error("failed to resume playback", err),
    }
}

async fn remove_from_queue(
    State(queue_manager): State<GuardedQueueManager>,
    Path(id): Path<i64>,
) -> Response {
    // Removing an unknown or already-consumed track is a no-op, not an error.
    match queue_manager.remove_from_queue(id).await {
        Ok(removed) => {
            Json(serde_json::json!({ "success": true, "removed": removed })).into_response()
        }
        Err(err) => internal_error("failed to remove track", err),
    }
}

async fn clear_queue(State(queue_manager): State<GuardedQueueManager>) -> Response {
    match queue_manager.clear_queue().await {
        Ok(removed) => {
            Json(serde_json::json!({ "success": true, "removed": removed })).into_response()
        }
        Err(err) => internal_error("failed to clear queue", err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderBody {
    track_ids: Vec<i64>,
}

async fn reorder_queue(
    State(queue_manager): State<GuardedQueueManager>,
    Json(body): Json<ReorderBody>,
) -> Response {
    match queue_manager.reorder_queue(&body.track_ids).await {
        Ok(queue) => Json(serde_json::json!({ "success": true, "queue": queue })).into_response(),
        Err(err) => internal_error("failed to reorder queue", err),
    }
}

async fn get_settings(State(queue_store): State<GuardedQueueStore>) -> Response {
    match queue_store.get_all_venue_settings() {
        Ok(settings) => Json(settings).into_response(),
        Err(err) => internal_error("failed to read venue settings", err),
    }
}

async fn update_setting(
    State(queue_store): State<GuardedQueueStore>,
    Path(service_name): Path<String>,
    Json(update): Json<VenueSettingUpdate>,
) -> Response {
    match queue_store.update_venue_setting(&service_name, &update) {
        Ok(Some(setting)) => Json(setting).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Unknown service"),
        Err(err) => internal_error("failed to update venue setting", err),
    }
}

async fn service_status(State(aggregator): State<GuardedAggregator>) -> Response {
    match aggregator.service_status().await {
        Ok(status) => Json(status).into_response(),
        Err(err) => internal_error("failed to read service status", err),
    }
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn QueueStore>,
    providers: Vec<Arc<dyn MusicProvider>>,
    search_timeout: Duration,
) -> Result<Router> {
    let connection_manager = Arc::new(ConnectionManager::new());
    let queue_manager = Arc::new(QueueManager::new(
        Arc::clone(&store),
        Arc::clone(&connection_manager),
    ));

    let mut aggregator = Aggregator::new(Arc::clone(&store), search_timeout);
    for provider in providers {
        aggregator.register(provider);
    }

    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        queue_store: store,
        queue_manager,
        aggregator: Arc::new(aggregator),
        ws_connection_manager: connection_manager,
    };

    let api_routes: Router = Router::new()
        .route("/search", get(search))
        .route("/queue", get(get_queue))
        .route("/queue/add", post(add_to_queue))
        .route("/playback/status", get(get_playback_status))
        .route("/admin/play-next", post(play_next))
        .route("/admin/skip", post(skip_track))
        .route("/admin/pause", post(pause_playback))
        .route("/admin/play", post(resume_playback))
        .route("/admin/queue", delete(clear_queue))
        .route("/admin/queue/{id}", delete(remove_from_queue))
        .route("/admin/queue/reorder", post(reorder_queue))
        .route("/admin/settings", get(get_settings))
        .route("/admin/settings/{service}", patch(update_setting))
        .route("/admin/service-status", get(service_status))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler).with_state(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub async fn run_server(
    store: Arc<dyn QueueStore>,
    providers: Vec<Arc<dyn MusicProvider>>,
    requests_logging_level: super::RequestsLoggingLevel,
    port: u16,
    frontend_dir_path: Option<String>,
    search_timeout: Duration,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, store, providers, search_timeout)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
