//! The venue queue state machine.
//!
//! One track at a time is `playing`; everything else waits in `pending`
//! order. Every mutation broadcasts the affected state to all connected
//! observers, in a fixed event order so clients can apply updates blindly.
//!
//! The playback mutex doubles as the mutation lock: every operation that
//! writes queue state holds it end to end, so two concurrent mutations can
//! never interleave their store reads and writes.
//!
//! Elapsed time is tracked as an accumulated duration plus an optional
//! running stamp: pausing folds the running time into the accumulator,
//! resuming stamps a fresh start. The clock never advances while paused.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::Mutex;

use super::models::{PlaybackStatus, QueueStatus};
use crate::queue_store::{NewTrack, QueueStore, Track, TrackStatus};
use crate::server::websocket::{events, ConnectionManager, ServerMessage};

#[derive(Default)]
struct PlaybackState {
    current_track: Option<Track>,
    is_playing: bool,
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl PlaybackState {
    fn elapsed(&self) -> Duration {
        let running = self
            .started_at
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        self.accumulated + running
    }

    fn clear(&mut self) {
        self.current_track = None;
        self.is_playing = false;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }
}

pub struct QueueManager {
    store: Arc<dyn QueueStore>,
    connections: Arc<ConnectionManager>,
    playback: Mutex<PlaybackState>,
}

impl QueueManager {
    pub fn new(store: Arc<dyn QueueStore>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            store,
            connections,
            playback: Mutex::new(PlaybackState::default()),
        }
    }

    pub async fn add_to_queue(&self, track: &NewTrack) -> Result<Track> {
        let created = {
            let _guard = self.playback.lock().await;
            let position = self.store.get_pending_tracks()?.len() as i64;
            self.store.create_track(track, position)?
        };
        self.broadcast_queue().await?;
        Ok(created)
    }

    pub async fn get_queue_status(&self) -> Result<QueueStatus> {
        let upcoming = self.store.get_pending_tracks()?;
        let current_track = self.playback.lock().await.current_track.clone();
        let total_tracks = upcoming.len() + usize::from(current_track.is_some());
        Ok(QueueStatus {
            current_track,
            upcoming,
            total_tracks,
        })
    }

    /// Finish the current track as `played` and start the next one.
    pub async fn play_next(&self) -> Result<Option<Track>> {
        self.advance(TrackStatus::Played).await
    }

    /// Finish the current track as `skipped` and start the next one.
    pub async fn skip_track(&self) -> Result<Option<Track>> {
        self.advance(TrackStatus::Skipped).await
    }

    async fn advance(&self, outgoing_status: TrackStatus) -> Result<Option<Track>> {
        let mut playback = self.playback.lock().await;

        if let Some(current) = playback.current_track.take() {
            self.store.update_track_status(current.id, outgoing_status)?;
        }

        let next = self.store.get_pending_tracks()?.into_iter().next();
        match next {
            Some(track) => {
                let track = self
                    .store
                    .update_track_status(track.id, TrackStatus::Playing)?
                    .unwrap_or(track);
                self.store.renumber_pending()?;

                playback.current_track = Some(track.clone());
                playback.is_playing = true;
                playback.started_at = Some(Instant::now());
                playback.accumulated = Duration::ZERO;

                let status = Self::status_of(&playback);
                drop(playback);

                self.broadcast(events::TRACK_CHANGED, &track).await;
                self.broadcast(events::PLAYBACK_STATUS, &status).await;
                self.broadcast_queue().await?;
                Ok(Some(track))
            }
            None => {
                playback.clear();
                drop(playback);

                self.broadcast(events::TRACK_CHANGED, Option::<Track>::None)
                    .await;
                self.broadcast(events::PLAYBACK_STATUS, PlaybackStatus::idle())
                    .await;
                Ok(None)
            }
        }
    }

    /// Pause playback, freezing the elapsed clock.
    pub async fn pause(&self) -> Result<PlaybackStatus> {
        let mut playback = self.playback.lock().await;
        if playback.is_playing {
            if let Some(started_at) = playback.started_at.take() {
                playback.accumulated += started_at.elapsed();
            }
            playback.is_playing = false;
        }
        let status = Self::status_of(&playback);
        drop(playback);

        self.broadcast(events::PLAYBACK_STATUS, &status).await;
        Ok(status)
    }

    /// Resume playback from where the clock stopped.
    pub async fn resume(&self) -> Result<PlaybackStatus> {
        let mut playback = self.playback.lock().await;
        if !playback.is_playing && playback.current_track.is_some() {
            playback.started_at = Some(Instant::now());
            playback.is_playing = true;
        }
        let status = Self::status_of(&playback);
        drop(playback);

        self.broadcast(events::PLAYBACK_STATUS, &status).await;
        Ok(status)
    }

    pub async fn get_playback_status(&self) -> Result<PlaybackStatus> {
        let playback = self.playback.lock().await;
        Ok(Self::status_of(&playback))
    }

    /// Delete a track record regardless of its status. Unknown ids are a
    /// no-op. The in-memory current track is untouched even when its record
    /// goes away.
    pub async fn remove_from_queue(&self, track_id: i64) -> Result<bool> {
        let removed = {
            let _guard = self.playback.lock().await;
            let removed = self.store.delete_track(track_id)?;
            if removed {
                self.store.renumber_pending()?;
            }
            removed
        };
        if removed {
            self.broadcast_queue().await?;
        }
        Ok(removed)
    }

    pub async fn clear_queue(&self) -> Result<usize> {
        let removed = {
            let _guard = self.playback.lock().await;
            self.store.clear_pending()?
        };
        self.broadcast_queue().await?;
        Ok(removed)
    }

    /// Reorder the pending queue.
    ///
    /// Ids listed in `track_ids` come first in that order; pending tracks
    /// not listed keep their prior relative order after them. Unknown and
    /// non-pending ids are ignored.
    pub async fn reorder_queue(&self, track_ids: &[i64]) -> Result<Vec<Track>> {
        let reordered = {
            let _guard = self.playback.lock().await;
            let pending = self.store.get_pending_tracks()?;

            let mut order: Vec<i64> = track_ids
                .iter()
                .copied()
                .filter(|id| pending.iter().any(|t| t.id == *id))
                .collect();
            for track in &pending {
                if !order.contains(&track.id) {
                    order.push(track.id);
                }
            }

            self.store.set_positions(&order)?;
            self.store.get_pending_tracks()?
        };
        self.broadcast_queue().await?;
        Ok(reordered)
    }

    fn status_of(playback: &PlaybackState) -> PlaybackStatus {
        let Some(track) = playback.current_track.clone() else {
            return PlaybackStatus::idle();
        };
        let elapsed = playback.elapsed().as_secs() as i64;
        PlaybackStatus {
            is_playing: playback.is_playing,
            current_time: elapsed.clamp(0, track.duration.max(0)),
            duration: track.duration,
            track: Some(track),
        }
    }

    async fn broadcast(&self, event: &str, data: impl serde::Serialize) {
        self.connections
            .broadcast_all(ServerMessage::new(event, data))
            .await;
    }

    async fn broadcast_queue(&self) -> Result<()> {
        let status = self.get_queue_status().await?;
        self.broadcast(events::QUEUE_UPDATED, status).await;
        Ok(())
    }
}
