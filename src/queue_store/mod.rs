mod models;
mod sqlite_queue_store;

pub use models::*;
pub use sqlite_queue_store::SqliteQueueStore;

use anyhow::Result;

/// Durable state of the venue queue: tracks plus per-service settings.
///
/// Positions among `pending` tracks are the queue order. Callers that
/// consume or remove tracks are expected to renumber afterwards so the
/// pending positions stay contiguous from zero.
pub trait QueueStore: Send + Sync {
    fn create_track(&self, track: &NewTrack, position: i64) -> Result<Track>;
    fn get_track(&self, id: i64) -> Result<Option<Track>>;
    /// Pending tracks ordered by ascending position.
    fn get_pending_tracks(&self) -> Result<Vec<Track>>;
    fn update_track_status(&self, id: i64, status: TrackStatus) -> Result<Option<Track>>;
    /// Assign positions 0..n to the given track ids, in order.
    fn set_positions(&self, track_ids: &[i64]) -> Result<()>;
    fn delete_track(&self, id: i64) -> Result<bool>;
    /// Drop all pending tracks. Returns how many were removed.
    fn clear_pending(&self) -> Result<usize>;
    /// Re-assign pending positions to 0..n preserving relative order.
    fn renumber_pending(&self) -> Result<()>;

    fn get_venue_setting(&self, service_name: &str) -> Result<Option<VenueSetting>>;
    fn get_all_venue_settings(&self) -> Result<Vec<VenueSetting>>;
    fn update_venue_setting(
        &self,
        service_name: &str,
        update: &VenueSettingUpdate,
    ) -> Result<Option<VenueSetting>>;
    /// Insert the default per-service rows if the table is empty.
    fn seed_default_settings(&self) -> Result<()>;
}
