use std::collections::BTreeMap;

use crate::*;
use log::{debug, trace};

/// Per track observation histories over discrete time steps.
///
/// Every active track holds exactly one observation per time step since its creation. Calling
/// [`TrajectoryStore::advance_time`] seeds the new step with a copy of each track's latest
/// observation, which [`TrajectoryStore::update_track`] then overwrites when a fresh detection
/// arrives. Tracks that go without a real observation for more than `max_age` steps are evicted.
///
/// The store is a plain owned value. Sessions shared across threads must serialize writers
/// against readers themselves, e.g. with a `Mutex<TrajectoryStore>`.
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    /// The current discrete time step.
    current_time: usize,
    /// Used to allocate identifiers to new tracks. Identifiers are never reused.
    next_id: usize,
    /// Active tracks keyed by identifier.
    tracks: BTreeMap<usize, Track>,
    /// Accepted deviation from the extrapolated position, as a multiple of the blob size.
    tolerance: f32,
    /// Maximum number of consecutive carried-forward steps before a track is evicted.
    max_age: Option<usize>,
}

impl Default for TrajectoryStore {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl TrajectoryStore {
    /// Returns a new TrajectoryStore at time step 0.
    ///
    /// # Parameters
    ///
    /// * `tolerance`: Accepted deviation from the extrapolated position as a multiple of the tracked blob width (x-axis) and height (y-axis). Default `2.0`.
    /// * `max_age`: Maximum number of consecutive steps without a real observation before a track is evicted. Default `30`.
    pub fn new(tolerance: Option<f32>, max_age: Option<usize>) -> TrajectoryStore {
        TrajectoryStore {
            current_time: 0,
            next_id: 0,
            tracks: BTreeMap::new(),
            tolerance: tolerance.unwrap_or(2.0),
            max_age: Some(max_age.unwrap_or(30)),
        }
    }

    /// Set tolerance
    pub fn with_tolerance(&mut self, tolerance: f32) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Set max_age. `None` keeps tracks forever.
    pub fn with_max_age(&mut self, max_age: Option<usize>) -> &mut Self {
        self.max_age = max_age;
        self
    }

    /// Return the current time step
    pub fn current_time(&self) -> usize {
        self.current_time
    }

    /// Return the tolerance
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Return the number of active tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if there are no active tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Returns true if `track_id` is an active track
    pub fn contains(&self, track_id: usize) -> bool {
        self.tracks.contains_key(&track_id)
    }

    /// Returns true if `track_id` was allocated and has since been evicted
    pub fn is_evicted(&self, track_id: usize) -> bool {
        track_id < self.next_id && !self.tracks.contains_key(&track_id)
    }

    /// Return an active track
    pub fn track(&self, track_id: usize) -> Result<&Track> {
        self.tracks
            .get(&track_id)
            .ok_or(Error::UnknownTrack(track_id))
    }

    /// Return the active tracks ordered by identifier
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Return the latest observation of every active track ordered by identifier.
    ///
    /// This is the target list the proximity matcher expects.
    pub fn latest_observations(&self) -> Vec<(usize, Blob)> {
        self.tracks
            .iter()
            .map(|(track_id, track)| (*track_id, track.last_observation().clone()))
            .collect()
    }

    /// Register a new track starting at the current time step and return its identifier.
    pub fn add_track(&mut self, blob: Blob) -> usize {
        let track_id = self.next_id;
        self.next_id += 1;
        debug!(
            "add track {} at t={} {:?}",
            track_id,
            self.current_time,
            blob.bbox()
        );
        self.tracks
            .insert(track_id, Track::new(track_id, self.current_time, blob));
        track_id
    }

    /// Register one new track per blob and return their identifiers in the same order.
    pub fn add_blobs(&mut self, blobs: &[Blob]) -> Vec<usize> {
        blobs
            .iter()
            .map(|blob| self.add_track(blob.clone()))
            .collect()
    }

    /// Record `blob` as the observation of `track_id` for the current time step.
    pub fn update_track(&mut self, track_id: usize, blob: Blob) -> Result<()> {
        let current_time = self.current_time;
        let track = self
            .tracks
            .get_mut(&track_id)
            .ok_or(Error::UnknownTrack(track_id))?;
        trace!("update track {} at t={} {:?}", track_id, current_time, blob.bbox());
        track.update(current_time, blob);
        Ok(())
    }

    /// Record `blobs[i]` as the current observation of `track_ids[i]`.
    ///
    /// Nothing is updated if any identifier is unknown.
    pub fn update_blobs(&mut self, blobs: &[Blob], track_ids: &[usize]) -> Result<()> {
        if blobs.len() != track_ids.len() {
            return Err(Error::DimensionMismatch {
                context: "update_blobs",
                expected: blobs.len(),
                got: track_ids.len(),
            });
        }
        if let Some(track_id) = track_ids.iter().find(|id| !self.contains(**id)) {
            return Err(Error::UnknownTrack(*track_id));
        }

        blobs
            .iter()
            .zip(track_ids.iter())
            .try_for_each(|(blob, track_id)| self.update_track(*track_id, blob.clone()))
    }

    /// Check whether `query` fits the motion of `track_id`.
    ///
    /// The velocity is estimated from the last two observations recorded before the current time
    /// step and the position linearly extrapolated to the current step. The query is consistent
    /// when its top left corner lies within `tolerance` times the last observed width and height
    /// of that extrapolated position. Tracks with fewer than two such observations are always
    /// consistent.
    pub fn is_trajectory_consistent(&self, query: &Blob, track_id: usize) -> Result<bool> {
        let track = self.track(track_id)?;
        let history = track.history_before(self.current_time);

        let (previous, last) = match history {
            [.., previous, last] => (previous.bbox(), last.bbox()),
            _ => return Ok(true),
        };

        let last_time = track.start_time() + history.len() - 1;
        let steps = (self.current_time - last_time) as f32;
        let expected = last.translate(
            (last.x() - previous.x()) * steps,
            (last.y() - previous.y()) * steps,
        );

        let dx = (query.bbox().x() - expected.x()).abs();
        let dy = (query.bbox().y() - expected.y()).abs();
        let consistent =
            dx <= self.tolerance * last.width() && dy <= self.tolerance * last.height();

        trace!(
            "track {} expected ({}, {}) query ({}, {}) consistent {}",
            track_id,
            expected.x(),
            expected.y(),
            query.bbox().x(),
            query.bbox().y(),
            consistent
        );
        Ok(consistent)
    }

    /// Advance to the next time step.
    ///
    /// Every active track starts the new step with its latest observation carried forward. Tracks
    /// exceeding `max_age` steps without a real observation are evicted.
    pub fn advance_time(&mut self) {
        self.current_time += 1;
        self.tracks
            .values_mut()
            .for_each(|track| track.carry_forward());

        if let Some(max_age) = self.max_age {
            let expired = self
                .tracks
                .values()
                .filter(|track| track.time_since_update() > max_age)
                .map(|track| track.track_id())
                .collect::<Vec<_>>();

            expired.into_iter().for_each(|track_id| {
                debug!("evict track {} at t={}", track_id, self.current_time);
                self.tracks.remove(&track_id);
            });
        }
    }
}
