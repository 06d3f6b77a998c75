use std::hash::{Hash, Hasher};

use crate::*;

/// Enumeration type for the single target track state:
///
/// - A track that received a real observation in the current time step is `Tracked`.
/// - A track whose current observation was carried forward from a previous step is `Lost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tracked,
    Lost,
}

/// A single target track: one blob observation per time step since the track was created.
#[derive(Clone)]
pub struct Track {
    /// The current track state.
    state: TrackState,
    /// A unique track identifier.
    track_id: usize,
    /// The time step of the first observation.
    start_time: usize,
    /// Observations indexed by `time - start_time`. Never empty.
    observations: Vec<Blob>,
    /// Total number of real (not carried forward) observations.
    hits: usize,
    /// Total number of time steps since the last real observation.
    time_since_update: usize,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("state", &self.state)
            .field("track_id", &self.track_id)
            .field("start_time", &self.start_time)
            .field("last", &self.last_observation().bbox())
            .field("hits", &self.hits)
            .field("age", &self.age())
            .field("time_since_update", &self.time_since_update)
            .finish()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.track_id == other.track_id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.track_id.hash(state);
    }
}

impl Track {
    /// Returns a new Track
    ///
    /// # Parameters
    ///
    /// * `track_id`: A unique track identifier.
    /// * `start_time`: The time step of the first observation.
    /// * `blob`: The first observation.
    pub fn new(track_id: usize, start_time: usize, blob: Blob) -> Track {
        Track {
            state: TrackState::Tracked,
            track_id,
            start_time,
            observations: vec![blob],
            hits: 1,
            time_since_update: 0,
        }
    }

    /// Return the identifier of the track
    pub fn track_id(&self) -> usize {
        self.track_id
    }

    /// Return the TrackState of the track
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Return the time step of the first observation
    pub fn start_time(&self) -> usize {
        self.start_time
    }

    /// Return the time step of the latest observation
    pub fn last_time(&self) -> usize {
        self.start_time + self.observations.len() - 1
    }

    /// Return the number of time steps covered by the track
    pub fn age(&self) -> usize {
        self.observations.len()
    }

    /// Return the number of real observations
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Return the time since update of the track
    pub fn time_since_update(&self) -> usize {
        self.time_since_update
    }

    /// Return all observations, oldest first
    pub fn observations(&self) -> &[Blob] {
        &self.observations
    }

    /// Return the observation recorded for time step `time`
    pub fn observation_at(&self, time: usize) -> Option<&Blob> {
        time.checked_sub(self.start_time)
            .and_then(|index| self.observations.get(index))
    }

    /// Return the latest observation
    pub fn last_observation(&self) -> &Blob {
        // a track is always created with one observation and never shrinks
        &self.observations[self.observations.len() - 1]
    }

    /// Return the observations recorded strictly before time step `time`, oldest first
    pub fn history_before(&self, time: usize) -> &[Blob] {
        let len = time
            .saturating_sub(self.start_time)
            .min(self.observations.len());
        &self.observations[..len]
    }

    /// Record a real observation for time step `time`.
    ///
    /// Overwrites the carried-forward placeholder when the step already has one.
    pub(crate) fn update(&mut self, time: usize, blob: Blob) {
        if time == self.last_time() {
            let last = self.observations.len() - 1;
            self.observations[last] = blob;
        } else {
            self.observations.push(blob);
        }
        self.hits += 1;
        self.time_since_update = 0;
        self.state = TrackState::Tracked;
    }

    /// Seed the next time step with a copy of the latest observation.
    pub(crate) fn carry_forward(&mut self) {
        let last = self.last_observation().clone();
        self.observations.push(last);
        self.time_since_update += 1;
        self.state = TrackState::Lost;
    }

    /// Returns true if this track received a real observation in its latest time step.
    pub fn is_tracked(&self) -> bool {
        matches!(self.state, TrackState::Tracked)
    }

    /// Returns true if the latest observation was carried forward.
    pub fn is_lost(&self) -> bool {
        matches!(self.state, TrackState::Lost)
    }
}
