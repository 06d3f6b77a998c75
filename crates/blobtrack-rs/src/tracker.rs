use crate::*;
use log::debug;

/// This is the blob tracking session.
///
/// It owns the trajectories of every tracked blob and associates the blobs of each new frame with
/// them by proximity and trajectory consistency.
///
/// # Examples
///
/// ```
/// use blobtrack_rs::{Blob, BlobTracker};
///
/// // instantiate tracker with default parameters
/// let mut tracker = BlobTracker::default();
///
/// // the first frame starts one track per blob
/// let ids = tracker.update(vec![Blob::from_tlwh(0.0, 0.0, 10.0, 10.0)]).unwrap();
///
/// // the next frame continues it
/// let next = tracker.update(vec![Blob::from_tlwh(3.0, 1.0, 10.0, 10.0)]).unwrap();
/// assert_eq!(ids, next);
///
/// for track in tracker.store().tracks() {
///     println!("{} {:?}", track.track_id(), track.last_observation().bbox());
/// }
///```
#[derive(Debug, Clone)]
pub struct BlobTracker {
    /// Trajectories of the tracked blobs.
    store: TrajectoryStore,
    /// Associates incoming blobs with tracked blobs.
    matcher: ProximityTrajectoryMatcher,
    /// The first update must not advance time.
    initial_run: bool,
}

impl Default for BlobTracker {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl BlobTracker {
    /// Returns a new BlobTracker
    ///
    /// # Arguments
    ///
    /// * `tolerance`: Proximity and trajectory tolerance as a multiple of the tracked blob size. Default `2.0`.
    /// * `max_age`: Maximum number of frames a track survives without a matching blob. Default `30`.
    pub fn new(tolerance: Option<f32>, max_age: Option<usize>) -> BlobTracker {
        BlobTracker {
            store: TrajectoryStore::new(tolerance, max_age),
            matcher: ProximityTrajectoryMatcher::new(tolerance),
            initial_run: true,
        }
    }

    /// Set tolerance for both proximity and trajectory checks
    pub fn with_tolerance(&mut self, tolerance: f32) -> &mut Self {
        self.store.with_tolerance(tolerance);
        self.matcher.with_tolerance(tolerance);
        self
    }

    /// Set max_age
    pub fn with_max_age(&mut self, max_age: usize) -> &mut Self {
        self.store.with_max_age(Some(max_age));
        self
    }

    /// Return the trajectories
    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    /// Process the blobs of the next frame.
    ///
    /// # Parameters
    ///
    /// * `blobs`: The blobs detected in the frame.
    ///
    /// # Returns
    ///
    /// The track identifier assigned to each blob, in input order. Blobs that match no track start
    /// a new one.
    pub fn update(&mut self, blobs: Vec<Blob>) -> Result<Vec<usize>> {
        if !self.initial_run {
            self.store.advance_time();
        }
        self.initial_run = false;

        let targets = self.store.latest_observations();
        let result = self.matcher.match_blobs(&self.store, &blobs, &targets)?;
        let result = resolve_conflicts(&result, f32::INFINITY);

        let track_ids = blobs
            .into_iter()
            .zip(result.matches().iter())
            .map(|(blob, target)| match target {
                Some(target) => {
                    let track_id = targets[*target].0;
                    self.store.update_track(track_id, blob)?;
                    Ok(track_id)
                }
                None => Ok(self.store.add_track(blob)),
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "t={} blobs {} matched {} tracks {}",
            self.store.current_time(),
            track_ids.len(),
            result.iter_matches().count(),
            self.store.len()
        );

        Ok(track_ids)
    }

    /// Detect the blobs of `mask` and process them as the next frame.
    ///
    /// # Parameters
    ///
    /// * `detector`: The blob source.
    /// * `mask`: The foreground mask of the frame.
    /// * `close_holes`: Passed through to the detector.
    pub fn process<D: BlobDetector>(
        &mut self,
        detector: &D,
        mask: &D::Image,
        close_holes: usize,
    ) -> Result<Vec<usize>> {
        let blobs = detector.detect(mask, close_holes)?;
        self.update(blobs)
    }
}
