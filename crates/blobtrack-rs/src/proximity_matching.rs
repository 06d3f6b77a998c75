use crate::*;
use log::trace;

/// Matches query blobs to tracked target blobs by spatial proximity and trajectory consistency.
///
/// Several queries may be matched to the same target. Use [`resolve_conflicts`] on the result when
/// a strict one-to-one association is required.
#[derive(Debug, Clone)]
pub struct ProximityTrajectoryMatcher {
    /// Accepted top left corner offset as a multiple of the target width (x-axis) and height (y-axis).
    tolerance: f32,
}

impl Default for ProximityTrajectoryMatcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ProximityTrajectoryMatcher {
    /// Returns a new ProximityTrajectoryMatcher
    ///
    /// # Parameters
    ///
    /// * `tolerance`: Accepted top left corner offset as a multiple of the target size. Default `2.0`.
    pub fn new(tolerance: Option<f32>) -> ProximityTrajectoryMatcher {
        ProximityTrajectoryMatcher {
            tolerance: tolerance.unwrap_or(2.0),
        }
    }

    /// Set tolerance
    pub fn with_tolerance(&mut self, tolerance: f32) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Return the tolerance
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Returns true when `query` is close enough to `target` to be the same object.
    ///
    /// The top left corners must be within `tolerance` times the target width on the x-axis and
    /// `tolerance` times the target height on the y-axis. The bound is relative to the target, so
    /// swapping the arguments also swaps the rectangle the bound is taken from.
    pub fn is_close(&self, query: &Blob, target: &Blob) -> bool {
        let query_bb = query.bbox();
        let target_bb = target.bbox();

        let dx = (query_bb.x() - target_bb.x()).abs();
        let dy = (query_bb.y() - target_bb.y()).abs();

        dx <= self.tolerance * target_bb.width() && dy <= self.tolerance * target_bb.height()
    }

    /// Euclidean distance between the top left corners of two blobs.
    pub fn deviation(query: &Blob, target: &Blob) -> f32 {
        let dx = query.bbox().x() - target.bbox().x();
        let dy = query.bbox().y() - target.bbox().y();
        (dx * dx + dy * dy).sqrt()
    }

    /// Match query blobs to target blobs.
    ///
    /// # Parameters
    ///
    /// * `store`: The trajectories the targets belong to.
    /// * `query_blobs`: The blobs to match, e.g. the detections of the current frame.
    /// * `targets`: The candidate blobs, each with the identifier of the track it belongs to.
    ///
    /// # Returns
    ///
    /// One entry per query blob. A query matches the target with the smallest deviation among
    /// those that are close and consistent with the target's trajectory, ties going to the lowest
    /// target index. The distance of an unmatched query is `f32::INFINITY`.
    pub fn match_blobs(
        &self,
        store: &TrajectoryStore,
        query_blobs: &[Blob],
        targets: &[(usize, Blob)],
    ) -> Result<MatchResult> {
        let mut result = MatchResult::unmatched(query_blobs.len(), f32::INFINITY);

        for (i, query) in query_blobs.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;

            for (j, (track_id, target)) in targets.iter().enumerate() {
                if !self.is_close(query, target) {
                    continue;
                }

                // found a close-by blob, time to check for trajectory
                if !store.is_trajectory_consistent(query, *track_id)? {
                    continue;
                }

                let deviation = Self::deviation(query, target);
                if best.map_or(true, |(_, best_deviation)| deviation < best_deviation) {
                    best = Some((j, deviation));
                }
            }

            trace!("query {} best candidate {:?}", i, best);
            if let Some((j, deviation)) = best {
                result.set(i, Some(j), deviation);
            }
        }

        Ok(result)
    }
}
