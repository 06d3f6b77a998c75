//! Blob tracking and weighted descriptor matching.
//!
//! Two correspondence problems are covered:
//!
//! - associating the blobs detected in a frame with previously tracked blobs using spatial
//!   proximity and motion consistency ([`ProximityTrajectoryMatcher`], [`TrajectoryStore`],
//!   [`BlobTracker`]);
//! - associating two sets of weighted feature descriptors by solving the Earth Mover's Distance
//!   transportation problem and reading the strongest flow per query point ([`emd_match`],
//!   [`EmdMatcher`]).

mod blob;
mod bounding_box;
mod emd_matching;
mod error;
mod linear_assignment;
mod proximity_matching;
mod signature;
mod track;
mod tracker;
mod trajectory;
mod transportation;

pub use blob::{Blob, BlobDetector};
pub use bounding_box::BoundingBox;
pub use emd_matching::{emd_match, DistanceFn, EmdMatcher, Metric};
pub use error::{Error, Result};
pub use linear_assignment::{resolve_conflicts, Match, MatchResult};
pub use proximity_matching::ProximityTrajectoryMatcher;
pub use signature::Signature;
pub use track::{Track, TrackState};
pub use tracker::BlobTracker;
pub use trajectory::TrajectoryStore;
pub use transportation::{TransportPlan, TransportationSimplex, TransportationSolver};
