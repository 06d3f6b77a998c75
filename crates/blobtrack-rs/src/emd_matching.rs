use crate::*;
use ndarray::*;
use std::{fmt, rc::Rc};

/// A symmetric, non-negative ground distance between two feature vectors.
pub type DistanceFn = Rc<dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32>;

/// Built-in ground distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Manhattan,
    Chebyshev,
    Cosine,
}

impl Metric {
    /// Compute the distance between `a` and `b`.
    pub fn distance(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        match self {
            Metric::Euclidean => euclidean_distance(a, b),
            Metric::Manhattan => manhattan_distance(a, b),
            Metric::Chebyshev => chebyshev_distance(a, b),
            Metric::Cosine => cosine_distance(a, b),
        }
    }

    /// Returns the metric as a shareable distance function
    pub fn distance_fn(&self) -> DistanceFn {
        match self {
            Metric::Euclidean => Rc::new(euclidean_distance),
            Metric::Manhattan => Rc::new(manhattan_distance),
            Metric::Chebyshev => Rc::new(chebyshev_distance),
            Metric::Cosine => Rc::new(cosine_distance),
        }
    }
}

fn euclidean_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    (&a - &b).mapv(|v| v.powi(2)).sum().sqrt()
}

fn manhattan_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    (&a - &b).mapv(f32::abs).sum()
}

fn chebyshev_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    (&a - &b).fold(0.0, |accumulator, value| accumulator.max(value.abs()))
}

/// Cosine distance in `[0.0, 2.0]`. A zero vector has no direction and is at distance `1.0` from
/// everything.
fn cosine_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 {
        return 1.0;
    }
    (1.0 - a.dot(&b) / norm).clamp(0.0, 2.0)
}

/// Match query descriptors to database descriptors through the Earth Mover's Distance flow.
///
/// # Parameters
///
/// * `db_weights`: One weight per database descriptor.
/// * `db_features`: The database descriptors.
/// * `query_weights`: One weight per query descriptor.
/// * `query_features`: The query descriptors.
/// * `distance_fn`: The ground distance used by the transportation solve.
///
/// # Returns
///
/// One entry per query descriptor holding the database descriptor that receives the most mass from
/// it (ties go to the lowest index) and that transported mass. The distances are therefore
/// similarity-like, higher meaning a stronger correspondence, and not a minimized cost.
///
/// A query descriptor that transports no mass at all is unmatched (`None`) with distance `0.0`.
/// The lowest-index tie rule does not apply to such an all-zero column, so it is never reported as
/// a zero-mass match to database descriptor 0.
pub fn emd_match(
    db_weights: &[f32],
    db_features: &[Vec<f32>],
    query_weights: &[f32],
    query_features: &[Vec<f32>],
    distance_fn: &dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32,
) -> Result<MatchResult> {
    let db = Signature::build(db_weights, db_features)?;
    let query = Signature::build(query_weights, query_features)?;

    match_signatures(&TransportationSimplex::default(), &db, &query, distance_fn)
}

fn match_signatures(
    solver: &dyn TransportationSolver,
    db: &Signature,
    query: &Signature,
    distance_fn: &dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32,
) -> Result<MatchResult> {
    if db.is_empty() || query.is_empty() {
        return Ok(MatchResult::unmatched(query.len(), 0.0));
    }

    let plan = solver.solve(db, query, distance_fn)?;
    Ok(strongest_flow(plan.flow()))
}

/// Read the strongest incoming flow of every column.
fn strongest_flow(flow: &Array2<f32>) -> MatchResult {
    let mut result = MatchResult::unmatched(flow.ncols(), 0.0);

    flow.columns()
        .into_iter()
        .enumerate()
        .for_each(|(i, column)| {
            let strongest = column
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f32)>, (j, &value)| match best {
                    Some((_, best_value)) if best_value >= value => best,
                    _ => Some((j, value)),
                });

            if let Some((j, value)) = strongest {
                if value > 0.0 {
                    result.set(i, Some(j), value);
                }
            }
        });

    result
}

/// A descriptor matcher that indexes a weighted database once and matches query sets against it.
#[derive(Clone)]
pub struct EmdMatcher {
    /// The ground distance.
    distance_fn: DistanceFn,
    /// The transportation solver.
    solver: TransportationSimplex,
    /// The indexed database signature.
    db: Option<Signature>,
}

impl Default for EmdMatcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for EmdMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmdMatcher")
            .field("solver", &self.solver)
            .field("db", &self.db)
            .finish()
    }
}

impl EmdMatcher {
    /// Returns a new EmdMatcher
    ///
    /// # Parameters
    ///
    /// * `metric`: The ground distance. Default `Metric::Euclidean`.
    pub fn new(metric: Option<Metric>) -> EmdMatcher {
        EmdMatcher {
            distance_fn: metric.unwrap_or(Metric::Euclidean).distance_fn(),
            solver: TransportationSimplex::default(),
            db: None,
        }
    }

    /// Set metric
    pub fn with_metric(&mut self, metric: Metric) -> &mut Self {
        self.distance_fn = metric.distance_fn();
        self
    }

    /// Set a caller supplied ground distance
    pub fn with_distance_fn(&mut self, distance_fn: DistanceFn) -> &mut Self {
        self.distance_fn = distance_fn;
        self
    }

    /// Set the maximum number of solver iterations
    pub fn with_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.solver.with_max_iterations(max_iterations);
        self
    }

    /// Return the indexed database signature
    pub fn db(&self) -> Option<&Signature> {
        self.db.as_ref()
    }

    /// Store the database descriptors and their weights, replacing any previous index.
    pub fn index(&mut self, weights: &[f32], features: &[Vec<f32>]) -> Result<()> {
        self.db = Some(Signature::build(weights, features)?);
        Ok(())
    }

    fn indexed(&self) -> Result<&Signature> {
        self.db.as_ref().ok_or_else(|| {
            Error::InvalidArgument("no database descriptors have been indexed".to_string())
        })
    }

    /// Solve the transportation problem from the database to the query descriptors.
    pub fn transport_plan(&self, weights: &[f32], features: &[Vec<f32>]) -> Result<TransportPlan> {
        let db = self.indexed()?;
        let query = Signature::build(weights, features)?;
        self.solver.solve(db, &query, self.distance_fn.as_ref())
    }

    /// Match query descriptors against the database, see [`emd_match`].
    pub fn match_descriptors(&self, weights: &[f32], features: &[Vec<f32>]) -> Result<MatchResult> {
        let db = self.indexed()?;
        let query = Signature::build(weights, features)?;
        match_signatures(&self.solver, db, &query, self.distance_fn.as_ref())
    }

    /// Earth Mover's Distance between the database and the query descriptors.
    ///
    /// This is the minimized total cost divided by the transported mass, `0.0` when nothing is
    /// transported.
    pub fn emd(&self, weights: &[f32], features: &[Vec<f32>]) -> Result<f32> {
        Ok(self.transport_plan(weights, features)?.emd())
    }
}
