use crate::*;
use fixedbitset::FixedBitSet;
use log::{debug, trace, warn};
use ndarray::*;

/// The outcome of a transportation solve.
#[derive(Debug, Clone)]
pub struct TransportPlan {
    /// Transported mass, one row per source point and one column per target point.
    flow: Array2<f32>,
    /// Total transportation cost, i.e. the sum of flow times distance.
    cost: f64,
}

impl TransportPlan {
    /// Returns an empty plan of the given shape
    fn empty(rows: usize, cols: usize) -> TransportPlan {
        TransportPlan {
            flow: Array2::zeros((rows, cols)),
            cost: 0.0,
        }
    }

    /// Returns the flow matrix
    pub fn flow(&self) -> &Array2<f32> {
        &self.flow
    }

    /// Returns the total transportation cost
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Returns the total transported mass
    pub fn total_flow(&self) -> f64 {
        self.flow.iter().map(|v| *v as f64).sum()
    }

    /// Returns the Earth Mover's Distance, the total cost normalized by the total transported mass.
    pub fn emd(&self) -> f32 {
        let total_flow = self.total_flow();
        if total_flow > 0.0 {
            (self.cost / total_flow) as f32
        } else {
            0.0
        }
    }
}

/// A solver for the transportation problem between two signatures.
///
/// Implementations must return a flow whose row sums do not exceed the source weights, whose
/// column sums do not exceed the target weights and whose total equals the smaller of the two
/// total masses, at minimum total cost.
pub trait TransportationSolver {
    /// Solve the transportation problem.
    ///
    /// # Parameters
    ///
    /// * `source`: The source signature (flow rows).
    /// * `target`: The target signature (flow columns).
    /// * `distance`: A symmetric, non-negative ground distance between two feature vectors.
    fn solve(
        &self,
        source: &Signature,
        target: &Signature,
        distance: &dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32,
    ) -> Result<TransportPlan>;
}

/// Transportation simplex: north-west corner start, then MODI (u-v potentials) pivoting.
///
/// Unequal total masses are balanced with a zero cost dummy row or column so the surplus mass stays
/// where it is. Working matrices are allocated per solve.
#[derive(Debug, Clone)]
pub struct TransportationSimplex {
    /// Maximum number of pivots before giving up.
    max_iterations: usize,
}

impl Default for TransportationSimplex {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TransportationSimplex {
    /// Returns a new TransportationSimplex
    ///
    /// # Parameters
    ///
    /// * `max_iterations`: Maximum number of pivots. Default `10_000`.
    pub fn new(max_iterations: Option<usize>) -> TransportationSimplex {
        TransportationSimplex {
            max_iterations: max_iterations.unwrap_or(10_000),
        }
    }

    /// Set max_iterations
    pub fn with_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl TransportationSolver for TransportationSimplex {
    fn solve(
        &self,
        source: &Signature,
        target: &Signature,
        distance: &dyn Fn(ArrayView1<f32>, ArrayView1<f32>) -> f32,
    ) -> Result<TransportPlan> {
        let (m, n) = (source.len(), target.len());
        if m == 0 || n == 0 {
            return Ok(TransportPlan::empty(m, n));
        }
        if source.dimension() != target.dimension() {
            return Err(Error::DimensionMismatch {
                context: "transportation signatures",
                expected: source.dimension(),
                got: target.dimension(),
            });
        }
        if source
            .weights()
            .iter()
            .chain(target.weights().iter())
            .any(|weight| *weight < 0.0)
        {
            return Err(Error::InvalidArgument(
                "signature weights must be non-negative".to_string(),
            ));
        }

        let mut supply = source.weights().mapv(|v| v as f64).to_vec();
        let mut demand = target.weights().mapv(|v| v as f64).to_vec();
        let total_supply: f64 = supply.iter().sum();
        let total_demand: f64 = demand.iter().sum();
        if total_supply <= 0.0 || total_demand <= 0.0 {
            return Ok(TransportPlan::empty(m, n));
        }

        // balance with a dummy that absorbs the surplus at no cost
        if total_supply > total_demand {
            demand.push(total_supply - total_demand);
        } else if total_demand > total_supply {
            supply.push(total_demand - total_supply);
        }
        let (rows, cols) = (supply.len(), demand.len());

        let mut cost = Array2::<f64>::zeros((rows, cols));
        for i in 0..m {
            for j in 0..n {
                let d = distance(source.feature(i), target.feature(j));
                if !d.is_finite() || d < 0.0 {
                    return Err(Error::InvalidArgument(format!(
                        "distance between source {} and target {} is {}",
                        i, j, d
                    )));
                }
                cost[[i, j]] = d as f64;
            }
        }

        let mut tableau = Tableau::north_west_corner(&supply, &demand);
        let epsilon = 1e-9 * cost.fold(1.0f64, |acc, v| acc.max(*v));

        let mut iterations = 0;
        loop {
            let (u, v) = tableau.potentials(&cost);
            let entering = tableau.entering(&cost, &u, &v, epsilon);

            let Some((p, q)) = entering else {
                break;
            };
            if iterations >= self.max_iterations {
                warn!(
                    "transportation solve stopped after {} iterations ({}x{})",
                    iterations, m, n
                );
                return Err(Error::NotConverged { iterations });
            }

            tableau.pivot(p, q);
            iterations += 1;
        }

        let flow = tableau.flow.slice(s![..m, ..n]).mapv(|v| v as f32);
        let total_cost = (&tableau.flow.slice(s![..m, ..n]) * &cost.slice(s![..m, ..n])).sum();
        debug!(
            "transportation solved {}x{} in {} iterations, cost {}",
            m, n, iterations, total_cost
        );

        Ok(TransportPlan {
            flow,
            cost: total_cost,
        })
    }
}

/// Working state of the transportation simplex.
///
/// The basic cells always form a spanning tree over the `rows + cols` row and column nodes.
struct Tableau {
    rows: usize,
    cols: usize,
    flow: Array2<f64>,
    basis: FixedBitSet,
}

impl Tableau {
    /// Initial basic feasible solution. Degenerate zero flow cells are kept in the basis so that it
    /// always holds `rows + cols - 1` cells.
    fn north_west_corner(supply: &[f64], demand: &[f64]) -> Tableau {
        let (rows, cols) = (supply.len(), demand.len());
        let mut flow = Array2::<f64>::zeros((rows, cols));
        let mut basis = FixedBitSet::with_capacity(rows * cols);
        let mut supply = supply.to_vec();
        let mut demand = demand.to_vec();

        let (mut i, mut j) = (0, 0);
        loop {
            let x = supply[i].min(demand[j]);
            flow[[i, j]] = x;
            basis.insert(i * cols + j);
            supply[i] -= x;
            demand[j] -= x;

            if i == rows - 1 && j == cols - 1 {
                break;
            }
            if (supply[i] <= 0.0 && i < rows - 1) || j == cols - 1 {
                i += 1;
            } else {
                j += 1;
            }
        }

        Tableau {
            rows,
            cols,
            flow,
            basis,
        }
    }

    fn is_basic(&self, i: usize, j: usize) -> bool {
        self.basis.contains(i * self.cols + j)
    }

    /// Adjacency of the basis tree. Nodes `0..rows` are rows, `rows..rows + cols` are columns.
    fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.rows + self.cols];
        self.basis.ones().for_each(|cell| {
            let (i, j) = (cell / self.cols, cell % self.cols);
            adjacency[i].push(self.rows + j);
            adjacency[self.rows + j].push(i);
        });
        adjacency
    }

    /// Solve `u[i] + v[j] = cost[i][j]` over the basic cells with `u[0] = 0`.
    fn potentials(&self, cost: &Array2<f64>) -> (Vec<f64>, Vec<f64>) {
        let adjacency = self.adjacency();
        let mut u = vec![0.0; self.rows];
        let mut v = vec![0.0; self.cols];
        let mut visited = FixedBitSet::with_capacity(self.rows + self.cols);

        let mut stack = vec![0];
        visited.insert(0);
        while let Some(node) = stack.pop() {
            for &next in &adjacency[node] {
                if visited.put(next) {
                    continue;
                }
                if node < self.rows {
                    let j = next - self.rows;
                    v[j] = cost[[node, j]] - u[node];
                } else {
                    let j = node - self.rows;
                    u[next] = cost[[next, j]] - v[j];
                }
                stack.push(next);
            }
        }

        (u, v)
    }

    /// The non-basic cell with the most negative reduced cost, if any is below `-epsilon`.
    fn entering(
        &self,
        cost: &Array2<f64>,
        u: &[f64],
        v: &[f64],
        epsilon: f64,
    ) -> Option<(usize, usize)> {
        let mut best = -epsilon;
        let mut entering = None;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if self.is_basic(i, j) {
                    continue;
                }
                let reduced = cost[[i, j]] - u[i] - v[j];
                if reduced < best {
                    best = reduced;
                    entering = Some((i, j));
                }
            }
        }
        entering
    }

    /// Path of basic cells from row `p` to column `q` in the basis tree.
    fn tree_path(&self, p: usize, q: usize) -> Vec<(usize, usize)> {
        let adjacency = self.adjacency();
        let goal = self.rows + q;
        let mut parent = vec![usize::MAX; self.rows + self.cols];
        parent[p] = p;

        let mut stack = vec![p];
        while let Some(node) = stack.pop() {
            if node == goal {
                break;
            }
            for &next in &adjacency[node] {
                if parent[next] == usize::MAX {
                    parent[next] = node;
                    stack.push(next);
                }
            }
        }

        let mut path = Vec::new();
        let mut node = goal;
        while node != p {
            let previous = parent[node];
            let cell = if previous < self.rows {
                (previous, node - self.rows)
            } else {
                (node, previous - self.rows)
            };
            path.push(cell);
            node = previous;
        }
        path.reverse();
        path
    }

    /// Bring cell `(p, q)` into the basis and drop the first cell that runs out of flow.
    fn pivot(&mut self, p: usize, q: usize) {
        // cells alternate between losing and gaining flow along the cycle, starting with a loss
        let path = self.tree_path(p, q);

        let (leaving, theta) = path
            .iter()
            .step_by(2)
            .fold(None, |best: Option<((usize, usize), f64)>, &(i, j)| {
                let x = self.flow[[i, j]];
                match best {
                    Some((_, theta)) if theta <= x => best,
                    _ => Some(((i, j), x)),
                }
            })
            .unwrap_or(((p, q), 0.0));

        trace!(
            "pivot enter ({}, {}) leave {:?} theta {}",
            p,
            q,
            leaving,
            theta
        );

        self.flow[[p, q]] += theta;
        path.iter().enumerate().for_each(|(k, &(i, j))| {
            if k % 2 == 0 {
                self.flow[[i, j]] = (self.flow[[i, j]] - theta).max(0.0);
            } else {
                self.flow[[i, j]] += theta;
            }
        });
        self.flow[leaving] = 0.0;

        self.basis.set(leaving.0 * self.cols + leaving.1, false);
        self.basis.insert(p * self.cols + q);
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use anyhow::Result;
    use assert_approx_eq::assert_approx_eq;
    use itertools::Itertools;
    use ndarray::*;
    use rand::prelude::*;
    use rand_pcg::Pcg32;

    fn absolute(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
        (a[0] - b[0]).abs()
    }

    /// Closed form one dimensional EMD cost: the area between the two cumulative mass functions.
    fn emd_1d(source: &[(f32, f32)], target: &[(f32, f32)]) -> f64 {
        let points = source
            .iter()
            .map(|(x, w)| (*x as f64, *w as f64))
            .chain(target.iter().map(|(x, w)| (*x as f64, -(*w as f64))))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect::<Vec<_>>();

        let mut cumulative = 0.0;
        points
            .windows(2)
            .map(|pair| {
                cumulative += pair[0].1;
                cumulative.abs() * (pair[1].0 - pair[0].0)
            })
            .sum()
    }

    fn signature_1d(points: &[(f32, f32)]) -> Result<Signature> {
        let weights = points.iter().map(|(_, w)| *w).collect::<Vec<_>>();
        let features = points.iter().map(|(x, _)| vec![*x]).collect::<Vec<_>>();
        Ok(Signature::build(&weights, &features)?)
    }

    #[test]
    fn solve_reverses_north_west_corner() -> Result<()> {
        let source = signature_1d(&[(0.0, 1.0), (10.0, 1.0)])?;
        let target = signature_1d(&[(10.0, 1.0), (0.0, 1.0)])?;

        let plan = TransportationSimplex::default().solve(&source, &target, &absolute)?;
        assert_eq!(plan.flow(), &array![[0.0f32, 1.0], [1.0, 0.0]]);
        assert_approx_eq!(plan.cost(), 0.0);
        assert_approx_eq!(plan.emd(), 0.0);
        Ok(())
    }

    #[test]
    fn solve_textbook() -> Result<()> {
        // supplies 3 and 5 at x=0 and x=4, demands 4, 2, 2 at x=1, x=3, x=6
        let source = signature_1d(&[(0.0, 3.0), (4.0, 5.0)])?;
        let target = signature_1d(&[(1.0, 4.0), (3.0, 2.0), (6.0, 2.0)])?;

        let plan = TransportationSimplex::default().solve(&source, &target, &absolute)?;
        // 3 * 1 + 1 * 3 + 2 * 1 + 2 * 2
        assert_approx_eq!(plan.cost(), 12.0);
        assert_approx_eq!(plan.total_flow(), 8.0);
        assert_approx_eq!(plan.emd(), 1.5);
        Ok(())
    }

    #[test]
    fn solve_unbalanced() -> Result<()> {
        let source = signature_1d(&[(0.0, 1.0)])?;
        let target = signature_1d(&[(0.0, 0.6), (10.0, 0.4), (20.0, 5.0)])?;

        let plan = TransportationSimplex::default().solve(&source, &target, &absolute)?;
        assert_approx_eq!(plan.total_flow(), 1.0);
        assert_approx_eq!(plan.flow()[[0, 0]], 0.6);
        assert_approx_eq!(plan.flow()[[0, 1]], 0.4);
        assert_approx_eq!(plan.flow()[[0, 2]], 0.0);
        Ok(())
    }

    #[test]
    fn solve_empty() -> Result<()> {
        let empty = Signature::build(&[], &[])?;
        let source = signature_1d(&[(0.0, 1.0), (1.0, 1.0)])?;

        let plan = TransportationSimplex::default().solve(&source, &empty, &absolute)?;
        assert_eq!(plan.flow().dim(), (2, 0));
        let plan = TransportationSimplex::default().solve(&empty, &source, &absolute)?;
        assert_eq!(plan.flow().dim(), (0, 2));
        assert_eq!(plan.cost(), 0.0);
        Ok(())
    }

    #[test]
    fn solve_zero_mass() -> Result<()> {
        let source = signature_1d(&[(0.0, 0.0), (1.0, 0.0)])?;
        let target = signature_1d(&[(0.0, 1.0)])?;

        let plan = TransportationSimplex::default().solve(&source, &target, &absolute)?;
        assert_eq!(plan.flow(), &Array2::<f32>::zeros((2, 1)));
        assert_eq!(plan.emd(), 0.0);
        Ok(())
    }

    #[test]
    fn solve_invalid() -> Result<()> {
        let solver = TransportationSimplex::default();
        let source = signature_1d(&[(0.0, 1.0)])?;

        let negative = signature_1d(&[(0.0, -1.0)])?;
        assert!(matches!(
            solver.solve(&source, &negative, &absolute),
            Err(Error::InvalidArgument(_))
        ));

        let planar = Signature::build(&[1.0], &[vec![0.0, 0.0]])?;
        assert!(matches!(
            solver.solve(&source, &planar, &absolute),
            Err(Error::DimensionMismatch { .. })
        ));

        fn negative_cost(_: ArrayView1<f32>, _: ArrayView1<f32>) -> f32 {
            -1.0
        }
        assert!(matches!(
            solver.solve(&source, &source, &negative_cost),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn solve_not_converged() -> Result<()> {
        let source = signature_1d(&[(0.0, 1.0), (10.0, 1.0)])?;
        let target = signature_1d(&[(10.0, 1.0), (0.0, 1.0)])?;

        let mut solver = TransportationSimplex::default();
        solver.with_max_iterations(0);
        assert!(matches!(
            solver.solve(&source, &target, &absolute),
            Err(Error::NotConverged { iterations: 0 })
        ));

        // an optimal starting point needs no pivot
        assert!(solver.solve(&source, &source, &absolute).is_ok());
        Ok(())
    }

    #[test]
    fn solve_random_1d() -> Result<()> {
        let mut rng = Pcg32::seed_from_u64(0);
        let solver = TransportationSimplex::default();

        for _ in 0..50 {
            let m = rng.gen_range(1..8);
            let n = rng.gen_range(1..8);
            let source = (0..m)
                .map(|_| (rng.gen_range(-50.0..50.0), rng.gen_range(0.1..4.0)))
                .collect::<Vec<(f32, f32)>>();
            let target = (0..n)
                .map(|_| (rng.gen_range(-50.0..50.0), rng.gen_range(0.1..4.0)))
                .collect::<Vec<(f32, f32)>>();

            // equal masses so that the closed form applies
            let source_mass: f32 = source.iter().map(|(_, w)| w).sum();
            let target_mass: f32 = target.iter().map(|(_, w)| w).sum();
            let target = target
                .into_iter()
                .map(|(x, w)| (x, w * source_mass / target_mass))
                .collect::<Vec<_>>();

            let plan = solver.solve(&signature_1d(&source)?, &signature_1d(&target)?, &absolute)?;
            let expected = emd_1d(&source, &target);
            assert!(
                (plan.cost() - expected).abs() <= 1e-3 * expected.max(1.0),
                "cost {} expected {}",
                plan.cost(),
                expected
            );

            let flow = plan.flow();
            assert!(flow.iter().all(|v| *v >= 0.0));
            flow.sum_axis(Axis(1))
                .iter()
                .zip(source.iter())
                .for_each(|(sum, (_, w))| assert!(*sum <= w + 1e-3));
            flow.sum_axis(Axis(0))
                .iter()
                .zip(target.iter())
                .for_each(|(sum, (_, w))| assert!(*sum <= w + 1e-3));
        }
        Ok(())
    }
}
