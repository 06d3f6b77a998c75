use std::collections::HashSet;

/// A single query to target association.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub query: usize,
    pub target: usize,
    pub distance: f32,
}

impl Match {
    /// Return a new Match
    ///
    /// # Parameters
    ///
    /// * `query`: The query index.
    /// * `target`: The matched target index.
    /// * `distance`: Match score, its meaning depends on the matcher that produced it.
    pub fn new(query: usize, target: usize, distance: f32) -> Match {
        Match {
            query,
            target,
            distance,
        }
    }
}

/// The outcome of matching a query set against a target set.
///
/// There is exactly one entry per query element. `matches[i]` is the target index of query `i`, or
/// `None` when nothing matched, and `distances[i]` is the corresponding score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    matches: Vec<Option<usize>>,
    distances: Vec<f32>,
}

impl MatchResult {
    /// Returns a MatchResult of `len` unmatched entries, each carrying `distance`.
    pub fn unmatched(len: usize, distance: f32) -> MatchResult {
        MatchResult {
            matches: vec![None; len],
            distances: vec![distance; len],
        }
    }

    /// Returns the number of query entries
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns true if there are no query entries
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Returns the target index per query
    pub fn matches(&self) -> &[Option<usize>] {
        &self.matches
    }

    /// Returns the score per query
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Returns the target and score of query `index`
    pub fn get(&self, index: usize) -> Option<(Option<usize>, f32)> {
        Some((*self.matches.get(index)?, *self.distances.get(index)?))
    }

    /// Set the entry of query `index`
    pub(crate) fn set(&mut self, index: usize, target: Option<usize>, distance: f32) {
        self.matches[index] = target;
        self.distances[index] = distance;
    }

    /// Returns the matched pairs in query order
    pub fn iter_matches(&self) -> impl Iterator<Item = Match> + '_ {
        self.matches
            .iter()
            .zip(self.distances.iter())
            .enumerate()
            .filter_map(|(query, (target, distance))| {
                target.map(|target| Match::new(query, target, *distance))
            })
    }

    /// Returns the indices of the unmatched queries
    pub fn unmatched_queries(&self) -> Vec<usize> {
        self.matches
            .iter()
            .enumerate()
            .filter(|(_, target)| target.is_none())
            .map(|(query, _)| query)
            .collect()
    }
}

/// Enforce a one-to-one association on a MatchResult whose distances are lower-is-better.
///
/// Matched pairs are ranked by ascending distance (ties by query index) and greedily accepted, each
/// target at most once. Queries that lose their target become unmatched and keep the distance
/// `unmatched_distance`.
pub fn resolve_conflicts(result: &MatchResult, unmatched_distance: f32) -> MatchResult {
    let mut pairs = result.iter_matches().collect::<Vec<_>>();
    pairs.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.query.cmp(&b.query))
    });

    let mut resolved = MatchResult::unmatched(result.len(), unmatched_distance);
    let mut used_targets = HashSet::new();
    pairs.into_iter().for_each(|pair| {
        if used_targets.insert(pair.target) {
            resolved.set(pair.query, Some(pair.target), pair.distance);
        }
    });

    resolved
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn unmatched() {
        let result = MatchResult::unmatched(3, f32::INFINITY);
        assert_eq!(result.len(), 3);
        assert_eq!(result.matches(), &[None, None, None]);
        assert_eq!(result.unmatched_queries(), vec![0, 1, 2]);
        assert_eq!(result.iter_matches().count(), 0);
    }

    #[test]
    fn resolve_conflicts() {
        let mut result = MatchResult::unmatched(4, f32::INFINITY);
        result.set(0, Some(1), 3.0);
        result.set(1, Some(1), 1.0);
        result.set(2, Some(0), 2.0);

        let resolved = linear_assignment::resolve_conflicts(&result, f32::INFINITY);
        assert_eq!(resolved.matches(), &[None, Some(1), Some(0), None]);
        assert_eq!(resolved.distances()[0], f32::INFINITY);
        assert_eq!(resolved.distances()[1], 1.0);
        assert_eq!(
            resolved.iter_matches().collect::<Vec<_>>(),
            vec![Match::new(1, 1, 1.0), Match::new(2, 0, 2.0)]
        );
    }

    #[test]
    fn resolve_conflicts_ties_by_query() {
        let mut result = MatchResult::unmatched(2, f32::INFINITY);
        result.set(0, Some(0), 1.0);
        result.set(1, Some(0), 1.0);

        let resolved = linear_assignment::resolve_conflicts(&result, f32::INFINITY);
        assert_eq!(resolved.matches(), &[Some(0), None]);
    }
}
