//! Candidate producers: exhaustive grid and uniform random.

use super::config::{SearchConfig, SearchMode, WeightRange};
use super::types::CandidateStrategy;
use crate::error::Result;
use crate::random::RandomService;

/// Enumerates the Cartesian grid of per-rule points, last rule fastest.
///
/// With no rules the grid holds exactly one (empty) candidate.
#[derive(Debug, Clone)]
pub struct GridCandidates {
    points: Vec<Vec<f64>>,
    cursor: Vec<usize>,
    started: bool,
    exhausted: bool,
}

impl GridCandidates {
    pub fn new(ranges: &[WeightRange], resolution: usize) -> Self {
        let points = ranges.iter().map(|r| r.grid_points(resolution)).collect();
        Self {
            points,
            cursor: vec![0; ranges.len()],
            started: false,
            exhausted: false,
        }
    }

    /// Points for the `position`-th mutable rule.
    pub fn points(&self, position: usize) -> &[f64] {
        &self.points[position]
    }

    /// Advances the odometer; false when it wraps around.
    fn advance(&mut self) -> bool {
        for digit in (0..self.cursor.len()).rev() {
            self.cursor[digit] += 1;
            if self.cursor[digit] < self.points[digit].len() {
                return true;
            }
            self.cursor[digit] = 0;
        }
        false
    }
}

impl CandidateStrategy for GridCandidates {
    fn next_candidate(&mut self, weights: &mut [f64], _random: &RandomService) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.started && !self.advance() {
            self.exhausted = true;
            return Ok(false);
        }
        self.started = true;

        for ((w, points), &k) in weights.iter_mut().zip(&self.points).zip(&self.cursor) {
            *w = points[k];
        }
        Ok(true)
    }

    fn candidate_count(&self) -> usize {
        self.points
            .iter()
            .fold(1usize, |acc, p| acc.saturating_mul(p.len()))
    }
}

/// Draws `trials` candidates, each component uniform in its range.
///
/// Degenerate ranges always yield their single point. With no rules a
/// single (empty) candidate is produced regardless of `trials`.
#[derive(Debug, Clone)]
pub struct RandomCandidates {
    ranges: Vec<WeightRange>,
    trials: usize,
    produced: usize,
}

impl RandomCandidates {
    pub fn new(ranges: Vec<WeightRange>, trials: usize) -> Self {
        let trials = if ranges.is_empty() { trials.min(1) } else { trials };
        Self {
            ranges,
            trials,
            produced: 0,
        }
    }
}

impl CandidateStrategy for RandomCandidates {
    fn next_candidate(&mut self, weights: &mut [f64], random: &RandomService) -> Result<bool> {
        if self.produced >= self.trials {
            return Ok(false);
        }
        for (w, range) in weights.iter_mut().zip(&self.ranges) {
            *w = if range.is_degenerate() {
                range.min
            } else {
                random.next_f64_range(range.min, range.max)?
            };
        }
        self.produced += 1;
        Ok(true)
    }

    fn candidate_count(&self) -> usize {
        self.trials
    }
}

/// The strategy selected by a [`SearchConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredCandidates {
    Grid(GridCandidates),
    Random(RandomCandidates),
}

impl ConfiguredCandidates {
    pub fn from_config(config: &SearchConfig, mutable_count: usize) -> Self {
        let ranges = config.resolved_ranges(mutable_count);
        match config.mode {
            SearchMode::Grid { resolution } => {
                ConfiguredCandidates::Grid(GridCandidates::new(&ranges, resolution))
            }
            SearchMode::Random { trials } => {
                ConfiguredCandidates::Random(RandomCandidates::new(ranges, trials))
            }
        }
    }
}

impl CandidateStrategy for ConfiguredCandidates {
    fn next_candidate(&mut self, weights: &mut [f64], random: &RandomService) -> Result<bool> {
        match self {
            ConfiguredCandidates::Grid(g) => g.next_candidate(weights, random),
            ConfiguredCandidates::Random(r) => r.next_candidate(weights, random),
        }
    }

    fn candidate_count(&self) -> usize {
        match self {
            ConfiguredCandidates::Grid(g) => g.candidate_count(),
            ConfiguredCandidates::Random(r) => r.candidate_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomConfig;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn drain(strategy: &mut impl CandidateStrategy, n: usize) -> Vec<Vec<f64>> {
        let random = RandomService::default();
        let mut out = Vec::new();
        let mut w = vec![0.0; n];
        while strategy.next_candidate(&mut w, &random).expect("valid ranges") {
            out.push(w.clone());
        }
        out
    }

    #[test]
    fn test_grid_three_rules_resolution_two() {
        let ranges = [
            WeightRange::new(0.0, 1.0),
            WeightRange::new(0.0, 2.0),
            WeightRange::new(0.0, 1.0),
        ];
        let mut grid = GridCandidates::new(&ranges, 2);
        assert_eq!(grid.candidate_count(), 8);

        let visited = drain(&mut grid, 3);
        assert_eq!(visited.len(), 8);
        assert_eq!(visited[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(visited[1], vec![0.0, 0.0, 1.0]);
        assert_eq!(visited[7], vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_grid_exhausted_stays_exhausted() {
        let mut grid = GridCandidates::new(&[WeightRange::new(0.0, 1.0)], 2);
        let random = RandomService::default();
        let mut w = [0.0];
        assert!(grid.next_candidate(&mut w, &random).expect("grid"));
        assert!(grid.next_candidate(&mut w, &random).expect("grid"));
        assert!(!grid.next_candidate(&mut w, &random).expect("grid"));
        assert!(!grid.next_candidate(&mut w, &random).expect("grid"));
    }

    #[test]
    fn test_grid_without_rules_yields_one_empty_candidate() {
        let mut grid = GridCandidates::new(&[], 4);
        assert_eq!(grid.candidate_count(), 1);
        assert_eq!(drain(&mut grid, 0), vec![Vec::<f64>::new()]);
    }

    #[test]
    fn test_grid_degenerate_range_single_point() {
        let ranges = [WeightRange::fixed(0.3), WeightRange::new(0.0, 1.0)];
        let visited = drain(&mut GridCandidates::new(&ranges, 3), 2);
        assert_eq!(visited.len(), 3);
        assert!(visited.iter().all(|v| v[0] == 0.3));
    }

    #[test]
    fn test_random_trial_count_and_degenerate() {
        let ranges = vec![WeightRange::fixed(2.0), WeightRange::new(-1.0, 1.0)];
        let mut random = RandomCandidates::new(ranges, 20);
        let visited = drain(&mut random, 2);
        assert_eq!(visited.len(), 20);
        assert!(visited.iter().all(|v| v[0] == 2.0));
    }

    #[test]
    fn test_random_without_rules_single_trial() {
        let mut random = RandomCandidates::new(Vec::new(), 50);
        assert_eq!(drain(&mut random, 0).len(), 1);
    }

    #[test]
    fn test_configured_dispatch() {
        let config = SearchConfig::default().with_mode(SearchMode::Grid { resolution: 3 });
        assert_eq!(ConfiguredCandidates::from_config(&config, 2).candidate_count(), 9);
        let config = config.with_mode(SearchMode::Random { trials: 7 });
        assert_eq!(ConfiguredCandidates::from_config(&config, 2).candidate_count(), 7);
    }

    fn ranges_strategy() -> impl Strategy<Value = Vec<WeightRange>> {
        prop::collection::vec((-10.0f64..10.0, 0.0f64..5.0), 0..4).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(min, width)| WeightRange::new(min, min + width))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_random_components_within_range(ranges in ranges_strategy(), seed in any::<u64>()) {
            let random = RandomService::new(RandomConfig::default().with_seed(seed));
            let mut candidates = RandomCandidates::new(ranges.clone(), 16);
            let mut w = vec![0.0; ranges.len()];
            while candidates.next_candidate(&mut w, &random).expect("valid ranges") {
                for (x, r) in w.iter().zip(&ranges) {
                    if r.is_degenerate() {
                        prop_assert_eq!(*x, r.min);
                    } else {
                        prop_assert!(*x >= r.min && *x < r.max);
                    }
                }
            }
        }

        #[test]
        fn prop_grid_is_exact_cartesian_product(ranges in ranges_strategy(), resolution in 1usize..4) {
            let mut grid = GridCandidates::new(&ranges, resolution);
            let expected = grid.candidate_count();
            let visited = drain(&mut grid, ranges.len());
            prop_assert_eq!(visited.len(), expected);

            let distinct: HashSet<Vec<u64>> = visited
                .iter()
                .map(|v| v.iter().map(|x| x.to_bits()).collect())
                .collect();
            prop_assert_eq!(distinct.len(), expected);

            for v in &visited {
                for (i, x) in v.iter().enumerate() {
                    prop_assert!(grid.points(i).contains(x));
                }
            }
        }
    }
}
