//! Weight search execution loop.
//!
//! # Algorithm
//!
//! 1. Bind to the rule set; the mutable rules define the weight vector
//! 2. Hand the ground model to the inspector once (`initialize`)
//! 3. For every candidate produced by the strategy:
//!    a. Inspect the location (apply weights, score, possibly refine)
//!    b. Keep it if strictly better than the incumbent
//! 4. Write the best vector back into the rules
//! 5. Release the inspector (`close`)

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::SearchConfig;
use super::rules::{Rule, RuleSet};
use super::strategy::ConfiguredCandidates;
use super::types::{CandidateStrategy, GroundModel, GroundModelHook, LocationInspector};
use crate::error::{Error, Result};
use crate::random::RandomService;

/// Result of a weight search run.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best weights found, index-aligned with the mutable rules.
    pub best_weights: Vec<f64>,

    /// Score of the best weights.
    pub best_score: f64,

    /// Number of locations inspected.
    pub iterations: usize,

    /// Iteration at which the best weights were found.
    pub best_iteration: usize,

    /// Score of every inspected location, in order.
    pub score_history: Vec<f64>,

    /// Best score after each iteration.
    pub best_score_history: Vec<f64>,
}

/// Lifecycle of a [`WeightSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Bound to rules, ground model not yet seen.
    Created,
    /// Ground model handed to the inspector; ready to run.
    Initialized,
    /// Run complete or aborted; rules hold the best weights scored.
    Finished,
    /// Resources released.
    Closed,
}

/// Searches the weight space of a rule set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_weightsearch::random::RandomService;
/// use u_weightsearch::search::{
///     DirectInspector, GroundModel, RuleSet, SearchConfig, SearchMode, WeightSearch, WeightedRule,
/// };
///
/// let rules = RuleSet::new(vec![WeightedRule::new("a", 0.0), WeightedRule::new("b", 0.0)]);
/// // distance from (0.5, 1.0)
/// let evaluator = |rules: &RuleSet<WeightedRule>| -> u_weightsearch::Result<f64> {
///     let w = rules.weights();
///     Ok((w[0] - 0.5).abs() + (w[1] - 1.0).abs())
/// };
/// let config = SearchConfig::default().with_mode(SearchMode::Grid { resolution: 3 });
///
/// let mut search = WeightSearch::new(
///     rules,
///     DirectInspector::new(evaluator),
///     config,
///     Arc::new(RandomService::default()),
/// )
/// .unwrap();
/// search.initialize(&GroundModel::new(Arc::new(()), Arc::new(()))).unwrap();
/// let result = search.run().unwrap();
/// search.close().unwrap();
///
/// assert_eq!(result.iterations, 9);
/// assert_eq!(result.best_weights, vec![0.5, 1.0]);
/// assert_eq!(search.rules().weights(), vec![0.5, 1.0]);
/// ```
#[derive(Debug)]
pub struct WeightSearch<R, I> {
    rules: RuleSet<R>,
    inspector: I,
    config: SearchConfig,
    random: Arc<RandomService>,
    phase: SearchPhase,
}

impl<R, I> WeightSearch<R, I>
where
    R: Rule,
    I: LocationInspector<R>,
{
    /// Binds a search to `rules`.
    ///
    /// # Errors
    /// [`Error::Config`] if `config` is invalid for these rules.
    pub fn new(
        rules: RuleSet<R>,
        inspector: I,
        config: SearchConfig,
        random: Arc<RandomService>,
    ) -> Result<Self> {
        config.validate_for(rules.mutable_count())?;
        Ok(Self {
            rules,
            inspector,
            config,
            random,
            phase: SearchPhase::Created,
        })
    }

    /// Hands the ground model to the inspector. Must precede [`run`](Self::run).
    pub fn initialize<G, T>(&mut self, model: &GroundModel<G, T>) -> Result<()>
    where
        I: GroundModelHook<G, T>,
    {
        self.expect_phase(SearchPhase::Created, "initialize")?;
        self.inspector.post_init_ground_model(model)?;
        self.phase = SearchPhase::Initialized;
        Ok(())
    }

    /// Runs the configured grid or random search.
    pub fn run(&mut self) -> Result<SearchResult> {
        let mut strategy = ConfiguredCandidates::from_config(&self.config, self.rules.mutable_count());
        self.run_with_strategy(&mut strategy)
    }

    /// Runs the search over candidates from `strategy`.
    ///
    /// On success the rules hold the best weights found. If a location
    /// fails to score, the rules are restored to the best weights scored so
    /// far (or to their pre-run weights when none was scored), the search
    /// moves to [`SearchPhase::Finished`] and the error is returned.
    pub fn run_with_strategy<S: CandidateStrategy>(&mut self, strategy: &mut S) -> Result<SearchResult> {
        self.expect_phase(SearchPhase::Initialized, "run")?;

        let mut initial = vec![0.0; self.rules.mutable_count()];
        self.rules.read_weights(&mut initial)?;

        let direction = self.config.direction;
        let mut progress = Progress::with_capacity(strategy.candidate_count().min(1 << 16));

        info!(
            mutable_rules = initial.len(),
            candidates = strategy.candidate_count(),
            ?direction,
            "starting weight search"
        );

        let outcome = self.explore(strategy, &mut progress);

        let restored = progress.best.as_ref().map_or(&initial, |(weights, _)| weights);
        self.rules.apply_weights(restored)?;
        self.phase = SearchPhase::Finished;

        if let Err(err) = outcome {
            warn!(
                iterations = progress.score_history.len(),
                restored = ?restored,
                error = %err,
                "weight search aborted"
            );
            return Err(err);
        }

        let Progress {
            best,
            best_iteration,
            score_history,
            best_score_history,
        } = progress;
        let (best_weights, best_score) = best.ok_or_else(|| {
            Error::InvalidState("candidate strategy produced no locations".into())
        })?;

        info!(
            iterations = score_history.len(),
            best_iteration,
            best_score,
            "weight search finished"
        );

        Ok(SearchResult {
            best_weights,
            best_score,
            iterations: score_history.len(),
            best_iteration,
            score_history,
            best_score_history,
        })
    }

    fn explore<S: CandidateStrategy>(&mut self, strategy: &mut S, progress: &mut Progress) -> Result<()> {
        let direction = self.config.direction;
        let mut weights = vec![0.0; self.rules.mutable_count()];

        while strategy.next_candidate(&mut weights, &self.random)? {
            let iteration = progress.score_history.len();
            let score = self.inspector.inspect(&mut self.rules, &mut weights)?;
            if score.is_nan() {
                return Err(Error::Evaluation(format!(
                    "location {weights:?} scored NaN"
                )));
            }
            debug!(iteration, score, ?weights, "inspected location");

            let improved = progress
                .best
                .as_ref()
                .is_none_or(|&(_, incumbent)| direction.is_improvement(score, incumbent));
            if improved {
                debug!(iteration, score, "new best location");
                progress.best = Some((weights.clone(), score));
                progress.best_iteration = iteration;
            }

            progress.score_history.push(score);
            if let Some((_, best_score)) = &progress.best {
                progress.best_score_history.push(*best_score);
            }
        }
        Ok(())
    }

    /// Releases the inspector (and any embedded learner). Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.phase == SearchPhase::Closed {
            return Ok(());
        }
        self.phase = SearchPhase::Closed;
        self.inspector.close()
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn rules(&self) -> &RuleSet<R> {
        &self.rules
    }

    pub fn into_rules(self) -> RuleSet<R> {
        self.rules
    }

    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn expect_phase(&self, expected: SearchPhase, operation: &str) -> Result<()> {
        if self.phase != expected {
            return Err(Error::InvalidState(format!(
                "cannot {operation} a weight search in phase {:?}",
                self.phase
            )));
        }
        Ok(())
    }
}

/// Incumbent and histories accumulated while exploring.
#[derive(Debug, Default)]
struct Progress {
    best: Option<(Vec<f64>, f64)>,
    best_iteration: usize,
    score_history: Vec<f64>,
    best_score_history: Vec<f64>,
}

impl Progress {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            score_history: Vec::with_capacity(capacity),
            best_score_history: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }
}
