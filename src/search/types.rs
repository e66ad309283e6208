//! Capability traits plugged into the weight search.

use std::sync::Arc;

use super::rules::{Rule, RuleSet};
use crate::error::Result;
use crate::random::RandomService;

/// The ground model a search runs against.
///
/// Both handles are opaque to the search; they are built once per run and
/// shared (not copied) with any embedded learner.
#[derive(Debug)]
pub struct GroundModel<G, T> {
    /// Ground rules instantiated from the rule set and the database.
    pub ground_rules: Arc<G>,
    /// Mapping from random variables to their observed training labels.
    pub training_map: Arc<T>,
}

impl<G, T> GroundModel<G, T> {
    pub fn new(ground_rules: Arc<G>, training_map: Arc<T>) -> Self {
        Self {
            ground_rules,
            training_map,
        }
    }
}

impl<G, T> Clone for GroundModel<G, T> {
    fn clone(&self) -> Self {
        Self {
            ground_rules: Arc::clone(&self.ground_rules),
            training_map: Arc::clone(&self.training_map),
        }
    }
}

/// Produces candidate weight vectors.
pub trait CandidateStrategy {
    /// Writes the next candidate into `weights`.
    ///
    /// Returns `Ok(false)` once every candidate has been produced.
    fn next_candidate(&mut self, weights: &mut [f64], random: &RandomService) -> Result<bool>;

    /// Total number of candidates (saturating).
    fn candidate_count(&self) -> usize;
}

/// Scores the model under the weights currently held by the rules.
///
/// Implemented for any `FnMut(&RuleSet<R>) -> Result<f64>`.
pub trait Evaluator<R> {
    fn evaluate(&mut self, rules: &RuleSet<R>) -> Result<f64>;
}

impl<R, F> Evaluator<R> for F
where
    F: FnMut(&RuleSet<R>) -> Result<f64>,
{
    fn evaluate(&mut self, rules: &RuleSet<R>) -> Result<f64> {
        self(rules)
    }
}

/// Scores one location of the weight space.
///
/// Implementations apply `weights` to `rules` and return the score. On
/// return, `weights` must hold the weights that were actually scored,
/// which may differ from the candidate if the inspector refines them.
pub trait LocationInspector<R: Rule> {
    fn inspect(&mut self, rules: &mut RuleSet<R>, weights: &mut [f64]) -> Result<f64>;

    /// Scores a location after an embedded learner has trained on it.
    ///
    /// `rules` and `weights` already agree; `training_loss` is the learner's
    /// final loss. The default ignores the loss and scores like
    /// [`inspect`](Self::inspect).
    fn inspect_trained(
        &mut self,
        rules: &mut RuleSet<R>,
        weights: &mut [f64],
        _training_loss: f64,
    ) -> Result<f64> {
        self.inspect(rules, weights)
    }

    /// Releases held resources. Called once by the search.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Hook run once the ground model for a search exists.
pub trait GroundModelHook<G, T> {
    fn post_init_ground_model(&mut self, _model: &GroundModel<G, T>) -> Result<()> {
        Ok(())
    }
}

/// An opaque weight-learning procedure used as a black-box scorer.
pub trait InnerLearner {
    type Rule: Rule;
    type GroundRules;
    type TrainingMap;

    /// Adopts an existing ground model instead of grounding its own.
    fn initialize_with_ground_model(
        &mut self,
        ground_rules: Arc<Self::GroundRules>,
        training_map: Arc<Self::TrainingMap>,
    ) -> Result<()>;

    /// Trains from the weights currently in `rules`, leaving the learned
    /// weights there. Returns the final loss.
    fn train_to_completion(&mut self, rules: &mut RuleSet<Self::Rule>) -> Result<f64>;

    fn release_resources(&mut self) -> Result<()>;
}
