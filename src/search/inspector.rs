//! Location inspectors: direct scoring and nested learning.

use std::sync::Arc;

use tracing::debug;

use super::rules::{Rule, RuleSet};
use super::types::{Evaluator, GroundModel, GroundModelHook, InnerLearner, LocationInspector};
use crate::error::{Error, Result};

/// Applies the candidate weights and scores them with an [`Evaluator`].
#[derive(Debug, Clone)]
pub struct DirectInspector<E> {
    evaluator: E,
}

impl<E> DirectInspector<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn into_evaluator(self) -> E {
        self.evaluator
    }
}

impl<R: Rule, E: Evaluator<R>> LocationInspector<R> for DirectInspector<E> {
    fn inspect(&mut self, rules: &mut RuleSet<R>, weights: &mut [f64]) -> Result<f64> {
        rules.apply_weights(weights)?;
        self.evaluator.evaluate(rules)
    }
}

impl<G, T, E> GroundModelHook<G, T> for DirectInspector<E> {}

/// Scores a location by the embedded learner's final training loss.
///
/// Only meaningful as the inner inspector of a [`NestedLearnerInspector`];
/// used on its own, [`inspect`](LocationInspector::inspect) has no loss to
/// report and fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearnerLoss;

impl<R: Rule> LocationInspector<R> for LearnerLoss {
    fn inspect(&mut self, _rules: &mut RuleSet<R>, _weights: &mut [f64]) -> Result<f64> {
        Err(Error::InvalidState(
            "learner loss is only available after nested training".into(),
        ))
    }

    fn inspect_trained(
        &mut self,
        _rules: &mut RuleSet<R>,
        _weights: &mut [f64],
        training_loss: f64,
    ) -> Result<f64> {
        Ok(training_loss)
    }
}

impl<G, T> GroundModelHook<G, T> for LearnerLoss {}

/// Runs an embedded learner at every location before scoring it.
///
/// The candidate weights become the learner's starting point; whatever
/// weights the learner leaves in the rules are copied back into the
/// candidate vector, so the search records the weights that were scored.
/// Scoring is then delegated to the wrapped inspector through
/// [`LocationInspector::inspect_trained`].
///
/// The ground model built for the search is handed to the learner once,
/// so both share a single grounding.
///
/// # Examples
///
/// ```ignore
/// let inspector = NestedLearnerInspector::new(my_learner, LearnerLoss);
/// let mut search = WeightSearch::new(rules, inspector, config, random)?;
/// search.initialize(&ground_model)?;
/// let result = search.run()?;
/// search.close()?;
/// ```
#[derive(Debug)]
pub struct NestedLearnerInspector<L, I> {
    learner: L,
    inner: I,
    last_training_loss: Option<f64>,
    trainings: usize,
    closed: bool,
}

impl<L: InnerLearner, I> NestedLearnerInspector<L, I> {
    pub fn new(learner: L, inner: I) -> Self {
        Self {
            learner,
            inner,
            last_training_loss: None,
            trainings: 0,
            closed: false,
        }
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// Loss reported by the most recent training.
    pub fn last_training_loss(&self) -> Option<f64> {
        self.last_training_loss
    }

    /// Number of completed trainings.
    pub fn trainings(&self) -> usize {
        self.trainings
    }
}

impl<L, I> LocationInspector<L::Rule> for NestedLearnerInspector<L, I>
where
    L: InnerLearner,
    I: LocationInspector<L::Rule>,
{
    fn inspect(&mut self, rules: &mut RuleSet<L::Rule>, weights: &mut [f64]) -> Result<f64> {
        if self.closed {
            return Err(Error::InvalidState("nested learner inspector is closed".into()));
        }

        rules.apply_weights(weights)?;
        let loss = self.learner.train_to_completion(rules)?;
        rules.read_weights(weights)?;

        self.trainings += 1;
        self.last_training_loss = Some(loss);
        debug!(loss, learned = ?weights, "embedded learner finished");

        self.inner.inspect_trained(rules, weights, loss)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // release the learner even if the inner inspector fails to close
        let inner = self.inner.close();
        let learner = self.learner.release_resources();
        inner.and(learner)
    }
}

impl<L, I> GroundModelHook<L::GroundRules, L::TrainingMap> for NestedLearnerInspector<L, I>
where
    L: InnerLearner,
    I: GroundModelHook<L::GroundRules, L::TrainingMap>,
{
    fn post_init_ground_model(
        &mut self,
        model: &GroundModel<L::GroundRules, L::TrainingMap>,
    ) -> Result<()> {
        self.learner.initialize_with_ground_model(
            Arc::clone(&model.ground_rules),
            Arc::clone(&model.training_map),
        )?;
        self.inner.post_init_ground_model(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::WeightedRule;

    /// Moves every weight halfway towards `target` and reports the distance.
    #[derive(Debug, Default)]
    struct HalfwayLearner {
        target: f64,
        ground_rules: Option<Arc<Vec<u8>>>,
        released: usize,
    }

    impl InnerLearner for HalfwayLearner {
        type Rule = WeightedRule;
        type GroundRules = Vec<u8>;
        type TrainingMap = ();

        fn initialize_with_ground_model(
            &mut self,
            ground_rules: Arc<Vec<u8>>,
            _training_map: Arc<()>,
        ) -> Result<()> {
            self.ground_rules = Some(ground_rules);
            Ok(())
        }

        fn train_to_completion(&mut self, rules: &mut RuleSet<WeightedRule>) -> Result<f64> {
            let mut loss = 0.0;
            for i in 0..rules.mutable_count() {
                let w = rules.mutable_weight(i).unwrap_or_default();
                let learned = (w + self.target) / 2.0;
                rules.set_mutable_weight(i, learned)?;
                loss += (learned - self.target).abs();
            }
            Ok(loss)
        }

        fn release_resources(&mut self) -> Result<()> {
            self.released += 1;
            Ok(())
        }
    }

    fn rules() -> RuleSet<WeightedRule> {
        RuleSet::new(vec![WeightedRule::new("a", 0.0), WeightedRule::new("b", 0.0)])
    }

    #[test]
    fn test_direct_inspector_applies_then_evaluates() {
        let mut inspector = DirectInspector::new(|rules: &RuleSet<WeightedRule>| -> Result<f64> {
            Ok(rules.weights().iter().sum())
        });
        let mut rs = rules();
        let mut w = vec![1.0, 2.0];
        let score = inspector.inspect(&mut rs, &mut w).expect("evaluates");
        assert_eq!(score, 3.0);
        assert_eq!(rs.weights(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_nested_reads_back_learned_weights() {
        let learner = HalfwayLearner {
            target: 4.0,
            ..Default::default()
        };
        let evaluator = |rules: &RuleSet<WeightedRule>| -> Result<f64> { Ok(rules.weights()[0]) };
        let mut inspector = NestedLearnerInspector::new(learner, DirectInspector::new(evaluator));

        let mut rs = rules();
        let mut w = vec![0.0, 2.0];
        let score = inspector.inspect(&mut rs, &mut w).expect("trains");

        assert_eq!(w, vec![2.0, 3.0]);
        assert_eq!(rs.weights(), w);
        assert_eq!(score, 2.0);
        assert_eq!(inspector.last_training_loss(), Some(3.0));
        assert_eq!(inspector.trainings(), 1);
    }

    #[test]
    fn test_learner_loss_scoring() {
        let learner = HalfwayLearner {
            target: 1.0,
            ..Default::default()
        };
        let mut inspector = NestedLearnerInspector::new(learner, LearnerLoss);
        let mut rs = rules();
        let mut w = vec![0.0, 0.0];
        assert_eq!(inspector.inspect(&mut rs, &mut w).expect("trains"), 1.0);
    }

    #[test]
    fn test_learner_loss_alone_fails() {
        let mut rs = rules();
        let mut w = vec![0.0, 0.0];
        assert!(LocationInspector::<WeightedRule>::inspect(&mut LearnerLoss, &mut rs, &mut w).is_err());
    }

    #[test]
    fn test_post_init_shares_ground_model() {
        let mut inspector = NestedLearnerInspector::new(HalfwayLearner::default(), LearnerLoss);
        let model = GroundModel::new(Arc::new(vec![1u8, 2, 3]), Arc::new(()));
        inspector.post_init_ground_model(&model).expect("initializes");

        let shared = inspector.learner().ground_rules.as_ref().expect("initialized");
        assert!(Arc::ptr_eq(shared, &model.ground_rules));
    }

    #[test]
    fn test_close_releases_learner_once() {
        let mut inspector = NestedLearnerInspector::new(HalfwayLearner::default(), LearnerLoss);
        LocationInspector::close(&mut inspector).expect("closes");
        LocationInspector::close(&mut inspector).expect("idempotent");
        assert_eq!(inspector.learner().released, 1);

        let mut rs = rules();
        let mut w = vec![0.0, 0.0];
        assert!(inspector.inspect(&mut rs, &mut w).is_err());
    }
}
