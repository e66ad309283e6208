//! Rule weight search.
//!
//! Explores the weight space of a rule set by producing candidate weight
//! vectors (exhaustive grid or uniform random), scoring each one, and
//! keeping the best. Scoring is pluggable:
//!
//! - [`DirectInspector`] applies the candidate and calls an [`Evaluator`]
//! - [`NestedLearnerInspector`] first runs an embedded [`InnerLearner`]
//!   from the candidate, records the learned weights, then scores them
//!   (by the wrapped inspector, or by the training loss via [`LearnerLoss`])
//!
//! The nested form is a bilevel search: a cheap outer search picks starting
//! points for an expensive inner learner, using the inner result as fitness.
//!
//! # Key Components
//!
//! - [`WeightSearch`]: lifecycle and search loop
//! - [`SearchConfig`]: mode, ranges, direction
//! - [`RuleSet`] / [`Rule`]: the rules whose mutable weights are searched
//! - [`CandidateStrategy`]: [`GridCandidates`], [`RandomCandidates`]

mod config;
mod inspector;
mod rules;
mod runner;
mod strategy;
mod types;

pub use config::{SearchConfig, SearchDirection, SearchMode, WeightRange};
pub use inspector::{DirectInspector, LearnerLoss, NestedLearnerInspector};
pub use rules::{Rule, RuleSet, WeightedRule};
pub use runner::{SearchPhase, SearchResult, WeightSearch};
pub use strategy::{ConfiguredCandidates, GridCandidates, RandomCandidates};
pub use types::{
    CandidateStrategy, Evaluator, GroundModel, GroundModelHook, InnerLearner, LocationInspector,
};
