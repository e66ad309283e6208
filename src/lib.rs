//! Rule-weight search and constraint blocking for statistical relational
//! learning.
//!
//! Provides the search and inference-preparation core of a weighted-rule
//! learning engine:
//!
//! - **Weight search**: grid or random exploration of rule weights, with an
//!   optional embedded weight learner run at every location (nested,
//!   bilevel learning). Keeps the best configuration and writes it back
//!   into the rules.
//! - **Constraint blocking**: partitions boolean random variables into
//!   exactly-one / at-most-one blocks with O(1) variable→block lookup and
//!   randomized feasible initialization, for block-aware inference.
//! - **Random service**: one seeded, lazily initialized, thread-safe PRNG
//!   shared by handle, so experiments are reproducible.
//!
//! # Architecture
//!
//! Grounding, databases, gradient computation and final inference are
//! consumer concerns. This crate sees rules only through the [`search::Rule`]
//! trait and treats ground models, training maps and learners as opaque
//! collaborators.
//!
//! # Logging
//!
//! Progress is reported through `tracing`; install a subscriber to see it.

pub mod blocker;
pub mod error;
pub mod random;
pub mod search;

pub use error::{Error, Result};
