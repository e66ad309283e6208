//! Constraint blocking.
//!
//! Partitions block-eligible boolean random variables into disjoint groups
//! constrained to exactly-one or at-most-one true variable, together with
//! the weighted ground rules incident on each group. Block-aware inference
//! can then resolve a whole group in one combinatorial step instead of
//! treating its variables independently.
//!
//! # Key Components
//!
//! - [`ConstraintBlock`]: one group, its incident rules and its assignment
//! - [`ConstraintBlockStore`]: batch construction, variable→block index,
//!   randomized feasible initialization
//! - [`TermStore`]: the store interface; incremental insertion and
//!   rule-indexed lookup are unsupported for blocks

mod store;
mod types;

pub use store::ConstraintBlockStore;
pub use types::{Cardinality, ConstraintBlock, TermStore};
