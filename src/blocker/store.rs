//! Block-constrained term store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, info};

use super::types::{Cardinality, ConstraintBlock, TermStore};
use crate::error::{Error, Result};
use crate::random::RandomService;

/// Holds the constraint blocks of one ground model and indexes every
/// blocked variable to its block.
///
/// Blocks are populated only by [`ConstraintBlockStore::build`], which takes
/// all blocks at once. Incremental insertion through [`TermStore::add`] is
/// rejected.
///
/// # Type Parameters
///
/// * `V` - Variable identity (used as the index key)
/// * `R` - Weighted ground rule incident on a block
/// * `G` - Ground-rule store handle, kept opaque
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use u_weightsearch::blocker::ConstraintBlockStore;
///
/// let mut store: ConstraintBlockStore<&str, u32, ()> = ConstraintBlockStore::new();
/// store
///     .build(
///         Arc::new(()),
///         vec![vec!["A", "B", "C"], vec!["D", "E"]],
///         vec![vec![0, 1], vec![2]],
///         vec![true, false],
///     )
///     .unwrap();
///
/// assert_eq!(store.size(), 2);
/// assert_eq!(store.block_index(&"C").unwrap(), Some(0));
/// assert_eq!(store.block_index(&"F").unwrap(), None);
/// ```
#[derive(Debug)]
pub struct ConstraintBlockStore<V, R, G> {
    blocks: Vec<ConstraintBlock<V, R>>,
    index: HashMap<V, usize>,
    ground_rules: Option<Arc<G>>,
    closed: bool,
}

impl<V, R, G> Default for ConstraintBlockStore<V, R, G> {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            index: HashMap::new(),
            ground_rules: None,
            closed: false,
        }
    }
}

impl<V, R, G> ConstraintBlockStore<V, R, G>
where
    V: Eq + Hash + Clone,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every block in one batch and indexes their variables.
    ///
    /// `variable_groups`, `incident_rules` and `exactly_one` are parallel:
    /// entry `i` of each describes block `i`. Any blocks already held are
    /// replaced. Nothing is modified unless the whole input is valid.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the sequences differ in length, a variable
    /// appears more than once across all groups, or an exactly-one group is
    /// empty. [`Error::InvalidState`] if the store was closed.
    pub fn build(
        &mut self,
        ground_rules: Arc<G>,
        variable_groups: Vec<Vec<V>>,
        incident_rules: Vec<Vec<R>>,
        exactly_one: Vec<bool>,
    ) -> Result<()> {
        self.ensure_open()?;

        if variable_groups.len() != incident_rules.len()
            || variable_groups.len() != exactly_one.len()
        {
            return Err(Error::Config(format!(
                "block inputs differ in length: {} variable groups, {} incident rule groups, {} exactly-one flags",
                variable_groups.len(),
                incident_rules.len(),
                exactly_one.len()
            )));
        }

        let total: usize = variable_groups.iter().map(Vec::len).sum();
        let mut index = HashMap::with_capacity(total);
        for (block_index, (group, &one)) in variable_groups.iter().zip(&exactly_one).enumerate() {
            if one && group.is_empty() {
                return Err(Error::Config(format!(
                    "exactly-one block {block_index} has no variables"
                )));
            }
            for variable in group {
                if let Some(previous) = index.insert(variable.clone(), block_index) {
                    return Err(Error::Config(format!(
                        "variable appears in block {previous} and block {block_index}"
                    )));
                }
            }
        }

        if !self.blocks.is_empty() {
            debug!(previous = self.blocks.len(), "replacing existing blocks");
        }

        self.blocks = variable_groups
            .into_iter()
            .zip(incident_rules)
            .zip(exactly_one)
            .map(|((variables, rules), one)| {
                ConstraintBlock::new(variables, rules, Cardinality::from_exactly_one(one))
            })
            .collect();
        self.index = index;
        self.ground_rules = Some(ground_rules);

        info!(
            blocks = self.blocks.len(),
            variables = self.index.len(),
            "built constraint blocks"
        );
        Ok(())
    }

    /// Index of the block owning `variable`, or `None` if it is not
    /// block-constrained.
    pub fn block_index(&self, variable: &V) -> Result<Option<usize>> {
        self.ensure_open()?;
        Ok(self.index.get(variable).copied())
    }

    /// The ground-rule store handle passed to the last [`build`](Self::build).
    ///
    /// Block-aware inference uses this to reach rules outside the blocks
    /// (e.g. to evaluate unblocked potentials). `None` before the first build
    /// and after [`clear`](TermStore::clear) or [`close`](TermStore::close).
    pub fn ground_rule_store(&self) -> Option<&Arc<G>> {
        self.ground_rules.as_ref()
    }

    /// Draws a uniformly random feasible assignment for every block from the
    /// shared stream, in build order.
    pub fn randomly_initialize_all(&mut self, random: &RandomService) -> Result<()> {
        self.ensure_open()?;
        for block in &mut self.blocks {
            block.initialize_with(|outcomes| -> Result<usize> {
                let bound = u32::try_from(outcomes).map_err(|_| {
                    Error::InvalidArgument(format!("block with {outcomes} outcomes is too large"))
                })?;
                Ok(random.next_u32_below(bound)? as usize)
            })?;
        }
        debug!(blocks = self.blocks.len(), "randomly initialized blocks");
        Ok(())
    }

    /// Parallel variant of [`randomly_initialize_all`](Self::randomly_initialize_all).
    ///
    /// One generator per block is forked from `random` sequentially before the
    /// parallel pass, so the result depends only on the seed.
    #[cfg(feature = "parallel")]
    pub fn randomly_initialize_all_parallel(&mut self, random: &RandomService) -> Result<()>
    where
        V: Send,
        R: Send,
    {
        use rayon::prelude::*;

        self.ensure_open()?;
        let mut rngs: Vec<_> = (0..self.blocks.len()).map(|_| random.fork_rng()).collect();
        self.blocks
            .par_iter_mut()
            .zip(rngs.par_iter_mut())
            .for_each(|(block, rng)| block.randomly_initialize(rng));
        Ok(())
    }

    /// Block at `index`, mutable (only the assignment can change).
    pub fn get_mut(&mut self, index: usize) -> Result<&mut ConstraintBlock<V, R>> {
        self.ensure_open()?;
        let len = self.blocks.len();
        self.blocks
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))
    }

    /// Number of blocks. A closed store reports 0.
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// True before a build and once cleared or closed.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Blocks in build order. Empty once the store is closed.
    pub fn iter(&self) -> std::slice::Iter<'_, ConstraintBlock<V, R>> {
        self.blocks.iter()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("constraint block store is closed".into()));
        }
        Ok(())
    }
}

impl<V, R, G> TermStore for ConstraintBlockStore<V, R, G>
where
    V: Eq + Hash + Clone,
{
    type Term = ConstraintBlock<V, R>;
    type GroundRule = R;
    type WeightedRule = R;

    fn add(&mut self, _rule: R, _term: ConstraintBlock<V, R>) -> Result<()> {
        Err(Error::UnsupportedOperation(
            "constraint blocks need all ground rules at once; use build()".into(),
        ))
    }

    fn clear(&mut self) {
        self.blocks.clear();
        self.index.clear();
        self.ground_rules = None;
    }

    fn close(&mut self) {
        self.clear();
        self.blocks.shrink_to_fit();
        self.index.shrink_to_fit();
        self.closed = true;
    }

    fn get(&self, index: usize) -> Result<&ConstraintBlock<V, R>> {
        self.ensure_open()?;
        self.blocks
            .get(index)
            .ok_or_else(|| out_of_range(index, self.blocks.len()))
    }

    fn size(&self) -> usize {
        self.blocks.len()
    }

    // Blocks depend only on membership, never on weights.
    fn update_weight(&mut self, _rule: &R) {}

    fn term_indices(&self, _rule: &R) -> Result<Vec<usize>> {
        Err(Error::UnsupportedOperation(
            "constraint blocks are not indexed by rule".into(),
        ))
    }
}

impl<'a, V, R, G> IntoIterator for &'a ConstraintBlockStore<V, R, G> {
    type Item = &'a ConstraintBlock<V, R>;
    type IntoIter = std::slice::Iter<'a, ConstraintBlock<V, R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::InvalidArgument(format!("block index {index} out of range ({len} blocks)"))
}
