//! Constraint blocks and the term-store interface they are held behind.

use std::convert::Infallible;

use rand::Rng;

use crate::error::{Error, Result};

/// Cardinality constraint on the variables of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cardinality {
    /// Exactly one variable is true.
    ExactlyOne,
    /// At most one variable is true.
    AtMostOne,
}

impl Cardinality {
    /// Maps the flag used by block builders (`true` = exactly-one).
    pub fn from_exactly_one(exactly_one: bool) -> Self {
        if exactly_one {
            Cardinality::ExactlyOne
        } else {
            Cardinality::AtMostOne
        }
    }

    /// Number of feasible assignments over `n` variables.
    pub fn feasible_assignments(self, n: usize) -> usize {
        match self {
            Cardinality::ExactlyOne => n,
            Cardinality::AtMostOne => n + 1,
        }
    }
}

/// A group of mutually exclusive boolean variables plus the weighted
/// ground rules incident on them.
///
/// The assignment is stored as the index of the single true variable
/// (`None` = all false), so no assignment can ever put two variables at
/// true. An exactly-one block holding `None` is infeasible; see
/// [`ConstraintBlock::is_feasible`].
///
/// Membership is fixed at construction; only the assignment changes.
#[derive(Debug, Clone)]
pub struct ConstraintBlock<V, R> {
    variables: Vec<V>,
    incident_rules: Vec<R>,
    cardinality: Cardinality,
    active: Option<usize>,
}

impl<V, R> ConstraintBlock<V, R> {
    /// Creates a block with every variable false.
    pub fn new(variables: Vec<V>, incident_rules: Vec<R>, cardinality: Cardinality) -> Self {
        Self {
            variables,
            incident_rules,
            cardinality,
            active: None,
        }
    }

    pub fn variables(&self) -> &[V] {
        &self.variables
    }

    /// Weighted ground rules whose satisfaction depends on this block.
    pub fn incident_rules(&self) -> &[R] {
        &self.incident_rules
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_exactly_one(&self) -> bool {
        self.cardinality == Cardinality::ExactlyOne
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Position of the true variable, if any.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// The true variable, if any.
    pub fn active_variable(&self) -> Option<&V> {
        self.active.map(|i| &self.variables[i])
    }

    /// Truth value of the variable at `position`.
    pub fn value(&self, position: usize) -> bool {
        self.active == Some(position)
    }

    /// Number of true variables (0 or 1).
    pub fn true_count(&self) -> usize {
        usize::from(self.active.is_some())
    }

    /// Whether the current assignment satisfies the block's cardinality.
    pub fn is_feasible(&self) -> bool {
        match self.cardinality {
            Cardinality::ExactlyOne => self.active.is_some(),
            Cardinality::AtMostOne => true,
        }
    }

    /// Sets the true variable (`None` = all false).
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `position` is out of range, or if
    /// `None` is requested on an exactly-one block.
    pub fn set_active(&mut self, position: Option<usize>) -> Result<()> {
        match position {
            Some(p) if p >= self.variables.len() => Err(Error::InvalidArgument(format!(
                "position {p} out of range for block of {} variables",
                self.variables.len()
            ))),
            None if self.is_exactly_one() => Err(Error::InvalidArgument(
                "an exactly-one block needs a true variable".into(),
            )),
            _ => {
                self.active = position;
                Ok(())
            }
        }
    }

    /// Iterates `(variable, value)` pairs in block order.
    pub fn assignments(&self) -> impl Iterator<Item = (&V, bool)> + '_ {
        self.variables
            .iter()
            .enumerate()
            .map(move |(i, v)| (v, self.active == Some(i)))
    }

    /// Draws a uniformly random feasible assignment.
    ///
    /// Exactly-one picks one of `n` variables; at-most-one picks one of
    /// `n + 1` outcomes where the last outcome is "all false".
    pub fn randomly_initialize(&mut self, rng: &mut impl Rng) {
        let picked = self.initialize_with(|outcomes| {
            Ok::<_, Infallible>(rng.random_range(0..outcomes))
        });
        match picked {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Sets the assignment from `pick(outcomes)`, an index in `0..outcomes`
    /// over the feasible assignments. `pick` is not called when there are
    /// none.
    pub(crate) fn initialize_with<E>(
        &mut self,
        pick: impl FnOnce(usize) -> std::result::Result<usize, E>,
    ) -> std::result::Result<(), E> {
        let outcomes = self.cardinality.feasible_assignments(self.variables.len());
        self.active = if outcomes > 0 {
            let choice = pick(outcomes)?;
            (choice < self.variables.len()).then_some(choice)
        } else {
            None
        };
        Ok(())
    }
}

/// A store of inference terms built from ground rules.
///
/// This is the narrow slice of the term-store family that block-aware
/// inference depends on. Stores that cannot support an operation
/// report [`Error::UnsupportedOperation`] rather than degrading silently.
pub trait TermStore {
    /// The term type held by the store.
    type Term;
    /// Ground rule type that terms are generated from.
    type GroundRule;
    /// Weighted ground rule type.
    type WeightedRule;

    /// Adds one term generated from `rule`.
    fn add(&mut self, rule: Self::GroundRule, term: Self::Term) -> Result<()>;

    /// Removes every term; the store remains usable.
    fn clear(&mut self);

    /// Releases the store; further use fails.
    fn close(&mut self);

    /// Term at `index`.
    fn get(&self, index: usize) -> Result<&Self::Term>;

    /// Number of terms.
    fn size(&self) -> usize;

    /// Notifies the store that `rule`'s weight changed.
    fn update_weight(&mut self, rule: &Self::WeightedRule);

    /// Indices of the terms generated from `rule`.
    fn term_indices(&self, rule: &Self::WeightedRule) -> Result<Vec<usize>>;
}
