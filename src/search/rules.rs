//! Rules and the weight vector they are searched through.

use crate::error::{Error, Result};

/// A rule with a scalar weight.
///
/// Grounding and evaluation live elsewhere; the search only reads and
/// writes weights and asks whether a weight is open to learning.
pub trait Rule {
    fn weight(&self) -> f64;

    fn set_weight(&mut self, weight: f64);

    /// Whether the weight takes part in learning/search. Fixed-weight rules
    /// are left untouched.
    fn is_weight_mutable(&self) -> bool;
}

/// A named rule value, for callers without their own rule type.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRule {
    pub name: String,
    weight: f64,
    mutable: bool,
}

impl WeightedRule {
    /// A rule whose weight is searched.
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            mutable: true,
        }
    }

    /// A rule whose weight never changes.
    pub fn fixed(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            mutable: false,
        }
    }
}

impl Rule for WeightedRule {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn is_weight_mutable(&self) -> bool {
        self.mutable
    }
}

/// Ordered rules plus the positions of the mutable ones.
///
/// A weight vector is index-aligned with [`RuleSet::mutable_indices`]:
/// component `i` always belongs to the `i`-th mutable rule.
/// [`apply_weights`](RuleSet::apply_weights) and
/// [`read_weights`](RuleSet::read_weights) are the only transfers between
/// vectors and rules.
///
/// # Examples
///
/// ```
/// use u_weightsearch::search::{RuleSet, WeightedRule};
///
/// let mut rules = RuleSet::new(vec![
///     WeightedRule::new("a", 1.0),
///     WeightedRule::fixed("b", 5.0),
///     WeightedRule::new("c", 1.0),
/// ]);
/// assert_eq!(rules.mutable_count(), 2);
///
/// rules.apply_weights(&[0.5, 2.0]).unwrap();
/// assert_eq!(rules.weights(), vec![0.5, 2.0]);
/// ```
#[derive(Debug, Clone)]
pub struct RuleSet<R> {
    rules: Vec<R>,
    mutable: Vec<usize>,
}

impl<R: Rule> RuleSet<R> {
    pub fn new(rules: Vec<R>) -> Self {
        let mutable = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_weight_mutable())
            .map(|(i, _)| i)
            .collect();
        Self { rules, mutable }
    }

    /// Number of rules whose weight is searched (the weight-vector length).
    pub fn mutable_count(&self) -> usize {
        self.mutable.len()
    }

    /// Positions of the mutable rules within [`rules`](Self::rules).
    pub fn mutable_indices(&self) -> &[usize] {
        &self.mutable
    }

    pub fn rules(&self) -> &[R] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn into_inner(self) -> Vec<R> {
        self.rules
    }

    /// Mutable rules in weight-vector order.
    pub fn mutable_rules(&self) -> impl Iterator<Item = &R> + '_ {
        self.mutable.iter().map(move |&i| &self.rules[i])
    }

    /// Writes `weights` into the mutable rules.
    pub fn apply_weights(&mut self, weights: &[f64]) -> Result<()> {
        self.check_len(weights.len())?;
        for (&i, &w) in self.mutable.iter().zip(weights) {
            self.rules[i].set_weight(w);
        }
        Ok(())
    }

    /// Reads the mutable rules' current weights into `weights`.
    pub fn read_weights(&self, weights: &mut [f64]) -> Result<()> {
        self.check_len(weights.len())?;
        for (&i, w) in self.mutable.iter().zip(weights.iter_mut()) {
            *w = self.rules[i].weight();
        }
        Ok(())
    }

    /// Current weights of the mutable rules.
    pub fn weights(&self) -> Vec<f64> {
        self.mutable_rules().map(Rule::weight).collect()
    }

    /// Weight of the `position`-th mutable rule.
    pub fn mutable_weight(&self, position: usize) -> Option<f64> {
        self.mutable.get(position).map(|&i| self.rules[i].weight())
    }

    /// Sets the weight of the `position`-th mutable rule.
    pub fn set_mutable_weight(&mut self, position: usize, weight: f64) -> Result<()> {
        let &i = self.mutable.get(position).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "mutable rule {position} out of range ({} mutable rules)",
                self.mutable.len()
            ))
        })?;
        self.rules[i].set_weight(weight);
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.mutable.len() {
            return Err(Error::InvalidArgument(format!(
                "weight vector has {len} components but there are {} mutable rules",
                self.mutable.len()
            )));
        }
        Ok(())
    }
}
