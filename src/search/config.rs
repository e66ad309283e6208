//! Weight search configuration.

use crate::error::{Error, Result};

/// Interval a rule weight is searched over.
///
/// Random search draws from `[min, max)`; grid search places points on
/// `[min, max]` including both ends. `min == max` pins the weight.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

impl WeightRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A range holding the single weight `value`.
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn validate(&self) -> Result<()> {
        self.problem().map_or(Ok(()), |msg| Err(Error::Config(msg)))
    }

    fn problem(&self) -> Option<String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Some(format!(
                "weight range bounds must be finite, got [{}, {})",
                self.min, self.max
            ));
        }
        if self.min > self.max {
            return Some(format!(
                "weight range min ({}) exceeds max ({})",
                self.min, self.max
            ));
        }
        if !(self.max - self.min).is_finite() {
            return Some(format!("weight range [{}, {}) is too wide", self.min, self.max));
        }
        None
    }

    /// `resolution` evenly spaced points from `min` to `max` inclusive.
    ///
    /// A degenerate range or a resolution of 1 yields just `min`. Points are
    /// strictly increasing.
    pub fn grid_points(&self, resolution: usize) -> Vec<f64> {
        if self.is_degenerate() || resolution <= 1 {
            return vec![self.min];
        }
        let last = resolution - 1;
        let step = (self.max - self.min) / last as f64;
        let mut points: Vec<f64> = (0..resolution)
            .map(|k| {
                if k == last {
                    self.max
                } else {
                    self.min + k as f64 * step
                }
            })
            .collect();
        // ranges narrower than the float spacing collapse neighbouring points
        points.dedup();
        points
    }
}

impl Default for WeightRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// How candidate weight vectors are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchMode {
    /// Every point of the Cartesian grid, `resolution` points per rule.
    Grid { resolution: usize },
    /// `trials` vectors with components drawn uniformly per rule.
    Random { trials: usize },
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Random { trials: 250 }
    }
}

/// Whether lower or higher scores are better. Fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchDirection {
    #[default]
    Minimize,
    Maximize,
}

impl SearchDirection {
    /// Whether `candidate` is strictly better than `incumbent`.
    pub fn is_improvement(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            SearchDirection::Minimize => candidate < incumbent,
            SearchDirection::Maximize => candidate > incumbent,
        }
    }
}

/// Configuration for [`WeightSearch`](super::WeightSearch).
///
/// # Examples
///
/// ```
/// use u_weightsearch::search::{SearchConfig, SearchDirection, SearchMode, WeightRange};
///
/// let config = SearchConfig::default()
///     .with_mode(SearchMode::Grid { resolution: 3 })
///     .with_default_range(WeightRange::new(0.0, 10.0))
///     .with_direction(SearchDirection::Maximize);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// Grid or random candidate production.
    pub mode: SearchMode,

    /// Range used for every mutable rule without an entry in `ranges`.
    pub default_range: WeightRange,

    /// Per-rule ranges, index-aligned with the mutable rules.
    /// Empty = `default_range` everywhere.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ranges: Vec<WeightRange>,

    /// Score comparison direction.
    pub direction: SearchDirection,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            default_range: WeightRange::default(),
            ranges: Vec::new(),
            direction: SearchDirection::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_range(mut self, range: WeightRange) -> Self {
        self.default_range = range;
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<WeightRange>) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Validates everything that does not depend on the rule set.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            SearchMode::Grid { resolution: 0 } => {
                return Err(Error::Config("grid resolution must be positive".into()));
            }
            SearchMode::Random { trials: 0 } => {
                return Err(Error::Config("random search needs at least one trial".into()));
            }
            _ => {}
        }
        self.default_range.validate()?;
        for (i, range) in self.ranges.iter().enumerate() {
            if let Some(msg) = range.problem() {
                return Err(Error::Config(format!("mutable rule {i}: {msg}")));
            }
        }
        Ok(())
    }

    /// Validates against a rule set with `mutable_count` mutable rules.
    pub fn validate_for(&self, mutable_count: usize) -> Result<()> {
        self.validate()?;
        if !self.ranges.is_empty() && self.ranges.len() != mutable_count {
            return Err(Error::Config(format!(
                "{} per-rule ranges given for {mutable_count} mutable rules",
                self.ranges.len()
            )));
        }
        Ok(())
    }

    /// Search range of the `position`-th mutable rule.
    pub fn range_for(&self, position: usize) -> WeightRange {
        self.ranges
            .get(position)
            .copied()
            .unwrap_or(self.default_range)
    }

    /// Ranges for `mutable_count` mutable rules.
    pub fn resolved_ranges(&self, mutable_count: usize) -> Vec<WeightRange> {
        (0..mutable_count).map(|i| self.range_for(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.mode, SearchMode::Random { trials: 250 });
        assert_eq!(config.direction, SearchDirection::Minimize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_mode() {
        assert!(SearchConfig::default()
            .with_mode(SearchMode::Grid { resolution: 0 })
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_mode(SearchMode::Random { trials: 0 })
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_inverted_range() {
        let config = SearchConfig::default().with_ranges(vec![WeightRange::new(2.0, 1.0)]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_non_finite_range() {
        let config = SearchConfig::default().with_default_range(WeightRange::new(0.0, f64::INFINITY));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_range_is_valid() {
        let config = SearchConfig::default().with_default_range(WeightRange::fixed(0.5));
        assert!(config.validate().is_ok());
        assert_eq!(WeightRange::fixed(0.5).grid_points(4), vec![0.5]);
    }

    #[test]
    fn test_validate_for_range_count() {
        let config = SearchConfig::default()
            .with_ranges(vec![WeightRange::default(), WeightRange::new(0.0, 2.0)]);
        assert!(config.validate_for(2).is_ok());
        assert!(config.validate_for(3).is_err());
        assert!(SearchConfig::default().validate_for(7).is_ok());
    }

    #[test]
    fn test_range_for_falls_back_to_default() {
        let config = SearchConfig::default().with_default_range(WeightRange::new(1.0, 3.0));
        assert_eq!(config.range_for(4), WeightRange::new(1.0, 3.0));
    }

    #[test]
    fn test_grid_points_include_endpoints() {
        assert_eq!(WeightRange::new(0.0, 2.0).grid_points(2), vec![0.0, 2.0]);
        assert_eq!(WeightRange::new(0.0, 1.0).grid_points(5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(WeightRange::new(3.0, 4.0).grid_points(1), vec![3.0]);
    }

    #[test]
    fn test_direction() {
        assert!(SearchDirection::Minimize.is_improvement(1.0, 2.0));
        assert!(!SearchDirection::Minimize.is_improvement(2.0, 2.0));
        assert!(SearchDirection::Maximize.is_improvement(3.0, 2.0));
        assert!(!SearchDirection::Maximize.is_improvement(2.0, 2.0));
    }
}
