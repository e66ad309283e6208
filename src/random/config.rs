//! Random service configuration.

/// Configuration for the shared [`RandomService`](super::RandomService).
///
/// # Examples
///
/// ```
/// use u_weightsearch::random::RandomConfig;
///
/// let config = RandomConfig::default().with_seed(42);
/// assert_eq!(config.seed, 42);
/// assert_eq!(RandomConfig::default().seed, RandomConfig::SEED_DEFAULT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RandomConfig {
    /// Seed used the first time a random value is requested.
    pub seed: u64,
}

impl RandomConfig {
    /// Configuration key under which the seed is conventionally stored.
    pub const SEED_KEY: &'static str = "random.seed";

    /// Seed used when none is configured.
    pub const SEED_DEFAULT: u64 = 4;

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            seed: Self::SEED_DEFAULT,
        }
    }
}
