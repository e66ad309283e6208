//! Mutex-guarded, lazily seeded PRNG.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use super::config::RandomConfig;
use crate::error::{Error, Result};

/// Generator state behind the lock.
#[derive(Debug)]
struct RngState {
    rng: ChaCha8Rng,
    /// Second value produced by the polar method, handed out on the next call.
    spare_gaussian: Option<f64>,
}

impl RngState {
    fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            spare_gaussian: None,
        }
    }
}

/// Shared source of randomness.
///
/// Pass it around as `Arc<RandomService>` (or `&RandomService`); all
/// methods take `&self`.
///
/// # Examples
///
/// ```
/// use u_weightsearch::random::{RandomConfig, RandomService};
///
/// let a = RandomService::new(RandomConfig::default().with_seed(7));
/// let b = RandomService::new(RandomConfig::default());
/// b.seed(7);
/// assert_eq!(a.next_i64(), b.next_i64());
/// ```
#[derive(Debug)]
pub struct RandomService {
    config: RandomConfig,
    state: Mutex<Option<RngState>>,
}

impl Default for RandomService {
    fn default() -> Self {
        Self::new(RandomConfig::default())
    }
}

impl RandomService {
    /// Creates an unseeded service; the generator is built on first use.
    pub fn new(config: RandomConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    /// The process-wide instance, created with the default configuration.
    pub fn shared() -> Arc<RandomService> {
        static SHARED: OnceLock<Arc<RandomService>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(RandomService::default())).clone()
    }

    /// The configuration used for lazy seeding.
    pub fn config(&self) -> &RandomConfig {
        &self.config
    }

    /// Whether the generator has been created yet.
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Builds the generator from the configured seed if it does not exist yet.
    pub fn ensure_initialized(&self) {
        self.with_state(|_| ());
    }

    /// Resets the stream so it is fully determined by `seed`.
    pub fn seed(&self, seed: u64) {
        trace!(seed, "reseeding random service");
        *self.lock() = Some(RngState::seeded(seed));
    }

    pub fn next_bool(&self) -> bool {
        self.with_rng(|rng| rng.random::<bool>())
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&self) -> f32 {
        self.with_rng(|rng| rng.random::<f32>())
    }

    /// Uniform in `[min, max)`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `min >= max` or a bound is not finite.
    pub fn next_f32_range(&self, min: f32, max: f32) -> Result<f32> {
        check_interval(min as f64, max as f64)?;
        if !(max - min).is_finite() {
            return Err(Error::InvalidArgument(format!(
                "interval [{min}, {max}) is too wide"
            )));
        }
        // rounding can land on `max`; redraw until strictly below it
        Ok(self.with_rng(|rng| loop {
            let x = rng.random::<f32>() * (max - min) + min;
            if x < max {
                break x;
            }
        }))
    }

    /// Uniform in `[min, max)`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `min >= max` or a bound is not finite.
    pub fn next_f64_range(&self, min: f64, max: f64) -> Result<f64> {
        check_interval(min, max)?;
        if !(max - min).is_finite() {
            return Err(Error::InvalidArgument(format!(
                "interval [{min}, {max}) is too wide"
            )));
        }
        Ok(self.with_rng(|rng| loop {
            let x = rng.random::<f64>() * (max - min) + min;
            if x < max {
                break x;
            }
        }))
    }

    /// Standard normal sample (Marsaglia polar method).
    pub fn next_gaussian(&self) -> f64 {
        self.with_state(|state| {
            if let Some(spare) = state.spare_gaussian.take() {
                return spare;
            }

            loop {
                let v1 = 2.0 * state.rng.random::<f64>() - 1.0;
                let v2 = 2.0 * state.rng.random::<f64>() - 1.0;
                let s = v1 * v1 + v2 * v2;
                if s > 0.0 && s < 1.0 {
                    let multiplier = (-2.0 * s.ln() / s).sqrt();
                    state.spare_gaussian = Some(v2 * multiplier);
                    return v1 * multiplier;
                }
            }
        })
    }

    /// Any `i32`.
    pub fn next_i32(&self) -> i32 {
        self.with_rng(|rng| rng.random::<i32>())
    }

    /// Uniform in `[0, bound)`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `bound` is zero.
    pub fn next_u32_below(&self, bound: u32) -> Result<u32> {
        if bound == 0 {
            return Err(Error::InvalidArgument("bound must be positive".into()));
        }
        Ok(self.with_rng(|rng| rng.random_range(0..bound)))
    }

    /// Any `i64`.
    pub fn next_i64(&self) -> i64 {
        self.with_rng(|rng| rng.random::<i64>())
    }

    /// Permutes `items` in place.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        self.with_rng(|rng| items.shuffle(rng));
    }

    /// Derives an independent generator seeded from the shared stream.
    ///
    /// Use this when work is spread over threads: fork sequentially, then hand
    /// each thread its own generator.
    pub fn fork_rng(&self) -> ChaCha8Rng {
        let seed = self.with_rng(|rng| rng.random::<u64>());
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        self.with_state(|state| draw(&mut state.rng))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RngState) -> T) -> T {
        let mut guard = self.lock();
        let seed = self.config.seed;
        let state = guard.get_or_insert_with(|| {
            trace!(seed, "lazily seeding random service");
            RngState::seeded(seed)
        });
        f(state)
    }

    fn lock(&self) -> MutexGuard<'_, Option<RngState>> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn check_interval(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(Error::InvalidArgument(format!(
            "min ({min}) must be finite and strictly less than max ({max})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn service(seed: u64) -> RandomService {
        RandomService::new(RandomConfig::default().with_seed(seed))
    }

    #[test]
    fn test_lazy_initialization() {
        let rs = service(1);
        assert!(!rs.is_initialized());
        let _ = rs.next_f64();
        assert!(rs.is_initialized());
    }

    #[test]
    fn test_lazy_seed_matches_explicit_seed() {
        let lazy = service(RandomConfig::SEED_DEFAULT);
        let explicit = service(999);
        explicit.seed(RandomConfig::SEED_DEFAULT);

        let a: Vec<i64> = (0..10).map(|_| lazy.next_i64()).collect();
        let b: Vec<i64> = (0..10).map(|_| explicit.next_i64()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reseed_after_draws_restarts_stream() {
        let rs = service(3);
        let first: Vec<f64> = (0..5).map(|_| rs.next_f64()).collect();
        rs.seed(3);
        let second: Vec<f64> = (0..5).map(|_| rs.next_f64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reseed_discards_gaussian_spare() {
        let rs = service(11);
        let g1 = rs.next_gaussian();
        rs.seed(11);
        let g2 = rs.next_gaussian();
        assert_eq!(g1, g2);
    }

    #[test]
    fn test_f32_range_rejects_empty_interval() {
        let rs = service(1);
        assert!(matches!(
            rs.next_f32_range(1.0, 1.0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(rs.next_f32_range(2.0, 1.0).is_err());
        assert!(rs.next_f32_range(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn test_u32_below_rejects_zero() {
        assert!(service(1).next_u32_below(0).is_err());
    }

    #[test]
    fn test_gaussian_moments() {
        let rs = service(5);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rs.next_gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn test_shuffle_is_permutation_and_deterministic() {
        let a = service(8);
        let b = service(8);
        let mut xs: Vec<u32> = (0..50).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);

        let mut sorted = xs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn test_fork_rng_is_deterministic() {
        let a = service(21);
        let b = service(21);
        let mut ra = a.fork_rng();
        let mut rb = b.fork_rng();
        assert_eq!(ra.random::<u64>(), rb.random::<u64>());
        // forking advances the shared stream identically
        assert_eq!(a.next_i32(), b.next_i32());
    }

    #[test]
    fn test_concurrent_draws_are_atomic() {
        let rs = Arc::new(service(2));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rs = Arc::clone(&rs);
                thread::spawn(move || (0..1000).map(|_| rs.next_i64()).collect::<Vec<_>>())
            })
            .collect();
        let mut concurrent: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("worker panicked"))
            .collect();

        // same multiset as one thread drawing 4000 values: none lost or repeated
        let single = service(2);
        let mut sequential: Vec<i64> = (0..4000).map(|_| single.next_i64()).collect();
        concurrent.sort_unstable();
        sequential.sort_unstable();
        assert_eq!(concurrent, sequential);
    }

    #[test]
    fn test_shared_instance_is_single() {
        assert!(Arc::ptr_eq(&RandomService::shared(), &RandomService::shared()));
    }

    proptest! {
        #[test]
        fn prop_f64_range_within_bounds(seed in any::<u64>(), min in -1e6f64..1e6, width in 1e-3f64..1e6) {
            let rs = service(seed);
            let max = min + width;
            for _ in 0..32 {
                let x = rs.next_f64_range(min, max).expect("valid range");
                prop_assert!(x >= min && x < max);
            }
        }

        #[test]
        fn prop_u32_below_within_bound(seed in any::<u64>(), bound in 1u32..10_000) {
            let rs = service(seed);
            for _ in 0..32 {
                prop_assert!(rs.next_u32_below(bound).expect("positive bound") < bound);
            }
        }
    }
}
