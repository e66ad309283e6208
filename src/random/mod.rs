//! Deterministic random service.
//!
//! The canonical source of randomness for every search and initialization
//! routine in this crate. A [`RandomService`] is seeded lazily from its
//! [`RandomConfig`] on the first draw, or explicitly through
//! [`RandomService::seed`], and serializes every call behind a mutex so
//! individual draws are atomic.
//!
//! Reproducibility requires an identical sequence of calls, not only an
//! identical seed. Code that needs independent per-thread streams should
//! derive them with [`RandomService::fork_rng`].

mod config;
mod service;

pub use config::RandomConfig;
pub use service::RandomService;
