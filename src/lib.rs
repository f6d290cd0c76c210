//! Multi-provider football data aggregation.
//!
//! Two upstream sports APIs with incompatible schemas are wrapped behind one
//! [`providers::FixtureProvider`] trait. The [`aggregator::Aggregator`] tries
//! them in order, guarded by a per-provider circuit breaker, and returns the
//! first acceptable result together with the provider it came from.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod server;

pub use aggregator::{Aggregated, Aggregator, EmptyPolicy, HealthTracker, Operation, Source};
pub use error::{ErrorKind, ProviderError};
pub use identity::{IdentityResolver, NameMatcher, Resolution};
pub use models::{CanonicalFixture, FixtureStatus, ProviderTag, RawProviderRecord};
pub use providers::FixtureProvider;
