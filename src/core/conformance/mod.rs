//! API conformance suite run against the live deployment.

pub mod auth;
pub mod context;
pub mod counters;
pub mod runner;
pub mod suite;

pub use auth::{AuthSession, Identity, LoginMethod, MIN_TOKEN_LENGTH};
pub use context::DiscoveredContext;
pub use counters::Counters;
pub use runner::{CaseOutcome, CaseResult, ConformanceReport, Runner};
pub use suite::{default_suite, load_suite, AuthRequirement, Expectation, TestCase};
