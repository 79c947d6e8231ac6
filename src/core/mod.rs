// Public modules
pub mod artifact;
pub mod builder;
pub mod config;
pub mod conformance;
pub mod deploy;
pub mod error;
pub mod health;
pub mod http;
pub mod image;
pub mod release;
pub mod remote_config;
pub mod report;
pub mod ssh;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
