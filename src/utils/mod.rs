//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Local process execution
//! - `redact` - Secret masking for log output
//! - `retry` - Fixed-backoff retry combinator
//! - `shell` - Shell escaping and quoting
//! - `template` - `{{name}}` placeholder rendering

pub mod command;
pub mod redact;
pub mod retry;
pub mod shell;
pub mod template;
