//! Reads one required value out of a `key=value` file on the remote host.

use crate::error::{Error, Result};
use crate::ssh::RemoteSession;
use crate::utils::redact::redact;
use crate::utils::shell;

/// Fetch `remote_path` and return the value of `key`.
///
/// A missing or empty value is `config.missing_key` and is never retried;
/// only the fetch itself goes through the session's connection retry.
pub fn resolve(session: &RemoteSession, remote_path: &str, key: &str) -> Result<String> {
    log_status!("config", "Reading {} from {}:{}", key, session.target(), remote_path);

    let content = session.run(&format!("cat {}", shell::quote_path(remote_path)))?;

    match parse_value(&content, key) {
        Some(value) => {
            log_status!("config", "Resolved {} ({})", key, redact(&value));
            Ok(value)
        }
        None => Err(Error::config_missing_key(key, Some(remote_path.to_string()))
            .with_hint(format!("Add {}=<value> to {} on the remote host", key, remote_path))),
    }
}

/// Value of the first `key` line; `None` if absent or empty.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// accepted, and surrounding whitespace and quote characters are stripped.
pub fn parse_value(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }

        let value = strip_quotes(value.trim());
        return if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }
    None
}

fn strip_quotes(value: &str) -> &str {
    value
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
}
