//! Masking for secrets that must never reach logs in full.

/// Keep a short recognisable prefix and mask the rest.
///
/// Values of 8 characters or fewer are masked entirely.
pub fn redact(value: &str) -> String {
    let visible = 4;
    let len = value.chars().count();
    if len <= 8 {
        return "*".repeat(len.max(3));
    }
    let prefix: String = value.chars().take(visible).collect();
    format!("{}{}", prefix, "*".repeat(8))
}

/// Redact the value half of a `KEY=value` pair, leaving the key readable.
pub fn redact_assignment(pair: &str) -> String {
    match pair.split_once('=') {
        Some((key, value)) => format!("{}={}", key, redact(value)),
        None => pair.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_values_keep_prefix_only() {
        let out = redact("postgres://admin:hunter2@db:5432/app");
        assert_eq!(out, "post********");
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn short_values_are_fully_masked() {
        assert_eq!(redact("abc"), "***");
        assert_eq!(redact(""), "***");
        assert_eq!(redact("12345678"), "********");
    }

    #[test]
    fn assignment_keeps_key() {
        assert_eq!(
            redact_assignment("DATABASE_URL=postgres://x:y@z/db"),
            "DATABASE_URL=post********"
        );
        assert_eq!(redact_assignment("--load"), "--load");
    }
}
