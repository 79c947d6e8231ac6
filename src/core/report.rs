//! Final verdict from the scored tally.

use serde::Serialize;

use crate::conformance::Counters;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub exit_code: i32,
    pub summary: String,
}

/// Exit code is 1 if and only if something failed. Skips and an empty tally
/// do not change it.
pub fn finalize(counters: &Counters) -> Verdict {
    let exit_code = if counters.fail() > 0 { 1 } else { 0 };
    let summary = format!(
        "pass={} fail={} total={} skipped={}",
        counters.pass(),
        counters.fail(),
        counters.total(),
        counters.skipped()
    );

    Verdict { exit_code, summary }
}
