use serde::Serialize;

/// Scored probe tally. Only ever incremented; `pass + fail == total` holds
/// after every call. Skips are tracked beside the tally, never inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pass: u32,
    fail: u32,
    total: u32,
    skipped: u32,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self) {
        self.pass += 1;
        self.total += 1;
    }

    pub fn record_fail(&mut self) {
        self.fail += 1;
        self.total += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn fail(&self) -> u32 {
        self.fail
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn is_consistent(&self) -> bool {
        self.pass + self.fail == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_never_touch_the_scored_tally() {
        let mut c = Counters::new();
        c.record_pass();
        c.record_skip();
        c.record_fail();
        c.record_skip();

        assert_eq!((c.pass(), c.fail(), c.total(), c.skipped()), (1, 1, 2, 2));
        assert!(c.is_consistent());
    }

    #[test]
    fn empty_tally_is_consistent() {
        assert!(Counters::new().is_consistent());
        assert_eq!(Counters::new().total(), 0);
    }
}
