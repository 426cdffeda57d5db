use std::fmt;

use crate::extract::pipeline::Outcome;

/// Outcome counts for one batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub extracted: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl Tally {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Extracted { .. } => self.extracted += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.extracted + self.skipped + self.failed
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Extracted: {}, Skipped/Failed: {}",
            self.extracted,
            self.skipped + self.failed
        )
    }
}
