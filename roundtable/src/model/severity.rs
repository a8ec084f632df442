use serde::{Deserialize, Serialize};

/// Severity of a single reviewer-raised issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn is_high(self) -> bool {
        matches!(self, Severity::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Issue counts broken down by severity, used anywhere spec §3/§4.5
/// wants a `{high, medium, low}` summary instead of a flat list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

impl std::ops::AddAssign for SeverityCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.high += rhs.high;
        self.medium += rhs.medium;
        self.low += rhs.low;
    }
}

pub fn count_severities<I: IntoIterator<Item = Severity>>(severities: I) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for severity in severities {
        counts.add(severity);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_low_lt_medium_lt_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn is_high_only_for_high() {
        assert!(Severity::High.is_high());
        assert!(!Severity::Medium.is_high());
        assert!(!Severity::Low.is_high());
    }

    #[test]
    fn counts_tally_each_bucket() {
        let counts = count_severities([Severity::High, Severity::High, Severity::Medium, Severity::Low]);
        assert_eq!(counts, SeverityCounts { high: 2, medium: 1, low: 1 });
        assert_eq!(counts.total(), 4);
    }
}
