//! Artificial gap scenarios and time-of-day subsets

use crate::config::HALF_HOURS_PER_DAY;

/// Suffix of the columns holding real gaps filled from the `hhs` scenario
pub const REAL_SUFFIX: &str = "real";

/// Artificial gap scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Every half-hour in turn is set to an artificial gap
    Hhs,
    /// Every whole day in turn is set to an artificial gap
    Days,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::Hhs, Scenario::Days];

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Hhs => "hhs",
            Self::Days => "days",
        }
    }

    /// Column name of a technique filled under this scenario
    #[must_use]
    pub fn column_name(self, technique: &str) -> String {
        format!("{technique}_{}", self.suffix())
    }

    /// Technique name of a scenario column, `None` for other columns
    #[must_use]
    pub fn technique_of(self, column: &str) -> Option<&str> {
        column
            .strip_suffix(self.suffix())
            .and_then(|rest| rest.strip_suffix('_'))
            .filter(|name| !name.is_empty())
    }

    /// Whether position `other` is hidden when position `gap` is the artificial gap
    #[must_use]
    pub const fn drops(self, gap: usize, other: usize) -> bool {
        match self {
            Self::Hhs => gap == other,
            Self::Days => gap / HALF_HOURS_PER_DAY == other / HALF_HOURS_PER_DAY,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Subset of the day used for bootstrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Full,
    Day,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Full, TimeOfDay::Day, TimeOfDay::Night];

    /// Short form used in file names
    #[must_use]
    pub const fn short(self) -> &'static str {
        match self {
            Self::Full => "ft",
            Self::Day => "dt",
            Self::Night => "nt",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "full-time",
            Self::Day => "day-time",
            Self::Night => "night-time",
        }
    }
}
