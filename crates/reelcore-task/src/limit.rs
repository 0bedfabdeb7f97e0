use std::fmt;
use std::str::FromStr;

use crate::TaskError;

/// Inclusive upper bound for a prime count. Always within `0..=i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrimeLimit(u64);

impl PrimeLimit {
    pub const MAX: u64 = i64::MAX as u64;

    pub fn new(value: u64) -> Result<Self, TaskError> {
        if value > Self::MAX {
            return Err(TaskError::InvalidRequest(format!(
                "limit {value} exceeds {}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for PrimeLimit {
    type Error = TaskError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        PrimeLimit::new(value)
    }
}

impl TryFrom<i64> for PrimeLimit {
    type Error = TaskError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(PrimeLimit)
            .map_err(|_| TaskError::InvalidRequest(format!("limit {value} is negative")))
    }
}

impl TryFrom<f64> for PrimeLimit {
    type Error = TaskError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(TaskError::InvalidRequest(format!("limit {value} is not finite")));
        }
        if value.fract() != 0.0 {
            return Err(TaskError::InvalidRequest(format!("limit {value} is not an integer")));
        }
        if value < 0.0 {
            return Err(TaskError::InvalidRequest(format!("limit {value} is negative")));
        }
        // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
        if value >= Self::MAX as f64 {
            return Err(TaskError::InvalidRequest(format!("limit {value} is too large")));
        }
        Ok(PrimeLimit(value as u64))
    }
}

impl FromStr for PrimeLimit {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| TaskError::InvalidRequest(format!("{trimmed:?} is not an integer")))?;
        PrimeLimit::try_from(value)
    }
}

impl fmt::Display for PrimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
