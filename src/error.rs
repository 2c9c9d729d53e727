use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("arrival rate must be > 0 (got {0})")]
    InvalidArrivalRate(f64),
    #[error("service rate must be > 0 (got {0})")]
    InvalidServiceRate(f64),
    #[error("server count must be at least 1 (got {0})")]
    InvalidServerCount(u32),
    #[error("horizon must be > 0 hours (got {0})")]
    InvalidHorizon(f64),
    #[error("staff names must not be empty")]
    EmptyStaffName,
    #[error("duplicate staff name '{0}'")]
    DuplicateStaffName(String),
    #[error("cost must be >= 0 for '{name}' (got {cost})")]
    InvalidStaffCost { name: String, cost: f64 },
    #[error("max_hours must be in (0, 168] for '{name}' (got {max_hours})")]
    InvalidMaxHours { name: String, max_hours: f64 },
    #[error("'{staff}' is available for unknown shift '{shift}'")]
    UnknownShift { staff: String, shift: String },
    #[error("shift '{0}' does not match any day_period combination")]
    MalformedShift(String),
    #[error("duplicate calendar entry '{0}' in days or periods")]
    DuplicateCalendarEntry(String),
    #[error("shift id '{0}' is produced by more than one day_period combination")]
    AmbiguousShift(String),
    #[error("shift duration must be > 0 hours for '{shift}' (got {hours})")]
    InvalidShiftDuration { shift: String, hours: f64 },
    #[error("no staff are eligible for {} shift(s): {}", .0.len(), .0.join(", "))]
    NoEligibleStaff(Vec<String>),
    #[error("solver reported cost {reported:.2} but the roster costs {recomputed:.2}")]
    SolutionMismatch { reported: f64, recomputed: f64 },
    #[error("solved roster violates {} constraint(s)", .0.len())]
    RosterViolations(Vec<String>),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Export(String),
    #[error("{0}")]
    Cli(String),
}

/// Coarse classification of [`Error`] for callers that render failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidParameter,
    Configuration,
    Io,
    Cli,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArrivalRate(_)
            | Error::InvalidServiceRate(_)
            | Error::InvalidServerCount(_)
            | Error::InvalidHorizon(_) => ErrorKind::InvalidParameter,
            Error::EmptyStaffName
            | Error::DuplicateStaffName(_)
            | Error::InvalidStaffCost { .. }
            | Error::InvalidMaxHours { .. }
            | Error::UnknownShift { .. }
            | Error::MalformedShift(_)
            | Error::DuplicateCalendarEntry(_)
            | Error::AmbiguousShift(_)
            | Error::InvalidShiftDuration { .. }
            | Error::NoEligibleStaff(_) => ErrorKind::Configuration,
            Error::SolutionMismatch { .. } | Error::RosterViolations(_) => ErrorKind::Internal,
            Error::ConfigIo(_)
            | Error::ConfigParse(_)
            | Error::UnsupportedConfigFormat(_)
            | Error::Export(_) => ErrorKind::Io,
            Error::Cli(_) => ErrorKind::Cli,
        }
    }

    pub fn details(&self) -> &[String] {
        match self {
            Error::NoEligibleStaff(shifts) => shifts,
            Error::RosterViolations(violations) => violations,
            _ => &[],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::InvalidParameter => "invalid-parameter",
            ErrorKind::Configuration => "configuration-error",
            ErrorKind::Io => "io-error",
            ErrorKind::Cli => "cli-error",
            ErrorKind::Internal => "internal-error",
        };
        f.write_str(label)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
