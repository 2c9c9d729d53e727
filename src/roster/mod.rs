mod analyzer;
mod branch_and_bound;
mod model;
mod validate;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

pub use analyzer::{analyze, InfeasibilityReport, Issue, IssueKind};
pub use branch_and_bound::BranchAndBound;
pub use model::{
    build, ConstraintKind, LinearConstraint, OptimizationProblem, Sense, StaffVar, Variable,
};
pub use validate::verify_roster;

pub trait RosterSolver {
    fn name(&self) -> &'static str;
    fn solve(&self, problem: &OptimizationProblem, options: &SolveOptions) -> SolveOutcome;
}

#[derive(Clone, Debug, Default)]
pub struct SolveOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SolveOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn deadline(&self, started: Instant) -> Option<Instant> {
        self.timeout.map(|timeout| started + timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Selected variable indices plus the objective value the solver computed.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub total_cost: f64,
    pub selected: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    Optimal(Solution),
    Infeasible,
    /// The search was stopped by the deadline or the cancel flag.
    Timeout { incumbent: Option<Solution> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StaffRoster {
    pub shifts: Vec<String>,
    pub hours: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Roster {
    pub total_cost: f64,
    pub assignments: BTreeMap<String, StaffRoster>,
}

impl Roster {
    /// Names of staff assigned to `shift`.
    pub fn staff_on(&self, shift: &str) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|(_, roster)| roster.shifts.iter().any(|entry| entry == shift))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub fn default_solver() -> Box<dyn RosterSolver + Send + Sync> {
    Box::new(BranchAndBound::default())
}
