//! End-to-end operations that produce the serializable reports the CLI prints
//! and exports.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::classifier::{self, LittlesLawCheck, Severity};
use crate::engine;
use crate::error::{Error, Result};
use crate::models::{RosterConfig, SimulationParameters};
use crate::roster::{self, Issue, SolveOptions, SolveOutcome, StaffRoster};

const COST_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub parameters: SimulationParameters,
    pub patients_served: u64,
    pub avg_wait_time: f64,
    pub avg_queue_length: f64,
    pub utilization: f64,
    pub max_wait_time: f64,
    pub severity_tier: Severity,
    pub traffic_intensity: f64,
    pub effective_service_rate: f64,
    pub recommendations: Vec<String>,
    pub littles_law_check: LittlesLawCheck,
    pub status_message: String,
}

pub fn simulation_report(params: &SimulationParameters) -> Result<SimulationReport> {
    let result = engine::simulate(params)?;
    let assessment = classifier::classify(params, &result);
    log::info!(
        "simulated {} patients over {}h: utilization {:.1}%, {}",
        result.patients_served,
        params.horizon_hours,
        result.utilization * 100.0,
        assessment.severity
    );

    Ok(SimulationReport {
        parameters: params.clone(),
        patients_served: result.patients_served,
        avg_wait_time: result.avg_wait_time,
        avg_queue_length: result.avg_queue_length,
        utilization: result.utilization,
        max_wait_time: result.max_wait_time,
        severity_tier: assessment.severity,
        traffic_intensity: assessment.traffic_intensity,
        effective_service_rate: assessment.effective_service_rate,
        recommendations: assessment.recommendations,
        littles_law_check: assessment.littles_law_check,
        status_message: assessment.status_message,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OptimizeReport {
    Optimal {
        feasible: bool,
        total_cost: f64,
        assignments: BTreeMap<String, StaffRoster>,
    },
    Infeasible {
        feasible: bool,
        issues: Vec<Issue>,
        suggestions: Vec<String>,
    },
    Timeout {
        feasible: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        best_cost: Option<f64>,
    },
}

impl OptimizeReport {
    pub fn is_feasible(&self) -> bool {
        matches!(self, OptimizeReport::Optimal { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            OptimizeReport::Optimal { .. } => "optimal",
            OptimizeReport::Infeasible { .. } => "infeasible",
            OptimizeReport::Timeout { .. } => "timeout",
        }
    }
}

/// Builds the model, solves it and double-checks any roster before
/// reporting it. Infeasible outcomes carry the analyzer's explanation.
pub fn optimize_report(config: &RosterConfig, options: &SolveOptions) -> Result<OptimizeReport> {
    let problem = roster::build(config)?;
    let solver = roster::default_solver();
    let started = Instant::now();
    let outcome = solver.solve(&problem, options);
    log::info!(
        "{} finished in {:?}",
        solver.name(),
        started.elapsed()
    );

    match outcome {
        SolveOutcome::Optimal(solution) => {
            let recomputed = problem.objective(&solution.selected);
            if (recomputed - solution.total_cost).abs() > COST_TOLERANCE {
                return Err(Error::SolutionMismatch {
                    reported: solution.total_cost,
                    recomputed,
                });
            }
            let violations = problem.violations(&solution.selected);
            if !violations.is_empty() {
                return Err(Error::RosterViolations(violations));
            }
            let roster = problem.roster(&solution);
            let problems = roster::verify_roster(config, &roster);
            if !problems.is_empty() {
                return Err(Error::RosterViolations(problems));
            }
            Ok(OptimizeReport::Optimal {
                feasible: true,
                total_cost: roster.total_cost,
                assignments: roster.assignments,
            })
        }
        SolveOutcome::Infeasible => {
            let analysis = roster::analyze(config)?;
            let mut suggestions = analysis.suggestions;
            if !analysis.issues.iter().any(Issue::is_blocking) {
                suggestions.push(
                    "No single shift or staff member explains the conflict; relax availability or max_hours across several staff"
                        .to_string(),
                );
            }
            Ok(OptimizeReport::Infeasible {
                feasible: false,
                issues: analysis.issues,
                suggestions,
            })
        }
        SolveOutcome::Timeout { incumbent } => {
            let limit = options
                .timeout
                .map(|timeout| format!("after {} ms", timeout.as_millis()))
                .unwrap_or_else(|| "by cancellation".to_string());
            let message = match &incumbent {
                Some(best) => format!(
                    "Solver stopped {} before proving optimality; best roster found costs ${:.2}",
                    limit, best.total_cost
                ),
                None => format!("Solver stopped {} before finding a roster", limit),
            };
            log::warn!("{}", message);
            Ok(OptimizeReport::Timeout {
                feasible: false,
                message,
                best_cost: incumbent.map(|best| best.total_cost),
            })
        }
    }
}
