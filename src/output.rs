use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::AppConfig;
use crate::report::{OptimizeReport, SimulationReport};
use crate::roster::InfeasibilityReport;

/// Anything a subcommand can print.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(untagged)]
pub enum Report<'a> {
    Simulation(&'a SimulationReport),
    Optimize(&'a OptimizeReport),
    Analysis(&'a InfeasibilityReport),
}

pub trait Formatter {
    fn write(&self, report: &Report<'_>) -> Result<String>;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, report: &Report<'_>) -> Result<String> {
        let mut out = String::new();
        let written = match report {
            Report::Simulation(report) => write_simulation(&mut out, report),
            Report::Optimize(report) => write_optimize(&mut out, report),
            Report::Analysis(report) => write_analysis(&mut out, report),
        };
        written.map_err(|err| Error::Export(err.to_string()))?;
        Ok(out)
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &Report<'_>) -> Result<String> {
        let mut out = String::new();
        let written = match report {
            Report::Simulation(report) => writeln!(
                out,
                "severity: {}\nutilization: {:.1}%\navg_wait_time: {:.4}\npatients_served: {}",
                report.severity_tier,
                report.utilization * 100.0,
                report.avg_wait_time,
                report.patients_served
            ),
            Report::Optimize(OptimizeReport::Optimal { total_cost, .. }) => {
                writeln!(out, "status: optimal\ntotal_cost: {:.2}", total_cost)
            }
            Report::Optimize(report) => writeln!(out, "status: {}", report.status()),
            Report::Analysis(report) => writeln!(
                out,
                "issues: {}\nblocking: {}",
                report.issues.len(),
                report.has_blocking_issues()
            ),
        };
        written.map_err(|err| Error::Export(err.to_string()))?;
        Ok(out)
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &Report<'_>) -> Result<String> {
        let mut out = serde_json::to_string_pretty(report)
            .map_err(|err| Error::Export(format!("failed to serialize report: {}", err)))?;
        out.push('\n');
        Ok(out)
    }
}

impl JsonFormatter {
    /// Pretty JSON of a loaded configuration, defaults filled in.
    pub fn config(&self, config: &AppConfig) -> Result<String> {
        let mut out = serde_json::to_string_pretty(config)
            .map_err(|err| Error::Export(format!("failed to serialize config: {}", err)))?;
        out.push('\n');
        Ok(out)
    }
}

/// Writes `value` as pretty JSON to `path`.
pub fn export_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .map_err(|err| Error::Export(format!("failed to serialize report: {}", err)))?;
    fs::write(path, contents).map_err(|err| {
        Error::Export(format!(
            "failed to write export '{}': {}",
            path.display(),
            err
        ))
    })?;
    log::info!("exported report to {}", path.display());
    Ok(())
}

fn write_simulation(out: &mut String, report: &SimulationReport) -> std::fmt::Result {
    let params = &report.parameters;
    let seed = params
        .seed
        .map(|seed| seed.to_string())
        .unwrap_or_else(|| "random".to_string());
    writeln!(
        out,
        "Parameters: arrival_rate={}/h service_rate={}/h servers={} hours={} seed={}",
        params.arrival_rate, params.service_rate, params.servers, params.horizon_hours, seed
    )?;
    writeln!(out, "Patients served: {}", report.patients_served)?;
    writeln!(out, "Average wait: {:.4} h", report.avg_wait_time)?;
    writeln!(out, "Average queue length: {:.4}", report.avg_queue_length)?;
    writeln!(out, "Utilization: {:.1}%", report.utilization * 100.0)?;
    writeln!(out, "Max wait: {:.4} h", report.max_wait_time)?;
    writeln!(out, "Traffic intensity: {:.3}", report.traffic_intensity)?;
    writeln!(out, "Severity: {}", report.severity_tier)?;
    writeln!(out, "Status: {}", report.status_message)?;
    let check = &report.littles_law_check;
    writeln!(
        out,
        "Little's Law: L={:.4} lambda*W={:.4} ({})",
        check.observed,
        check.expected,
        if check.passed { "ok" } else { "mismatch" }
    )?;
    writeln!(out, "Recommendations:")?;
    for recommendation in &report.recommendations {
        writeln!(out, "- {}", recommendation)?;
    }
    Ok(())
}

fn write_optimize(out: &mut String, report: &OptimizeReport) -> std::fmt::Result {
    writeln!(out, "Status: {}", report.status())?;
    match report {
        OptimizeReport::Optimal {
            total_cost,
            assignments,
            ..
        } => {
            writeln!(out, "Total cost: ${:.2}", total_cost)?;
            writeln!(out, "Assignments:")?;
            for (name, roster) in assignments {
                let shifts = if roster.shifts.is_empty() {
                    "-".to_string()
                } else {
                    roster.shifts.join(", ")
                };
                writeln!(out, "{}: {} ({}h)", name, shifts, roster.hours)?;
            }
        }
        OptimizeReport::Infeasible {
            issues,
            suggestions,
            ..
        } => {
            write_list(out, "Issues:", issues.iter().map(|issue| issue.message.as_str()))?;
            write_list(out, "Suggestions:", suggestions.iter().map(String::as_str))?;
        }
        OptimizeReport::Timeout { message, .. } => writeln!(out, "{}", message)?,
    }
    Ok(())
}

fn write_analysis(out: &mut String, report: &InfeasibilityReport) -> std::fmt::Result {
    let verdict = if report.has_blocking_issues() {
        "blocking issues found"
    } else if report.has_issues() {
        "no blocking issues (warnings only)"
    } else {
        "no issues found"
    };
    writeln!(out, "Feasibility: {}", verdict)?;
    if report.has_issues() {
        writeln!(out, "Issues:")?;
        for issue in &report.issues {
            let tag = if issue.is_blocking() { "error" } else { "warning" };
            writeln!(out, "- [{}] {}", tag, issue.message)?;
        }
    }
    write_list(out, "Suggestions:", report.suggestions.iter().map(String::as_str))
}

fn write_list<'a>(
    out: &mut String,
    heading: &str,
    items: impl ExactSizeIterator<Item = &'a str>,
) -> std::fmt::Result {
    if items.len() == 0 {
        return Ok(());
    }
    writeln!(out, "{}", heading)?;
    for item in items {
        writeln!(out, "- {}", item)?;
    }
    Ok(())
}
