//! Turns a simulation run into a severity tier and staffing advice.

use std::fmt;

use serde::Serialize;

use crate::models::SimulationParameters;
use crate::state::SimulationResult;

pub const TARGET_UTILIZATION: f64 = 0.85;
pub const WARNING_UTILIZATION: f64 = 0.90;
pub const CAUTION_UTILIZATION: f64 = 0.75;
pub const UNDERUSED_UTILIZATION: f64 = 0.50;
pub const LITTLES_LAW_TOLERANCE: f64 = 0.02;
pub const HIGH_WAIT_VARIABILITY: f64 = 1.5;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
    Caution,
    Healthy,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Caution => "CAUTION",
            Severity::Healthy => "HEALTHY",
        };
        f.write_str(label)
    }
}

/// Inputs every severity rule sees.
#[derive(Clone, Copy, Debug)]
pub struct LoadMetrics {
    pub arrival_rate: f64,
    pub effective_service_rate: f64,
    pub servers: u32,
    pub traffic_intensity: f64,
    pub utilization: f64,
}

pub struct SeverityRule {
    pub severity: Severity,
    pub description: &'static str,
    pub matches: fn(&LoadMetrics) -> bool,
}

/// Evaluated top-down; the first match wins. The last rule always matches.
pub const SEVERITY_RULES: &[SeverityRule] = &[
    SeverityRule {
        severity: Severity::Critical,
        description: "traffic intensity >= 1.0",
        matches: |m| m.traffic_intensity >= 1.0,
    },
    SeverityRule {
        severity: Severity::Warning,
        description: "utilization > 90%",
        matches: |m| m.utilization > WARNING_UTILIZATION,
    },
    SeverityRule {
        severity: Severity::Caution,
        description: "utilization in (75%, 90%]",
        matches: |m| m.utilization > CAUTION_UTILIZATION,
    },
    SeverityRule {
        severity: Severity::Healthy,
        description: "utilization <= 75%",
        matches: |_| true,
    },
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LittlesLawCheck {
    pub arrival_rate: f64,
    pub expected: f64,
    pub observed: f64,
    pub relative_error: f64,
    pub passed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadAssessment {
    pub traffic_intensity: f64,
    pub effective_service_rate: f64,
    pub severity: Severity,
    pub status_message: String,
    pub recommendations: Vec<String>,
    pub littles_law_check: LittlesLawCheck,
}

pub fn classify(params: &SimulationParameters, result: &SimulationResult) -> LoadAssessment {
    let effective_service_rate = if result.observed_mean_service_time > 0.0 {
        1.0 / result.observed_mean_service_time
    } else {
        params.service_rate
    };
    let metrics = LoadMetrics {
        arrival_rate: params.arrival_rate,
        effective_service_rate,
        servers: params.servers,
        traffic_intensity: traffic_intensity(
            params.arrival_rate,
            effective_service_rate,
            params.servers,
        ),
        utilization: result.utilization,
    };

    let rule = SEVERITY_RULES
        .iter()
        .find(|rule| (rule.matches)(&metrics))
        .unwrap_or(&SEVERITY_RULES[SEVERITY_RULES.len() - 1]);
    log::debug!(
        "rho={:.3} utilization={:.3} -> {} ({})",
        metrics.traffic_intensity,
        metrics.utilization,
        rule.severity,
        rule.description
    );

    let mut recommendations = recommend(rule.severity, &metrics);
    if result.coefficient_of_variation > HIGH_WAIT_VARIABILITY {
        recommendations.push(format!(
            "Wait times are highly variable (CV {:.2}); review service-time variability before changing headcount.",
            result.coefficient_of_variation
        ));
    }

    let littles_law_check = littles_law(result);
    if !littles_law_check.passed {
        log::warn!(
            "Little's Law check failed: L={:.4} vs lambda*W={:.4}",
            littles_law_check.observed,
            littles_law_check.expected
        );
    }

    LoadAssessment {
        traffic_intensity: metrics.traffic_intensity,
        effective_service_rate,
        severity: rule.severity,
        status_message: status_message(rule.severity).to_string(),
        recommendations,
        littles_law_check,
    }
}

pub fn traffic_intensity(arrival_rate: f64, service_rate: f64, servers: u32) -> f64 {
    let capacity = service_rate * servers as f64;
    if capacity <= 0.0 {
        return f64::INFINITY;
    }
    arrival_rate / capacity
}

/// Smallest `s` with `arrival_rate / (service_rate * (servers + s)) < 1.0`.
/// Saturates at `u64::MAX` when no finite count exists.
pub fn additional_servers_for_stability(
    arrival_rate: f64,
    service_rate: f64,
    servers: u32,
) -> u64 {
    let offered = arrival_rate / service_rate;
    if !offered.is_finite() {
        return u64::MAX;
    }
    // `as` saturates; the check absorbs rounding in the division.
    let mut needed = (offered.floor() as u64).saturating_add(1);
    if arrival_rate / (service_rate * needed as f64) >= 1.0 {
        needed = needed.saturating_add(1);
    }
    needed.saturating_sub(servers as u64)
}

fn recommend(severity: Severity, metrics: &LoadMetrics) -> Vec<String> {
    let servers = metrics.servers;
    match severity {
        Severity::Critical => {
            let extra = additional_servers_for_stability(
                metrics.arrival_rate,
                metrics.effective_service_rate,
                servers,
            );
            vec![
                format!(
                    "Queue is unstable (rho = {:.2}); waits grow without bound.",
                    metrics.traffic_intensity
                ),
                format!(
                    "Add {} staff (to {}) to bring rho below 1.0.",
                    extra,
                    (servers as u64).saturating_add(extra)
                ),
            ]
        }
        Severity::Warning => {
            let target =
                (servers as f64 * metrics.utilization / TARGET_UTILIZATION).ceil() as u32;
            let extra = target.saturating_sub(servers);
            vec![
                format!(
                    "Utilization {:.1}% is above 90%; expect a bottleneck.",
                    metrics.utilization * 100.0
                ),
                format!(
                    "Add {} staff (to {}) to bring utilization to about 85%.",
                    extra,
                    servers + extra
                ),
            ]
        }
        Severity::Caution => vec![format!(
            "Utilization {:.1}% is elevated; no staffing change needed, keep monitoring.",
            metrics.utilization * 100.0
        )],
        Severity::Healthy => {
            let mut recommendations = vec!["Staffing is adequate for the current load.".to_string()];
            if metrics.utilization < UNDERUSED_UTILIZATION {
                let needed = minimum_servers_for(
                    metrics.arrival_rate,
                    metrics.effective_service_rate,
                    TARGET_UTILIZATION,
                );
                if needed < servers as u64 {
                    recommendations.push(format!(
                        "Utilization is only {:.1}%; staff could be reduced by {} (to {}) while keeping rho <= {:.2}.",
                        metrics.utilization * 100.0,
                        servers as u64 - needed,
                        needed,
                        TARGET_UTILIZATION
                    ));
                }
            }
            recommendations
        }
    }
}

/// Smallest server count (at least 1) keeping traffic intensity at or below `target`.
fn minimum_servers_for(arrival_rate: f64, service_rate: f64, target: f64) -> u64 {
    let servers = arrival_rate / (service_rate * target);
    if !servers.is_finite() {
        return u64::MAX;
    }
    let mut needed = (servers.ceil() as u64).max(1);
    if arrival_rate / (service_rate * needed as f64) > target {
        needed = needed.saturating_add(1);
    } else if needed > 1 && arrival_rate / (service_rate * (needed - 1) as f64) <= target {
        needed -= 1;
    }
    needed
}

fn littles_law(result: &SimulationResult) -> LittlesLawCheck {
    let expected = result.observed_arrival_rate * result.avg_wait_time;
    let observed = result.avg_queue_length;
    let scale = expected.abs().max(observed.abs());
    let relative_error = if scale == 0.0 {
        0.0
    } else {
        (observed - expected).abs() / scale
    };
    LittlesLawCheck {
        arrival_rate: result.observed_arrival_rate,
        expected,
        observed,
        relative_error,
        passed: relative_error <= LITTLES_LAW_TOLERANCE,
    }
}

fn status_message(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "System unstable: more staff required.",
        Severity::Warning => "High utilization: likely bottleneck.",
        Severity::Caution => "Elevated utilization: monitor closely.",
        Severity::Healthy => "System operating within limits.",
    }
}
