//! Explains why a roster configuration cannot be staffed.
//!
//! Works from the configuration alone, so it can run before (or instead of)
//! a solve. Issues come out in check order; within a check, shifts follow the
//! calendar and staff follow configuration order.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::models::{RosterConfig, ShiftRequirement};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InsufficientStaff,
    NoFlexibility,
    OverworkedStaff,
    AggregateCapacity,
    DailyHeadcount,
    SoleCandidateConflict,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Shift id, staff name or day the issue is about.
    pub subject: Option<String>,
    pub message: String,
}

impl Issue {
    /// `NoFlexibility` is a fragility warning: it never blocks a roster on
    /// its own.
    pub fn is_blocking(&self) -> bool {
        self.kind != IssueKind::NoFlexibility
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InfeasibilityReport {
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
}

impl InfeasibilityReport {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(Issue::is_blocking)
    }

    fn push(&mut self, kind: IssueKind, subject: impl Into<String>, message: String) {
        self.issues.push(Issue {
            kind,
            subject: Some(subject.into()),
            message,
        });
    }
}

pub fn analyze(config: &RosterConfig) -> Result<InfeasibilityReport> {
    let shifts = config.validate()?;
    let eligible: Vec<Vec<usize>> = shifts
        .iter()
        .map(|shift| config.eligible_staff(&shift.id))
        .collect();

    let mut report = InfeasibilityReport::default();
    check_insufficient_staff(config, &shifts, &eligible, &mut report);
    check_no_flexibility(config, &shifts, &eligible, &mut report);
    check_overworked_staff(config, &shifts, &eligible, &mut report);
    check_aggregate_capacity(config, &shifts, &mut report);
    check_daily_headcount(config, &shifts, &mut report);
    check_sole_candidate_conflicts(config, &shifts, &eligible, &mut report);

    log::debug!(
        "analysis found {} issue(s), {} suggestion(s)",
        report.issues.len(),
        report.suggestions.len()
    );
    Ok(report)
}

fn names(config: &RosterConfig, staff: &[usize]) -> String {
    if staff.is_empty() {
        return "none".to_string();
    }
    staff
        .iter()
        .map(|&idx| config.staff[idx].name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_insufficient_staff(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    eligible: &[Vec<usize>],
    report: &mut InfeasibilityReport,
) {
    for (shift, staff) in shifts.iter().zip(eligible) {
        let available = staff.len() as u32;
        if available >= shift.required {
            continue;
        }
        let deficit = shift.required - available;
        report.push(
            IssueKind::InsufficientStaff,
            &shift.id,
            format!(
                "Shift {} needs {} staff but only {} are available ({})",
                shift.id,
                shift.required,
                available,
                names(config, staff)
            ),
        );
        report.suggestions.push(format!(
            "Make {} more staff available for {} or reduce its requirement from {} to {}",
            deficit, shift.id, shift.required, available
        ));
    }
}

fn check_no_flexibility(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    eligible: &[Vec<usize>],
    report: &mut InfeasibilityReport,
) {
    for (shift, staff) in shifts.iter().zip(eligible) {
        if shift.required == 0 || staff.len() as u32 != shift.required {
            continue;
        }
        report.push(
            IssueKind::NoFlexibility,
            &shift.id,
            format!(
                "Shift {} has no flexibility: it needs {} and only {} can work it",
                shift.id,
                shift.required,
                names(config, staff)
            ),
        );
    }
}

fn check_overworked_staff(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    eligible: &[Vec<usize>],
    report: &mut InfeasibilityReport,
) {
    for (staff_idx, member) in config.staff.iter().enumerate() {
        let critical: Vec<&ShiftRequirement> = shifts
            .iter()
            .zip(eligible)
            .filter(|(shift, staff)| shift.required > 0 && staff.as_slice() == [staff_idx])
            .map(|(shift, _)| shift)
            .collect();
        let required_hours: f64 = critical.iter().map(|shift| shift.duration_hours).sum();
        if required_hours <= member.max_hours {
            continue;
        }
        report.push(
            IssueKind::OverworkedStaff,
            &member.name,
            format!(
                "{} is the only candidate for {} shift(s) ({}) totalling {}h but max_hours is {}",
                member.name,
                critical.len(),
                critical
                    .iter()
                    .map(|shift| shift.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                required_hours,
                member.max_hours
            ),
        );
        report.suggestions.push(format!(
            "Raise {}'s max_hours from {} to at least {}",
            member.name, member.max_hours, required_hours
        ));
    }
}

fn check_aggregate_capacity(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    report: &mut InfeasibilityReport,
) {
    let required_hours: f64 = shifts
        .iter()
        .map(|shift| shift.required as f64 * shift.duration_hours)
        .sum();
    let capacity: f64 = config.staff.iter().map(|member| member.max_hours).sum();
    if capacity >= required_hours {
        return;
    }
    let shortfall = required_hours - capacity;
    report.push(
        IssueKind::AggregateCapacity,
        "all shifts",
        format!(
            "Shifts need {} staff-hours in total but staff can work at most {}h",
            required_hours, capacity
        ),
    );
    report.suggestions.push(format!(
        "Add staff with at least {}h of capacity or reduce total requirements by {}h",
        shortfall, shortfall
    ));
}

fn check_daily_headcount(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    report: &mut InfeasibilityReport,
) {
    for (day_idx, day) in config.days.iter().enumerate() {
        let day_shifts: Vec<&ShiftRequirement> =
            shifts.iter().filter(|shift| shift.day == day_idx).collect();
        let required: u32 = day_shifts.iter().map(|shift| shift.required).sum();
        if required == 0 {
            continue;
        }
        let available = config
            .staff
            .iter()
            .filter(|member| {
                day_shifts
                    .iter()
                    .any(|shift| config.is_available(member, &shift.id))
            })
            .count() as u32;
        if available >= required {
            continue;
        }
        report.push(
            IssueKind::DailyHeadcount,
            day,
            format!(
                "{} needs {} staff-shifts but only {} staff are available that day (one shift per day each)",
                day, required, available
            ),
        );
        report.suggestions.push(format!(
            "Make {} more staff available on {} or reduce {}'s requirements by {}",
            required - available,
            day,
            day,
            required - available
        ));
    }
}

fn check_sole_candidate_conflicts(
    config: &RosterConfig,
    shifts: &[ShiftRequirement],
    eligible: &[Vec<usize>],
    report: &mut InfeasibilityReport,
) {
    for (staff_idx, member) in config.staff.iter().enumerate() {
        for (day_idx, day) in config.days.iter().enumerate() {
            let sole: Vec<&str> = shifts
                .iter()
                .zip(eligible)
                .filter(|(shift, staff)| {
                    shift.day == day_idx && shift.required > 0 && staff.as_slice() == [staff_idx]
                })
                .map(|(shift, _)| shift.id.as_str())
                .collect();
            if sole.len() < 2 {
                continue;
            }
            report.push(
                IssueKind::SoleCandidateConflict,
                &member.name,
                format!(
                    "{} is the only candidate for {} shifts on {} ({}) but can work one shift per day",
                    member.name,
                    sole.len(),
                    day,
                    sole.join(", ")
                ),
            );
            report.suggestions.push(format!(
                "Make another staff member available for {} on {}",
                sole[1..].join(", "),
                day
            ));
        }
    }
}
