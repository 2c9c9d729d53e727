use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::models::{RosterConfig, ShiftRequirement};
use crate::roster::{Roster, Solution, StaffRoster};

const FEASIBILITY_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct StaffVar {
    pub name: String,
    pub hourly_cost: f64,
    pub max_hours: f64,
}

/// Binary decision: staff `staff` works shift `shift`.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub staff: usize,
    pub shift: usize,
    pub cost: f64,
    pub hours: f64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    AtLeast,
    AtMost,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstraintKind {
    Coverage { shift: usize },
    MaxHours { staff: usize },
    OnePerDay { staff: usize, day: usize },
}

/// `sum(coefficient * x[var]) (>= | <=) rhs`
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationProblem {
    pub staff: Vec<StaffVar>,
    pub shifts: Vec<ShiftRequirement>,
    pub days: Vec<String>,
    pub variables: Vec<Variable>,
    pub constraints: Vec<LinearConstraint>,
}

pub fn build(config: &RosterConfig) -> Result<OptimizationProblem> {
    let shifts = config.validate()?;
    let shift_index: HashMap<&str, usize> = shifts
        .iter()
        .enumerate()
        .map(|(idx, shift)| (shift.id.as_str(), idx))
        .collect();

    let staff: Vec<StaffVar> = config
        .staff
        .iter()
        .map(|member| StaffVar {
            name: member.name.clone(),
            hourly_cost: member.cost,
            max_hours: member.max_hours,
        })
        .collect();

    let mut variables = Vec::new();
    for (staff_idx, member) in config.staff.iter().enumerate() {
        let mut available: Vec<usize> = member
            .availability
            .iter()
            .filter_map(|shift| shift_index.get(shift.as_str()).copied())
            .collect();
        available.sort_unstable();
        available.dedup();
        for shift_idx in available {
            let hours = shifts[shift_idx].duration_hours;
            variables.push(Variable {
                staff: staff_idx,
                shift: shift_idx,
                cost: member.cost * hours,
                hours,
            });
        }
    }

    let mut by_shift: Vec<Vec<usize>> = vec![Vec::new(); shifts.len()];
    let mut by_staff: Vec<Vec<usize>> = vec![Vec::new(); staff.len()];
    for (var_idx, variable) in variables.iter().enumerate() {
        by_shift[variable.shift].push(var_idx);
        by_staff[variable.staff].push(var_idx);
    }

    let uncovered: Vec<String> = shifts
        .iter()
        .zip(&by_shift)
        .filter(|(shift, vars)| shift.required > 0 && vars.is_empty())
        .map(|(shift, _)| shift.id.clone())
        .collect();
    if !uncovered.is_empty() {
        return Err(Error::NoEligibleStaff(uncovered));
    }

    let mut constraints = Vec::new();
    for (shift_idx, shift) in shifts.iter().enumerate() {
        constraints.push(LinearConstraint {
            kind: ConstraintKind::Coverage { shift: shift_idx },
            terms: by_shift[shift_idx].iter().map(|&var| (var, 1.0)).collect(),
            sense: Sense::AtLeast,
            rhs: shift.required as f64,
        });
    }
    for (staff_idx, member) in staff.iter().enumerate() {
        if by_staff[staff_idx].is_empty() {
            continue;
        }
        constraints.push(LinearConstraint {
            kind: ConstraintKind::MaxHours { staff: staff_idx },
            terms: by_staff[staff_idx]
                .iter()
                .map(|&var| (var, variables[var].hours))
                .collect(),
            sense: Sense::AtMost,
            rhs: member.max_hours,
        });

        let mut per_day: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
        for &var in &by_staff[staff_idx] {
            let day = shifts[variables[var].shift].day;
            per_day.entry(day).or_default().push((var, 1.0));
        }
        // A single shift on a day satisfies the limit on its own.
        for (day, terms) in per_day.into_iter().filter(|(_, terms)| terms.len() > 1) {
            constraints.push(LinearConstraint {
                kind: ConstraintKind::OnePerDay {
                    staff: staff_idx,
                    day,
                },
                terms,
                sense: Sense::AtMost,
                rhs: 1.0,
            });
        }
    }

    log::debug!(
        "built roster model: {} variables, {} constraints ({} staff x {} shifts)",
        variables.len(),
        constraints.len(),
        staff.len(),
        shifts.len()
    );

    Ok(OptimizationProblem {
        staff,
        shifts,
        days: config.days.clone(),
        variables,
        constraints,
    })
}

impl OptimizationProblem {
    pub fn variables_for_shift(&self, shift: usize) -> impl Iterator<Item = usize> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter(move |(_, variable)| variable.shift == shift)
            .map(|(idx, _)| idx)
    }

    pub fn objective(&self, selected: &[usize]) -> f64 {
        self.selection_mask(selected)
            .iter()
            .zip(&self.variables)
            .filter(|(chosen, _)| **chosen)
            .map(|(_, variable)| variable.cost)
            .sum()
    }

    /// Human-readable description of every constraint `selected` breaks.
    pub fn violations(&self, selected: &[usize]) -> Vec<String> {
        let mut violations: Vec<String> = selected
            .iter()
            .filter(|&&var| var >= self.variables.len())
            .map(|var| format!("unknown variable {}", var))
            .collect();

        let mask = self.selection_mask(selected);
        for constraint in &self.constraints {
            let lhs: f64 = constraint
                .terms
                .iter()
                .filter(|(var, _)| mask[*var])
                .map(|(_, coefficient)| coefficient)
                .sum();
            let satisfied = match constraint.sense {
                Sense::AtLeast => lhs + FEASIBILITY_TOLERANCE >= constraint.rhs,
                Sense::AtMost => lhs <= constraint.rhs + FEASIBILITY_TOLERANCE,
            };
            if !satisfied {
                violations.push(self.describe(constraint, lhs));
            }
        }
        violations
    }

    pub fn roster(&self, solution: &Solution) -> Roster {
        let mask = self.selection_mask(&solution.selected);
        let assignments = self
            .staff
            .iter()
            .enumerate()
            .map(|(staff_idx, member)| {
                let mut shifts = Vec::new();
                let mut hours = 0.0;
                for (variable, _) in self
                    .variables
                    .iter()
                    .zip(&mask)
                    .filter(|(variable, chosen)| **chosen && variable.staff == staff_idx)
                {
                    shifts.push(self.shifts[variable.shift].id.clone());
                    hours += variable.hours;
                }
                (member.name.clone(), StaffRoster { shifts, hours })
            })
            .collect();

        Roster {
            total_cost: solution.total_cost,
            assignments,
        }
    }

    fn selection_mask(&self, selected: &[usize]) -> Vec<bool> {
        let mut mask = vec![false; self.variables.len()];
        for &var in selected {
            if let Some(slot) = mask.get_mut(var) {
                *slot = true;
            }
        }
        mask
    }

    fn describe(&self, constraint: &LinearConstraint, lhs: f64) -> String {
        match constraint.kind {
            ConstraintKind::Coverage { shift } => format!(
                "coverage {}: {} assigned, {} required",
                self.shifts[shift].id, lhs, constraint.rhs
            ),
            ConstraintKind::MaxHours { staff } => format!(
                "max hours {}: {} assigned, limit {}",
                self.staff[staff].name, lhs, constraint.rhs
            ),
            ConstraintKind::OnePerDay { staff, day } => format!(
                "one shift per day {}: {} shifts on {}",
                self.staff[staff].name,
                lhs,
                self.days.get(day).map(String::as_str).unwrap_or("?")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterConfig;

    #[test]
    fn variables_only_cover_availability() {
        let config = RosterConfig::default();
        let problem = build(&config).expect("default config should build");
        let expected: usize = config.staff.iter().map(|member| member.availability.len()).sum();
        assert_eq!(problem.variables.len(), expected);
        assert!(problem.variables.iter().all(|variable| {
            config.staff[variable.staff]
                .availability
                .contains(&problem.shifts[variable.shift].id)
        }));
    }

    #[test]
    fn objective_uses_hourly_cost_times_duration() {
        let problem = build(&RosterConfig::default()).expect("default config should build");
        let tech = problem
            .variables
            .iter()
            .position(|variable| problem.staff[variable.staff].name == "Tech_D")
            .expect("Tech_D has variables");
        assert_eq!(problem.variables[tech].cost, 15.0 * 8.0);
        assert_eq!(problem.objective(&[tech]), 120.0);
    }

    #[test]
    fn one_per_day_only_for_multi_shift_days() {
        let problem = build(&RosterConfig::default()).expect("default config should build");
        let one_per_day: Vec<&LinearConstraint> = problem
            .constraints
            .iter()
            .filter(|constraint| matches!(constraint.kind, ConstraintKind::OnePerDay { .. }))
            .collect();
        // Tech_D: Mon and Tue have both periods available.
        assert_eq!(one_per_day.len(), 2);
        assert!(one_per_day.iter().all(|constraint| constraint.terms.len() == 2));
    }

    #[test]
    fn empty_selection_violates_every_staffed_shift() {
        let problem = build(&RosterConfig::default()).expect("default config should build");
        let violations = problem.violations(&[]);
        assert_eq!(violations.len(), 10);
        assert_eq!(violations[0], "coverage Mon_AM: 0 assigned, 2 required");
    }

    #[test]
    fn zero_eligible_shift_is_a_configuration_error() {
        let mut config = RosterConfig::default();
        for member in &mut config.staff {
            member.availability.retain(|shift| shift != "Wed_PM" && shift != "Fri_PM");
        }
        let err = build(&config).unwrap_err();
        assert_eq!(err.details(), ["Wed_PM", "Fri_PM"]);
    }

    #[test]
    fn unstaffed_shift_with_zero_requirement_is_allowed() {
        let mut config = RosterConfig::default();
        config.shift_requirements.insert("Wed_PM".to_string(), 0);
        for member in &mut config.staff {
            member.availability.retain(|shift| shift != "Wed_PM");
        }
        assert!(build(&config).is_ok());
    }
}
