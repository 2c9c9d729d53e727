use std::collections::{BTreeMap, HashMap};

use crate::models::RosterConfig;
use crate::roster::Roster;

const HOURS_TOLERANCE: f64 = 1e-6;

/// Checks a finished roster against the configuration directly, without the
/// optimisation model. Returns one message per broken rule; empty means the
/// roster is valid.
pub fn verify_roster(config: &RosterConfig, roster: &Roster) -> Vec<String> {
    let shifts = match config.validate() {
        Ok(shifts) => shifts,
        Err(err) => return vec![err.to_string()],
    };
    let day_of: HashMap<&str, usize> = shifts
        .iter()
        .map(|shift| (shift.id.as_str(), shift.day))
        .collect();

    let mut problems = Vec::new();
    let mut coverage: HashMap<&str, u32> = HashMap::new();

    for (name, assigned) in &roster.assignments {
        let Some(member) = config.staff.iter().find(|member| &member.name == name) else {
            problems.push(format!("{} is not a configured staff member", name));
            continue;
        };

        let mut hours = 0.0;
        let mut per_day: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for shift in &assigned.shifts {
            let Some(&day) = day_of.get(shift.as_str()) else {
                problems.push(format!("{} is assigned unknown shift {}", name, shift));
                continue;
            };
            if !config.is_available(member, shift) {
                problems.push(format!("{} is not available for {}", name, shift));
            }
            hours += config.duration_for(shift);
            per_day.entry(day).or_default().push(shift.as_str());
            *coverage.entry(shift.as_str()).or_default() += 1;
        }

        if hours > member.max_hours + HOURS_TOLERANCE {
            problems.push(format!(
                "{} works {}h, over max_hours {}",
                name, hours, member.max_hours
            ));
        }
        for (day, day_shifts) in per_day.into_iter().filter(|(_, shifts)| shifts.len() > 1) {
            problems.push(format!(
                "{} works {} shifts on {} ({})",
                name,
                day_shifts.len(),
                config.days[day],
                day_shifts.join(", ")
            ));
        }
    }

    for shift in &shifts {
        let assigned = coverage.get(shift.id.as_str()).copied().unwrap_or(0);
        if assigned < shift.required {
            problems.push(format!(
                "{} has {} staff, {} required",
                shift.id, assigned, shift.required
            ));
        }
    }

    problems
}
