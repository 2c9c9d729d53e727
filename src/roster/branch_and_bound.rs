use std::time::Instant;

use crate::roster::{OptimizationProblem, RosterSolver, Solution, SolveOptions, SolveOutcome};

const COST_EPSILON: f64 = 1e-9;
const DEFAULT_POLL_INTERVAL: u64 = 1024;

/// Depth-first search over shifts, choosing exactly `required` staff for each.
///
/// Costs are non-negative, so a roster that over-covers a shift is never
/// cheaper than one that covers it exactly. Shifts with the least slack are
/// branched first and candidates are tried cheapest first, so the incumbent
/// tightens quickly.
#[derive(Clone, Debug)]
pub struct BranchAndBound {
    /// Nodes between deadline / cancel-flag polls.
    pub poll_interval: u64,
    /// Stop after visiting this many nodes, keeping the incumbent.
    pub node_limit: Option<u64>,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            node_limit: None,
        }
    }
}

impl RosterSolver for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, problem: &OptimizationProblem, options: &SolveOptions) -> SolveOutcome {
        let started = Instant::now();
        let mut search = Search::new(problem, options, started, self.poll_interval.max(1));
        search.node_limit = self.node_limit;

        if let Some(shift) = search.uncoverable_shift() {
            log::info!(
                "shift {} cannot be covered by its eligible staff",
                problem.shifts[shift].id
            );
            return SolveOutcome::Infeasible;
        }
        if options.is_cancelled() || search.past_deadline() {
            return SolveOutcome::Timeout { incumbent: None };
        }

        search.branch(0);
        log::debug!(
            "{} explored {} nodes in {:?}",
            self.name(),
            search.nodes,
            started.elapsed()
        );

        match (search.interrupted, search.best) {
            (true, incumbent) => SolveOutcome::Timeout { incumbent },
            (false, Some(best)) => SolveOutcome::Optimal(best),
            (false, None) => SolveOutcome::Infeasible,
        }
    }
}

struct Search<'a> {
    problem: &'a OptimizationProblem,
    options: &'a SolveOptions,
    deadline: Option<Instant>,
    poll_interval: u64,
    node_limit: Option<u64>,
    /// Shift indices in branching order.
    order: Vec<usize>,
    /// Variables per shift, cheapest first.
    candidates: Vec<Vec<usize>>,
    /// `suffix_bound[p]`: lower bound on the cost of shifts `order[p..]`.
    suffix_bound: Vec<f64>,
    hours_used: Vec<f64>,
    /// `staff * days + day`
    day_taken: Vec<bool>,
    day_count: usize,
    chosen: Vec<usize>,
    cost: f64,
    best: Option<Solution>,
    nodes: u64,
    interrupted: bool,
}

impl<'a> Search<'a> {
    fn new(
        problem: &'a OptimizationProblem,
        options: &'a SolveOptions,
        started: Instant,
        poll_interval: u64,
    ) -> Self {
        let mut candidates: Vec<Vec<usize>> = (0..problem.shifts.len())
            .map(|shift| problem.variables_for_shift(shift).collect())
            .collect();
        for vars in &mut candidates {
            vars.sort_by(|a, b| {
                problem.variables[*a]
                    .cost
                    .total_cmp(&problem.variables[*b].cost)
                    .then_with(|| a.cmp(b))
            });
        }

        let mut order: Vec<usize> = (0..problem.shifts.len())
            .filter(|&shift| problem.shifts[shift].required > 0)
            .collect();
        order.sort_by_key(|&shift| {
            let slack = candidates[shift].len() as i64 - problem.shifts[shift].required as i64;
            (slack, shift)
        });

        let mut suffix_bound = vec![0.0; order.len() + 1];
        for pos in (0..order.len()).rev() {
            let shift = order[pos];
            let cheapest: f64 = candidates[shift]
                .iter()
                .take(problem.shifts[shift].required as usize)
                .map(|&var| problem.variables[var].cost)
                .sum();
            suffix_bound[pos] = suffix_bound[pos + 1] + cheapest;
        }

        let day_count = problem
            .shifts
            .iter()
            .map(|shift| shift.day + 1)
            .max()
            .unwrap_or(0);

        Self {
            problem,
            options,
            deadline: options.deadline(started),
            poll_interval,
            node_limit: None,
            order,
            candidates,
            suffix_bound,
            hours_used: vec![0.0; problem.staff.len()],
            day_taken: vec![false; problem.staff.len() * day_count],
            day_count,
            chosen: Vec::new(),
            cost: 0.0,
            best: None,
            nodes: 0,
            interrupted: false,
        }
    }

    fn uncoverable_shift(&self) -> Option<usize> {
        (0..self.problem.shifts.len()).find(|&shift| {
            self.candidates[shift].len() < self.problem.shifts[shift].required as usize
        })
    }

    fn past_deadline(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn should_stop(&mut self) -> bool {
        if self.interrupted {
            return true;
        }
        self.nodes += 1;
        let over_budget = self.node_limit.is_some_and(|limit| self.nodes > limit);
        if over_budget
            || (self.nodes % self.poll_interval == 0
                && (self.options.is_cancelled() || self.past_deadline()))
        {
            log::info!("search interrupted after {} nodes", self.nodes);
            self.interrupted = true;
        }
        self.interrupted
    }

    fn beats_incumbent(&self, lower_bound: f64) -> bool {
        match &self.best {
            Some(best) => lower_bound < best.total_cost - COST_EPSILON,
            None => true,
        }
    }

    fn branch(&mut self, pos: usize) {
        if self.should_stop() {
            return;
        }
        if pos == self.order.len() {
            log::trace!("new incumbent with cost {:.2}", self.cost);
            self.best = Some(Solution {
                total_cost: self.cost,
                selected: {
                    let mut selected = self.chosen.clone();
                    selected.sort_unstable();
                    selected
                },
            });
            return;
        }
        if !self.beats_incumbent(self.cost + self.suffix_bound[pos]) {
            return;
        }

        let shift = self.order[pos];
        let open: Vec<usize> = self.candidates[shift]
            .iter()
            .copied()
            .filter(|&var| self.can_take(var))
            .collect();
        let required = self.problem.shifts[shift].required as usize;
        if open.len() < required {
            return;
        }
        self.choose(pos, &open, 0, required);
    }

    /// Picks `remaining` more variables for `order[pos]` from `open[start..]`.
    fn choose(&mut self, pos: usize, open: &[usize], start: usize, remaining: usize) {
        if remaining == 0 {
            self.branch(pos + 1);
            return;
        }

        for idx in start..=(open.len() - remaining) {
            // `open` is sorted by cost, so this is the cheapest completion of
            // the current shift from here on.
            let completion: f64 = open[idx..idx + remaining]
                .iter()
                .map(|&var| self.problem.variables[var].cost)
                .sum();
            if !self.beats_incumbent(self.cost + completion + self.suffix_bound[pos + 1]) {
                break;
            }

            let var = open[idx];
            if !self.can_take(var) {
                continue;
            }
            self.take(var);
            self.choose(pos, open, idx + 1, remaining - 1);
            self.release(var);
            if self.interrupted {
                return;
            }
        }
    }

    fn can_take(&self, var: usize) -> bool {
        let variable = &self.problem.variables[var];
        let day = self.problem.shifts[variable.shift].day;
        let max_hours = self.problem.staff[variable.staff].max_hours;
        !self.day_taken[variable.staff * self.day_count + day]
            && self.hours_used[variable.staff] + variable.hours <= max_hours + COST_EPSILON
    }

    fn take(&mut self, var: usize) {
        let variable = &self.problem.variables[var];
        let day = self.problem.shifts[variable.shift].day;
        self.day_taken[variable.staff * self.day_count + day] = true;
        self.hours_used[variable.staff] += variable.hours;
        self.cost += variable.cost;
        self.chosen.push(var);
    }

    fn release(&mut self, var: usize) {
        let variable = &self.problem.variables[var];
        let day = self.problem.shifts[variable.shift].day;
        self.day_taken[variable.staff * self.day_count + day] = false;
        self.hours_used[variable.staff] -= variable.hours;
        self.cost -= variable.cost;
        self.chosen.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RosterConfig, StaffMember};
    use crate::roster::build;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    fn member(name: &str, cost: f64, max_hours: f64, availability: &[&str]) -> StaffMember {
        StaffMember {
            name: name.to_string(),
            cost,
            max_hours,
            availability: availability.iter().map(|shift| shift.to_string()).collect(),
        }
    }

    fn solve(config: &RosterConfig) -> SolveOutcome {
        let problem = build(config).expect("config should build");
        BranchAndBound::default().solve(&problem, &SolveOptions::default())
    }

    #[test]
    fn default_clinic_costs_2552() {
        let outcome = solve(&RosterConfig::default());
        let SolveOutcome::Optimal(solution) = outcome else {
            panic!("expected optimal outcome, got {:?}", outcome);
        };
        assert!((solution.total_cost - 2552.0).abs() < 1e-6);
    }

    #[test]
    fn prefers_cheaper_staff_within_hours() {
        let mut config = RosterConfig::default();
        config.periods = vec!["AM".to_string()];
        config.shift_requirements = config
            .days
            .iter()
            .map(|day| (format!("{}_AM", day), 1))
            .collect();
        let all: Vec<String> = config.shift_requirements.keys().cloned().collect();
        let all: Vec<&str> = all.iter().map(String::as_str).collect();
        // Cheap only has room for three shifts.
        config.staff = vec![
            member("Cheap", 10.0, 24.0, &all),
            member("Dear", 30.0, 40.0, &all),
        ];

        let SolveOutcome::Optimal(solution) = solve(&config) else {
            panic!("expected optimal outcome");
        };
        assert!((solution.total_cost - (3.0 * 80.0 + 2.0 * 240.0)).abs() < 1e-6);
    }

    #[test]
    fn respects_one_shift_per_day() {
        let mut config = RosterConfig::default();
        config.days = vec!["Mon".to_string()];
        config.shift_requirements = [("Mon_AM".to_string(), 1), ("Mon_PM".to_string(), 1)]
            .into_iter()
            .collect();
        config.staff = vec![
            member("Solo", 10.0, 40.0, &["Mon_AM", "Mon_PM"]),
            member("Backup", 50.0, 40.0, &["Mon_PM"]),
        ];

        let problem = build(&config).expect("config should build");
        let outcome = BranchAndBound::default().solve(&problem, &SolveOptions::default());
        let SolveOutcome::Optimal(solution) = outcome else {
            panic!("expected optimal outcome");
        };
        let roster = problem.roster(&solution);
        assert_eq!(roster.staff_on("Mon_AM"), vec!["Solo"]);
        assert_eq!(roster.staff_on("Mon_PM"), vec!["Backup"]);
        assert!((solution.total_cost - 480.0).abs() < 1e-6);
    }

    #[test]
    fn reports_infeasible_when_hours_run_out() {
        let mut config = RosterConfig::default();
        for member in &mut config.staff {
            member.max_hours = 8.0;
        }
        assert_eq!(solve(&config), SolveOutcome::Infeasible);
    }

    #[test]
    fn reports_infeasible_when_shift_is_short_staffed() {
        let mut config = RosterConfig::default();
        config.shift_requirements.insert("Mon_AM".to_string(), 4);
        assert_eq!(solve(&config), SolveOutcome::Infeasible);
    }

    #[test]
    fn cancelled_search_is_a_timeout() {
        let problem = build(&RosterConfig::default()).expect("config should build");
        let options = SolveOptions {
            timeout: None,
            cancel: Some(Arc::new(AtomicBool::new(true))),
        };
        let outcome = BranchAndBound::default().solve(&problem, &options);
        assert_eq!(outcome, SolveOutcome::Timeout { incumbent: None });
    }

    #[test]
    fn interrupted_search_keeps_its_incumbent() {
        let mut config = RosterConfig::default();
        config.days = vec!["Mon".to_string()];
        config.shift_requirements = [("Mon_AM".to_string(), 1), ("Mon_PM".to_string(), 1)]
            .into_iter()
            .collect();
        config.staff = vec![
            member("Flex", 10.0, 40.0, &["Mon_AM", "Mon_PM"]),
            member("Early", 12.0, 40.0, &["Mon_AM"]),
            member("Late", 40.0, 40.0, &["Mon_PM"]),
        ];
        let problem = build(&config).expect("config should build");

        // Flex on AM forces Late on PM; that leaf is the third node.
        let limited = BranchAndBound {
            node_limit: Some(3),
            ..BranchAndBound::default()
        };
        let outcome = limited.solve(&problem, &SolveOptions::default());
        let SolveOutcome::Timeout {
            incumbent: Some(best),
        } = outcome
        else {
            panic!("expected timeout with incumbent, got {:?}", outcome);
        };
        assert!((best.total_cost - 400.0).abs() < 1e-6);
        let roster = problem.roster(&best);
        assert_eq!(roster.staff_on("Mon_AM"), vec!["Flex"]);
        assert_eq!(roster.staff_on("Mon_PM"), vec!["Late"]);

        let SolveOutcome::Optimal(optimal) = solve(&config) else {
            panic!("expected optimal outcome");
        };
        assert!((optimal.total_cost - 176.0).abs() < 1e-6);
    }

    #[test]
    fn zero_timeout_is_a_timeout_not_infeasible() {
        let problem = build(&RosterConfig::default()).expect("config should build");
        let outcome = BranchAndBound::default()
            .solve(&problem, &SolveOptions::with_timeout(Duration::ZERO));
        assert!(matches!(outcome, SolveOutcome::Timeout { .. }));
    }

    #[test]
    fn zero_requirement_shifts_stay_empty() {
        let mut config = RosterConfig::default();
        config.shift_requirements.insert("Fri_PM".to_string(), 0);
        let problem = build(&config).expect("config should build");
        let SolveOutcome::Optimal(solution) =
            BranchAndBound::default().solve(&problem, &SolveOptions::default())
        else {
            panic!("expected optimal outcome");
        };
        assert!(problem.roster(&solution).staff_on("Fri_PM").is_empty());
        // Fri_PM was covered by Nurse_B at 160.
        assert!((solution.total_cost - (2552.0 - 160.0)).abs() < 1e-6);
    }
}
