use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SimulationParameters {
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub servers: u32,
    pub horizon_hours: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationParameters {
    pub fn new(
        arrival_rate: f64,
        service_rate: f64,
        servers: u32,
        horizon_hours: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        let params = Self {
            arrival_rate,
            service_rate,
            servers,
            horizon_hours,
            seed,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        // `!(x > 0.0)` also rejects NaN.
        if !(self.arrival_rate > 0.0) || !self.arrival_rate.is_finite() {
            return Err(Error::InvalidArrivalRate(self.arrival_rate));
        }
        if !(self.service_rate > 0.0) || !self.service_rate.is_finite() {
            return Err(Error::InvalidServiceRate(self.service_rate));
        }
        if self.servers < 1 {
            return Err(Error::InvalidServerCount(self.servers));
        }
        if !(self.horizon_hours > 0.0) || !self.horizon_hours.is_finite() {
            return Err(Error::InvalidHorizon(self.horizon_hours));
        }
        Ok(())
    }
}

/// `[simulator]` section of a config file. Every field is optional so CLI
/// flags can fill the gaps.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SimulationDefaults {
    #[serde(default)]
    pub arrival_rate: Option<f64>,
    #[serde(default)]
    pub service_rate: Option<f64>,
    #[serde(default)]
    pub servers: Option<u32>,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

pub const DEFAULT_ARRIVAL_RATE: f64 = 10.0;
pub const DEFAULT_SERVICE_RATE: f64 = 4.0;
pub const DEFAULT_SERVERS: u32 = 3;
pub const DEFAULT_HOURS: f64 = 50.0;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub simulator: SimulationDefaults,
    #[serde(default, alias = "optimizer")]
    pub optimiser: RosterConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StaffMember {
    pub name: String,
    /// Hourly cost.
    pub cost: f64,
    pub max_hours: f64,
    #[serde(default)]
    pub availability: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RosterConfig {
    pub staff: Vec<StaffMember>,
    pub shift_requirements: BTreeMap<String, u32>,
    #[serde(default = "default_shift_duration")]
    pub shift_duration_hours: f64,
    /// Per-shift overrides of `shift_duration_hours`.
    #[serde(default)]
    pub shift_durations: BTreeMap<String, f64>,
    #[serde(default = "default_days")]
    pub days: Vec<String>,
    #[serde(default = "default_periods")]
    pub periods: Vec<String>,
}

/// A resolved shift: requirement plus the calendar day it falls on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShiftRequirement {
    pub id: String,
    pub day: usize,
    pub required: u32,
    pub duration_hours: f64,
}

pub fn shift_id(day: &str, period: &str) -> String {
    format!("{}_{}", day, period)
}

impl RosterConfig {
    /// Shifts in calendar order (days, then periods). Only shifts present in
    /// `shift_requirements` are returned.
    pub fn shifts(&self) -> Result<Vec<ShiftRequirement>> {
        self.check_calendar()?;
        let mut shifts = Vec::with_capacity(self.shift_requirements.len());
        for (day_idx, day) in self.days.iter().enumerate() {
            for period in &self.periods {
                let id = shift_id(day, period);
                if let Some(&required) = self.shift_requirements.get(&id) {
                    let duration_hours = self.duration_for(&id);
                    shifts.push(ShiftRequirement {
                        id,
                        day: day_idx,
                        required,
                        duration_hours,
                    });
                }
            }
        }

        if shifts.len() != self.shift_requirements.len() {
            let known: HashSet<&str> = shifts.iter().map(|shift| shift.id.as_str()).collect();
            if let Some(unknown) = self
                .shift_requirements
                .keys()
                .find(|id| !known.contains(id.as_str()))
            {
                return Err(Error::MalformedShift(unknown.clone()));
            }
        }

        Ok(shifts)
    }

    /// Days and periods must be unique, and every `day_period` id must come
    /// from exactly one pair ("A_B"+"C" and "A"+"B_C" collide).
    fn check_calendar(&self) -> Result<()> {
        for entries in [&self.days, &self.periods] {
            let mut seen = HashSet::new();
            if let Some(duplicate) = entries.iter().find(|entry| !seen.insert(entry.as_str())) {
                return Err(Error::DuplicateCalendarEntry(duplicate.clone()));
            }
        }
        let mut ids = HashSet::new();
        for day in &self.days {
            for period in &self.periods {
                let id = shift_id(day, period);
                if !ids.insert(id.clone()) {
                    return Err(Error::AmbiguousShift(id));
                }
            }
        }
        Ok(())
    }

    pub fn duration_for(&self, shift: &str) -> f64 {
        self.shift_durations
            .get(shift)
            .copied()
            .unwrap_or(self.shift_duration_hours)
    }

    /// Checks every boundary range and cross-reference and returns the
    /// resolved shift list.
    pub fn validate(&self) -> Result<Vec<ShiftRequirement>> {
        let shifts = self.shifts()?;
        for shift in &shifts {
            if !(shift.duration_hours > 0.0) || !shift.duration_hours.is_finite() {
                return Err(Error::InvalidShiftDuration {
                    shift: shift.id.clone(),
                    hours: shift.duration_hours,
                });
            }
        }

        let mut names = HashSet::new();
        for member in &self.staff {
            if member.name.trim().is_empty() {
                return Err(Error::EmptyStaffName);
            }
            if !names.insert(member.name.as_str()) {
                return Err(Error::DuplicateStaffName(member.name.clone()));
            }
            if !(member.cost >= 0.0) || !member.cost.is_finite() {
                return Err(Error::InvalidStaffCost {
                    name: member.name.clone(),
                    cost: member.cost,
                });
            }
            if !(member.max_hours > 0.0 && member.max_hours <= 168.0) {
                return Err(Error::InvalidMaxHours {
                    name: member.name.clone(),
                    max_hours: member.max_hours,
                });
            }
            for shift in &member.availability {
                if !self.shift_requirements.contains_key(shift) {
                    return Err(Error::UnknownShift {
                        staff: member.name.clone(),
                        shift: shift.clone(),
                    });
                }
            }
        }

        Ok(shifts)
    }

    pub fn is_available(&self, member: &StaffMember, shift: &str) -> bool {
        member.availability.iter().any(|entry| entry == shift)
    }

    /// Staff indices whose availability includes `shift`, in config order.
    pub fn eligible_staff(&self, shift: &str) -> Vec<usize> {
        self.staff
            .iter()
            .enumerate()
            .filter(|(_, member)| self.is_available(member, shift))
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl Default for RosterConfig {
    /// The reference clinic: two nurses on fixed halves of the day, a
    /// part-time nurse and a cheaper technician.
    fn default() -> Self {
        let staff = vec![
            staff_member(
                "Nurse_A",
                20.0,
                40.0,
                &["Mon_AM", "Tue_AM", "Wed_AM", "Thu_AM", "Fri_AM"],
            ),
            staff_member(
                "Nurse_B",
                20.0,
                40.0,
                &["Mon_PM", "Tue_PM", "Wed_PM", "Thu_PM", "Fri_PM"],
            ),
            staff_member(
                "Nurse_C",
                22.0,
                30.0,
                &["Mon_AM", "Tue_AM", "Wed_PM", "Thu_AM", "Fri_PM"],
            ),
            staff_member(
                "Tech_D",
                15.0,
                40.0,
                &[
                    "Mon_AM", "Mon_PM", "Tue_AM", "Tue_PM", "Wed_AM", "Thu_PM", "Fri_AM",
                ],
            ),
        ];
        let shift_requirements = [
            ("Mon_AM", 2),
            ("Mon_PM", 1),
            ("Tue_AM", 2),
            ("Tue_PM", 2),
            ("Wed_AM", 2),
            ("Wed_PM", 1),
            ("Thu_AM", 2),
            ("Thu_PM", 2),
            ("Fri_AM", 2),
            ("Fri_PM", 1),
        ]
        .into_iter()
        .map(|(shift, required)| (shift.to_string(), required))
        .collect();

        Self {
            staff,
            shift_requirements,
            shift_duration_hours: default_shift_duration(),
            shift_durations: BTreeMap::new(),
            days: default_days(),
            periods: default_periods(),
        }
    }
}

fn staff_member(name: &str, cost: f64, max_hours: f64, availability: &[&str]) -> StaffMember {
    StaffMember {
        name: name.to_string(),
        cost,
        max_hours,
        availability: availability.iter().map(|shift| shift.to_string()).collect(),
    }
}

fn default_shift_duration() -> f64 {
    8.0
}

fn default_days() -> Vec<String> {
    ["Mon", "Tue", "Wed", "Thu", "Fri"]
        .iter()
        .map(|day| day.to_string())
        .collect()
}

fn default_periods() -> Vec<String> {
    vec!["AM".to_string(), "PM".to_string()]
}
