use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::events::{Event, EventQueue, Patient};
use crate::models::SimulationParameters;
use crate::state::{EngineState, SimulationResult};

/// Upper bound on the sample buffers reserved up front; longer runs grow them.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

/// One M/M/c run. Owns every piece of mutable state for the run; nothing
/// outlives [`SimulationEngine::run`].
pub struct SimulationEngine {
    params: SimulationParameters,
    state: EngineState,
    events: EventQueue,
    rng: StdRng,
    next_patient_id: usize,
}

impl SimulationEngine {
    pub fn new(params: SimulationParameters) -> Result<Self> {
        params.validate()?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let expected_arrivals = sample_capacity(&params);
        let state = EngineState::new(params.servers as usize);
        let events = EventQueue::with_capacity(params.servers as usize + 1);

        Ok(Self {
            state: EngineState {
                wait_times: Vec::with_capacity(expected_arrivals),
                service_times: Vec::with_capacity(expected_arrivals),
                ..state
            },
            params,
            events,
            rng,
            next_patient_id: 1,
        })
    }

    pub fn run(mut self) -> SimulationResult {
        self.schedule_next_arrival(0.0);

        while let Some(scheduled) = self.events.pop() {
            let now = scheduled.time;
            self.state.advance_to(now);
            match scheduled.event {
                Event::Arrival(patient) => {
                    log::trace!("{:.4}: patient {} arrives", now, patient.id);
                    self.state.totals.arrivals += 1;
                    self.schedule_next_arrival(now);
                    match self.state.idle_server() {
                        Some(server_id) => self.start_service(server_id, patient, now),
                        None => self.state.waiting.push_back(patient),
                    }
                }
                Event::Departure {
                    server_id,
                    patient_id,
                } => {
                    log::trace!("{:.4}: patient {} leaves", now, patient_id);
                    let server = &mut self.state.servers[server_id];
                    server.serving = None;
                    self.state.totals.served += 1;
                    if let Some(next) = self.state.waiting.pop_front() {
                        self.start_service(server_id, next, now);
                    }
                }
            }
        }

        let result = self.finish();
        log::debug!(
            "simulated {} patients over {}h: avg wait {:.4}h, utilization {:.2}%",
            result.patients_served,
            result.horizon_hours,
            result.avg_wait_time,
            result.utilization * 100.0
        );
        result
    }

    fn schedule_next_arrival(&mut self, now: f64) {
        let arrival_time = now + sample_exponential(&mut self.rng, self.params.arrival_rate);
        if arrival_time > self.params.horizon_hours {
            return;
        }
        let patient = Patient {
            id: self.next_patient_id,
            arrival_time,
        };
        self.next_patient_id += 1;
        self.events.schedule(arrival_time, Event::Arrival(patient));
    }

    fn start_service(&mut self, server_id: usize, patient: Patient, now: f64) {
        let wait = (now - patient.arrival_time).max(0.0);
        let service = sample_exponential(&mut self.rng, self.params.service_rate);
        log::trace!(
            "{:.4}: patient {} begins service (wait {:.4})",
            now,
            patient.id,
            wait
        );

        let totals = &mut self.state.totals;
        totals.total_wait += wait;
        totals.total_service += service;
        totals.max_wait = totals.max_wait.max(wait);
        self.state.wait_times.push(wait);
        self.state.service_times.push(service);

        let server = &mut self.state.servers[server_id];
        server.serving = Some(patient.id);
        server.busy_time += service;
        self.events.schedule(
            now + service,
            Event::Departure {
                server_id,
                patient_id: patient.id,
            },
        );
    }

    fn finish(self) -> SimulationResult {
        let horizon = self.params.horizon_hours;
        let totals = &self.state.totals;
        let served = totals.served;
        let available_time = self.params.servers as f64 * horizon;
        let total_busy_time = self.state.busy_time();

        let avg_wait_time = ratio(totals.total_wait, served as f64);
        let observed_mean_service_time = ratio(totals.total_service, served as f64);
        let coefficient_of_variation = coefficient_of_variation(&self.state.wait_times);

        SimulationResult {
            servers: self.params.servers,
            horizon_hours: horizon,
            patients_served: served,
            observed_arrival_rate: ratio(totals.arrivals as f64, horizon),
            avg_wait_time,
            avg_queue_length: ratio(totals.queue_area, horizon),
            utilization: ratio(total_busy_time, available_time),
            max_wait_time: totals.max_wait,
            observed_mean_service_time,
            coefficient_of_variation,
            total_busy_time,
            available_time,
            wait_times: self.state.wait_times,
            service_times: self.state.service_times,
        }
    }
}

pub fn simulate(params: &SimulationParameters) -> Result<SimulationResult> {
    let engine = SimulationEngine::new(params.clone())?;
    Ok(engine.run())
}

/// Expected arrival count, capped so extreme rates cannot overflow the
/// allocator.
fn sample_capacity(params: &SimulationParameters) -> usize {
    // `as` saturates on overflow and maps NaN to 0.
    ((params.arrival_rate * params.horizon_hours).ceil() as usize).min(MAX_PREALLOCATED_SAMPLES)
}

/// Inverse-transform draw with mean `1 / rate`.
fn sample_exponential(rng: &mut StdRng, rate: f64) -> f64 {
    let mut u = rng.gen::<f64>();
    if u <= f64::MIN_POSITIVE {
        u = f64::MIN_POSITIVE;
    }
    -u.ln() / rate
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn coefficient_of_variation(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = samples
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn params(arrival_rate: f64, service_rate: f64, servers: u32, hours: f64) -> SimulationParameters {
        SimulationParameters {
            arrival_rate,
            service_rate,
            servers,
            horizon_hours: hours,
            seed: Some(42),
        }
    }

    #[test]
    fn seeded_runs_are_identical() {
        let config = params(10.0, 4.0, 3, 20.0);
        let first = simulate(&config).expect("simulation should succeed");
        let second = simulate(&config).expect("simulation should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut config = params(10.0, 4.0, 3, 20.0);
        let first = simulate(&config).expect("simulation should succeed");
        config.seed = Some(7);
        let second = simulate(&config).expect("simulation should succeed");
        assert_ne!(first.wait_times, second.wait_times);
    }

    #[test]
    fn samples_are_bounded_by_patients_served() {
        let result = simulate(&params(10.0, 4.0, 3, 20.0)).expect("simulation should succeed");
        assert!(result.patients_served > 0);
        assert_eq!(result.wait_times.len() as u64, result.patients_served);
        assert_eq!(result.service_times.len() as u64, result.patients_served);
    }

    #[test]
    fn utilization_comes_from_simulated_service() {
        let result = simulate(&params(10.0, 4.0, 3, 20.0)).expect("simulation should succeed");
        let busy: f64 = result.service_times.iter().sum();
        assert!((result.total_busy_time - busy).abs() <= 1e-9 * busy);
        assert!((result.utilization - result.total_busy_time / 60.0).abs() < 1e-12);
        assert_eq!(result.available_time, 60.0);
    }

    #[test]
    fn busy_time_is_tracked_per_server() {
        let mut engine =
            SimulationEngine::new(params(10.0, 4.0, 3, 20.0)).expect("valid parameters");
        for (id, server_id) in [(1, 0), (2, 2), (3, 0)] {
            let patient = Patient {
                id,
                arrival_time: 0.0,
            };
            engine.start_service(server_id, patient, 0.0);
        }
        let service = engine.state.service_times.clone();
        let servers = &engine.state.servers;
        assert_eq!(servers[0].busy_time, service[0] + service[2]);
        assert_eq!(servers[1].busy_time, 0.0);
        assert_eq!(servers[2].busy_time, service[1]);
        assert!((engine.state.busy_time() - engine.state.totals.total_service).abs() < 1e-12);
    }

    #[test]
    fn preallocation_is_capped() {
        assert_eq!(sample_capacity(&params(10.0, 4.0, 3, 20.0)), 200);
        assert_eq!(
            sample_capacity(&params(1e12, 4.0, 3, 1e6)),
            MAX_PREALLOCATED_SAMPLES
        );
        let engine = SimulationEngine::new(params(1e12, 4.0, 3, 1e6)).expect("valid parameters");
        assert!(engine.state.wait_times.capacity() >= MAX_PREALLOCATED_SAMPLES);
        assert!(engine.state.wait_times.capacity() < 2 * MAX_PREALLOCATED_SAMPLES);
    }

    #[test]
    fn ample_servers_mean_no_waiting() {
        let result = simulate(&params(5.0, 1.0, 200, 10.0)).expect("simulation should succeed");
        assert!(result.patients_served > 0);
        assert_eq!(result.avg_wait_time, 0.0);
        assert_eq!(result.max_wait_time, 0.0);
        assert_eq!(result.avg_queue_length, 0.0);
        assert_eq!(result.coefficient_of_variation, 0.0);
    }

    #[test]
    fn max_wait_bounds_average_wait() {
        let result = simulate(&params(12.0, 4.0, 3, 50.0)).expect("simulation should succeed");
        let observed_max = result.wait_times.iter().cloned().fold(0.0, f64::max);
        assert_eq!(result.max_wait_time, observed_max);
        assert!(result.avg_wait_time <= result.max_wait_time);
    }

    #[test]
    fn queue_area_matches_total_wait() {
        let result = simulate(&params(11.0, 4.0, 3, 40.0)).expect("simulation should succeed");
        let total_wait: f64 = result.wait_times.iter().sum();
        let area = result.avg_queue_length * result.horizon_hours;
        assert!((area - total_wait).abs() <= 1e-6 * total_wait.max(1.0));
    }

    #[test]
    fn empty_horizon_yields_zeroes() {
        let result =
            simulate(&params(1e-9, 4.0, 2, 1e-3)).expect("simulation should succeed");
        assert_eq!(result.patients_served, 0);
        assert_eq!(result.avg_wait_time, 0.0);
        assert_eq!(result.avg_queue_length, 0.0);
        assert_eq!(result.utilization, 0.0);
        assert_eq!(result.observed_mean_service_time, 0.0);
        assert_eq!(result.coefficient_of_variation, 0.0);
        assert!(result.wait_times.is_empty());
    }

    #[test]
    fn invalid_parameters_fail_before_running() {
        assert!(matches!(
            simulate(&params(10.0, 4.0, 0, 10.0)),
            Err(Error::InvalidServerCount(0))
        ));
        assert!(matches!(
            simulate(&params(10.0, 0.0, 1, 10.0)),
            Err(Error::InvalidServiceRate(_))
        ));
        assert!(matches!(
            simulate(&params(10.0, 4.0, 1, -1.0)),
            Err(Error::InvalidHorizon(_))
        ));
    }

    #[test]
    fn coefficient_of_variation_is_population_based() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        let cv = coefficient_of_variation(&[1.0, 3.0]);
        assert!((cv - 0.5).abs() < 1e-12);
    }
}
