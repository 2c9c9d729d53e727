use std::collections::VecDeque;

use serde::Serialize;

use crate::events::Patient;

#[derive(Clone, Debug, Default)]
pub struct ServerState {
    pub id: usize,
    pub serving: Option<usize>,
    /// Hours of service started on this server.
    pub busy_time: f64,
}

/// Running totals for one `simulate` call. Dropped when the call returns.
#[derive(Clone, Debug, Default)]
pub struct Accumulators {
    pub arrivals: u64,
    pub served: u64,
    pub total_wait: f64,
    pub total_service: f64,
    pub max_wait: f64,
    /// Integral of queue length over time.
    pub queue_area: f64,
    pub last_event_time: f64,
}

#[derive(Clone, Debug, Default)]
pub struct EngineState {
    pub servers: Vec<ServerState>,
    pub waiting: VecDeque<Patient>,
    pub totals: Accumulators,
    pub wait_times: Vec<f64>,
    pub service_times: Vec<f64>,
}

impl EngineState {
    pub fn new(servers: usize) -> Self {
        Self {
            servers: (0..servers)
                .map(|id| ServerState {
                    id,
                    ..ServerState::default()
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn busy_time(&self) -> f64 {
        self.servers.iter().map(|server| server.busy_time).sum()
    }

    pub fn idle_server(&self) -> Option<usize> {
        self.servers
            .iter()
            .find(|server| server.serving.is_none())
            .map(|server| server.id)
    }

    /// Accrues queue area up to `now`.
    pub fn advance_to(&mut self, now: f64) {
        let elapsed = now - self.totals.last_event_time;
        if elapsed > 0.0 {
            self.totals.queue_area += self.waiting.len() as f64 * elapsed;
            self.totals.last_event_time = now;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub servers: u32,
    pub horizon_hours: f64,
    pub patients_served: u64,
    pub observed_arrival_rate: f64,
    pub avg_wait_time: f64,
    pub avg_queue_length: f64,
    pub utilization: f64,
    pub max_wait_time: f64,
    pub observed_mean_service_time: f64,
    pub coefficient_of_variation: f64,
    pub total_busy_time: f64,
    pub available_time: f64,
    pub wait_times: Vec<f64>,
    pub service_times: Vec<f64>,
}
