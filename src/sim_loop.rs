// ==============================================================================
// sim_loop.rs - FIXED-TIMESTEP DRIVER + LIFECYCLE STATE MACHINE
// ==============================================================================
//
//     Idle ──start──▶ Running ──pause──▶ Paused
//                       ▲   ◀──resume──    │
//                       │                  │
//     Stopped ◀──stop───┴──────stop────────┘
//        └──start (fresh context)──▶ Running
//
// advance() adds real elapsed time to an accumulator and consumes it in
// fixed_dt slices. The fractional remainder carries over to the next call.
// At most max_steps_per_poll slices run per call; whole slices beyond that
// are dropped so a stalled caller never triggers a catch-up burst.
//
// Every successful slice publishes a fresh Arc<VehicleState>. Readers holding
// an older Arc keep a complete snapshot; nothing is mutated after publication.
// ==============================================================================

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::context::SimulationContext;
use crate::error::{FaultRecord, SimError};
use crate::vehicle::params::ParameterSet;
use crate::vehicle::types::{ControlInput, ShiftRequest, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Paused => "paused",
            LoopState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// What one advance() call did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollReport {
    pub steps: u32,
    /// Real time (s) discarded by the step cap.
    pub dropped_time: f64,
}

pub struct SimulationLoop {
    state: LoopState,
    context: Option<SimulationContext>,
    accumulator: f64,
    current: Option<Arc<VehicleState>>,
    previous: Option<Arc<VehicleState>>,
    fault: Option<FaultRecord>,
}

impl Default for SimulationLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            context: None,
            accumulator: 0.0,
            current: None,
            previous: None,
            fault: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Diagnostic left by the last NumericFault, cleared by start().
    pub fn fault(&self) -> Option<&FaultRecord> {
        self.fault.as_ref()
    }

    pub fn params(&self) -> Option<&ParameterSet> {
        self.context.as_ref().map(|c| c.params())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Option<Arc<VehicleState>> {
        self.current.clone()
    }

    /// Snapshot published one tick before [`snapshot`](Self::snapshot).
    pub fn previous_snapshot(&self) -> Option<Arc<VehicleState>> {
        self.previous.clone()
    }

    /// Fraction of a fixed step left in the accumulator (0..1), for render
    /// interpolation between the previous and current snapshot.
    pub fn alpha(&self) -> f32 {
        match &self.context {
            Some(ctx) => (self.accumulator / ctx.params().fixed_dt as f64).clamp(0.0, 1.0) as f32,
            None => 0.0,
        }
    }

    fn refuse(&self, op: &'static str) -> SimError {
        SimError::InvalidTransition { from: self.state, op }
    }

    // -------------------------
    // LIFECYCLE
    // -------------------------

    /// Validates `params` and (re)initialises every piece of state.
    pub fn start(&mut self, params: ParameterSet) -> Result<(), SimError> {
        if !matches!(self.state, LoopState::Idle | LoopState::Stopped) {
            return Err(self.refuse("start"));
        }

        let ctx = SimulationContext::new(params)?;
        self.install(ctx);

        println!(
            "🏁 Simulation started (dt={:.4}s, max {} steps/poll)",
            self.params().map_or(0.0, |p| p.fixed_dt),
            self.params().map_or(0, |p| p.max_steps_per_poll),
        );
        Ok(())
    }

    fn install(&mut self, ctx: SimulationContext) {
        let first = Arc::new(ctx.state());
        self.previous = Some(Arc::clone(&first));
        self.current = Some(first);
        self.context = Some(ctx);
        self.accumulator = 0.0;
        self.fault = None;
        self.state = LoopState::Running;
    }

    pub fn pause(&mut self) -> Result<(), SimError> {
        match self.state {
            LoopState::Running => {
                self.state = LoopState::Paused;
                Ok(())
            }
            _ => Err(self.refuse("pause")),
        }
    }

    pub fn resume(&mut self) -> Result<(), SimError> {
        match self.state {
            LoopState::Paused => {
                self.state = LoopState::Running;
                Ok(())
            }
            _ => Err(self.refuse("resume")),
        }
    }

    pub fn stop(&mut self) -> Result<(), SimError> {
        match self.state {
            LoopState::Running | LoopState::Paused => {
                self.state = LoopState::Stopped;
                self.accumulator = 0.0;
                let tick = self.current.as_ref().map_or(0, |s| s.tick);
                println!("🛑 Simulation stopped at tick {tick}");
                Ok(())
            }
            _ => Err(self.refuse("stop")),
        }
    }

    // -------------------------
    // STEPPING
    // -------------------------

    /// Feeds `elapsed` real time into the accumulator and runs as many fixed
    /// slices as it covers, up to the step cap. No-op unless Running.
    pub fn advance(&mut self, elapsed: Duration, input: ControlInput) -> PollReport {
        let mut report = PollReport::default();
        if self.state != LoopState::Running {
            return report;
        }
        let Some(ctx) = self.context.as_mut() else {
            return report;
        };

        let dt = ctx.params().fixed_dt as f64;
        let max_steps = ctx.params().max_steps_per_poll;
        self.accumulator += elapsed.as_secs_f64();

        // a shift request applies once per poll, on its first slice
        let mut input = input;

        while self.accumulator >= dt && report.steps < max_steps {
            match ctx.tick(&input) {
                Ok(state) => {
                    let fresh = Arc::new(state);
                    self.previous = mem::replace(&mut self.current, Some(fresh));
                }
                Err(err) => {
                    eprintln!("💥 Simulation halted: {err}");
                    if let SimError::NumericFault(record) = err {
                        self.fault = Some(record);
                    }
                    self.state = LoopState::Stopped;
                    self.accumulator = 0.0;
                    return report;
                }
            }

            self.accumulator -= dt;
            report.steps += 1;
            input.shift = ShiftRequest::None;
        }

        // step cap hit: drop whole slices, keep the fraction
        if self.accumulator >= dt {
            let dropped = (self.accumulator / dt).floor() * dt;
            self.accumulator -= dropped;
            report.dropped_time = dropped;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt() -> f64 {
        ParameterSet::gt86().fixed_dt as f64
    }

    fn running() -> SimulationLoop {
        let mut sim = SimulationLoop::new();
        sim.start(ParameterSet::gt86()).unwrap();
        sim
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut sim = SimulationLoop::new();
        assert_eq!(sim.state(), LoopState::Idle);
        assert!(sim.snapshot().is_none());

        assert_eq!(
            sim.pause(),
            Err(SimError::InvalidTransition { from: LoopState::Idle, op: "pause" })
        );
        assert!(sim.stop().is_err());

        sim.start(ParameterSet::gt86()).unwrap();
        assert_eq!(sim.state(), LoopState::Running);
        assert!(sim.start(ParameterSet::gt86()).is_err());
        assert!(sim.resume().is_err());

        sim.pause().unwrap();
        assert_eq!(sim.state(), LoopState::Paused);
        assert!(sim.pause().is_err());
        sim.resume().unwrap();
        sim.stop().unwrap();
        assert_eq!(sim.state(), LoopState::Stopped);
        assert!(sim.resume().is_err());

        // stopped → fresh run
        sim.start(ParameterSet::urus()).unwrap();
        assert_eq!(sim.state(), LoopState::Running);
        assert_eq!(sim.snapshot().unwrap().tick, 0);
    }

    #[test]
    fn test_fractional_time_carries_over() {
        let mut sim = running();
        let half = Duration::from_secs_f64(dt() * 0.6);

        assert_eq!(sim.advance(half, ControlInput::default()).steps, 0);
        assert!(sim.alpha() > 0.5);
        assert_eq!(sim.advance(half, ControlInput::default()).steps, 1);
        assert!(sim.alpha() < 0.5);
    }

    #[test]
    fn test_step_cap_drops_excess_time() {
        let mut sim = running();
        let report = sim.advance(Duration::from_secs(1), ControlInput::default());

        assert_eq!(report.steps, 8);
        assert!(report.dropped_time > 0.9);
        assert_eq!(sim.state(), LoopState::Running);
        assert!(sim.alpha() < 1.0);

        let next = sim.advance(Duration::ZERO, ControlInput::default());
        assert_eq!(next.steps, 0);
    }

    #[test]
    fn test_advance_is_noop_when_not_running() {
        let mut sim = SimulationLoop::new();
        let report = sim.advance(Duration::from_secs(1), ControlInput::default());
        assert_eq!(report, PollReport::default());

        let mut sim = running();
        sim.pause().unwrap();
        let report = sim.advance(Duration::from_secs(1), ControlInput::new(1.0, 0.0, 0.0));
        assert_eq!(report.steps, 0);
        assert_eq!(sim.snapshot().unwrap().tick, 0);
    }

    #[test]
    fn test_publication_replaces_snapshot() {
        let mut sim = running();
        let held = sim.snapshot().unwrap();

        sim.advance(Duration::from_secs_f64(dt() * 2.5), ControlInput::new(1.0, 0.0, 0.0));

        let now = sim.snapshot().unwrap();
        let prev = sim.previous_snapshot().unwrap();
        assert_eq!(held.tick, 0, "held snapshot must not change");
        assert_eq!(now.tick, 2);
        assert_eq!(prev.tick, 1);
        assert!(!Arc::ptr_eq(&held, &now));
    }

    #[test]
    fn test_shift_request_applies_once_per_poll() {
        let mut params = ParameterSet::gt86();
        params.transmission = crate::vehicle::params::Transmission::Manual;
        let mut sim = SimulationLoop::new();
        sim.start(params).unwrap();

        let up = ControlInput { shift: ShiftRequest::Up, ..Default::default() };
        sim.advance(Duration::from_secs_f64(dt() * 4.5), up);
        assert_eq!(sim.snapshot().unwrap().engine.gear, 1);
    }

    #[test]
    fn test_numeric_fault_stops_loop() {
        let params = ParameterSet { yaw_inertia: 0.0, ..ParameterSet::gt86() };
        let mut sim = SimulationLoop::new();
        sim.install(SimulationContext::new_unchecked(params));

        let report = sim.advance(Duration::from_secs_f64(dt() * 3.5), ControlInput::default());

        assert_eq!(report.steps, 0);
        assert_eq!(sim.state(), LoopState::Stopped);
        let fault = sim.fault().unwrap();
        assert_eq!(fault.tick, 1);
        // the last good state is still what readers see
        assert_eq!(sim.snapshot().unwrap().tick, 0);

        sim.start(ParameterSet::gt86()).unwrap();
        assert!(sim.fault().is_none());
    }

    #[test]
    fn test_start_rejects_invalid_params() {
        let mut sim = SimulationLoop::new();
        let bad = ParameterSet { gear_ratios: Vec::new(), ..ParameterSet::gt86() };
        assert!(matches!(sim.start(bad), Err(SimError::InvalidParameter { .. })));
        assert_eq!(sim.state(), LoopState::Idle);
    }
}
