// ==============================================================================
// context.rs - ONE FIXED-STEP TICK (POWERTRAIN → SUSPENSION → CHASSIS)
// ==============================================================================
// SimulationContext owns the ParameterSet and every piece of mutable vehicle
// state. Nothing else holds simulation state; the loop owns exactly one
// context and calls tick() once per fixed_dt slice.
//
// A tick works on copies. Each stage's output is checked for NaN/Inf before
// the next stage reads it, and the copies are committed only when all three
// stages succeeded, so a rejected tick leaves the last good state untouched.
// ==============================================================================

use crate::error::{SimError, Stage, check_finite};
use crate::vehicle::params::ParameterSet;
use crate::vehicle::types::{
    ChassisState, ControlInput, CornerState, EngineState, Telemetry, VehicleState, WheelId,
};
use crate::vehicle::{chassis, powertrain, suspension, tire};

#[derive(Debug, Clone)]
pub struct SimulationContext {
    params: ParameterSet,
    engine: EngineState,
    corners: [CornerState; 4],
    chassis: ChassisState,
    telemetry: Telemetry,
    tick: u64,
    time: f64,
}

fn corner_quantities(id: WheelId) -> [&'static str; 3] {
    match id {
        WheelId::FL => ["fl.compression", "fl.compression_velocity", "fl.normal_load"],
        WheelId::FR => ["fr.compression", "fr.compression_velocity", "fr.normal_load"],
        WheelId::RL => ["rl.compression", "rl.compression_velocity", "rl.normal_load"],
        WheelId::RR => ["rr.compression", "rr.compression_velocity", "rr.normal_load"],
    }
}

impl SimulationContext {
    /// Validates `params` and builds a vehicle parked at the origin, engine
    /// idling in first gear, suspension at static sag.
    pub fn new(params: ParameterSet) -> Result<Self, SimError> {
        params.validate()?;
        Ok(Self::initial(params))
    }

    fn initial(params: ParameterSet) -> Self {
        Self {
            engine: EngineState::idle(params.idle_rpm),
            corners: suspension::rest(&params),
            chassis: ChassisState::default(),
            telemetry: Telemetry::default(),
            tick: 0,
            time: 0.0,
            params,
        }
    }

    /// Skips validation so tests can drive the integrator into a fault.
    #[cfg(test)]
    pub(crate) fn new_unchecked(params: ParameterSet) -> Self {
        Self::initial(params)
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Current state as a publishable snapshot.
    pub fn state(&self) -> VehicleState {
        VehicleState {
            tick: self.tick,
            time: self.time,
            engine: self.engine,
            corners: self.corners,
            chassis: self.chassis,
            telemetry: self.telemetry,
        }
    }

    /// Advances one fixed_dt slice. On a NumericFault nothing is committed.
    pub fn tick(&mut self, input: &ControlInput) -> Result<VehicleState, SimError> {
        let input = input.clamped();
        let params = &self.params;
        let dt = params.fixed_dt;
        let tick = self.tick + 1;
        let time = self.time;

        // 1) Powertrain
        let mut engine = self.engine;
        let drive = powertrain::step(&mut engine, params, &self.chassis, &input, dt);
        check_finite(
            Stage::Powertrain,
            tick,
            time,
            &[
                ("rpm", engine.rpm),
                ("clutch", engine.clutch),
                ("drive_force", drive.drive_force),
            ],
        )?;

        // 2) Suspension (reads last tick's acceleration)
        let mut corners = self.corners;
        let total_load = suspension::step(&mut corners, &self.chassis, params, dt);
        for id in WheelId::ALL {
            let c = &corners[id.index()];
            let [x, v, n] = corner_quantities(id);
            check_finite(
                Stage::Suspension,
                tick,
                time,
                &[(x, c.compression), (v, c.compression_velocity), (n, c.normal_load)],
            )?;
        }
        check_finite(Stage::Suspension, tick, time, &[("total_normal_load", total_load)])?;

        // 3) Chassis
        let mut body = self.chassis;
        let loads = corners.map(|c| c.normal_load);
        let forces = chassis::step(&mut body, drive.drive_force, &loads, input.steer, params, dt);
        check_finite(
            Stage::Chassis,
            tick,
            time,
            &[
                ("position.x", body.position.x),
                ("position.y", body.position.y),
                ("velocity.x", body.velocity.x),
                ("velocity.y", body.velocity.y),
                ("yaw_rate", body.yaw_rate),
                ("heading", body.heading),
                ("accel.long", body.prev_accel.x),
                ("accel.lat", body.prev_accel.y),
            ],
        )?;

        // commit
        let travelled = (body.position - self.chassis.position).norm();
        let wear = tire::wear_rate(forces.slip_front, forces.slip_rear, input.brake, self.chassis.speed());
        self.telemetry = Telemetry {
            drive_force: forces.longitudinal,
            drag_force: forces.drag,
            rolling_resistance: forces.rolling,
            lateral_front: forces.lateral_front,
            lateral_rear: forces.lateral_rear,
            steer_angle: forces.steer_angle,
            distance: self.telemetry.distance + travelled,
            fuel_rate: powertrain::fuel_rate(drive.engine_power),
            tire_wear: (self.telemetry.tire_wear + wear * dt).min(100.0),
        };
        self.engine = engine;
        self.corners = corners;
        self.chassis = body;
        self.tick = tick;
        self.time += dt as f64;

        Ok(self.state())
    }
}
