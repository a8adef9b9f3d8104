// ==============================================================================
// powertrain.rs - ENGINE + GEARBOX + BRAKE (LONGITUDINAL DRIVE FORCE)
// ==============================================================================
// Computes the net longitudinal force at the driven contact patches using:
// 1) Engine RPM derived from wheel speed (never integrated on its own, so it
//    cannot drift away from the chassis)
// 2) Clutch slip near standstill: RPM chases idle + throttle·(launch - idle)
// 3) Gear selection (manual request first, then automatic thresholds)
// 4) Torque lookup × throttle × overall ratio × efficiency / wheel radius
// 5) Brake force opposing motion, clamped so one tick can at most stop the
//    wheel (it never pushes the car backwards)
//
// Important properties:
// - Pure function of (EngineState, chassis speed, input, dt).
// - Output is always finite for a validated ParameterSet.
// ==============================================================================

use crate::vehicle::params::{ParameterSet, Transmission};
use crate::vehicle::types::{ChassisState, ControlInput, EngineState, ShiftRequest};

/// rad/s → rev/min
const RAD_S_TO_RPM: f32 = 60.0 / (2.0 * std::f32::consts::PI);

/// Clutch-slip RPM time constant (s).
const CLUTCH_TAU: f32 = 0.1;

/// Brake-specific fuel consumption (g/kWh).
pub const SPECIFIC_FUEL_CONSUMPTION: f32 = 230.0;

/// Below this wheel speed (m/s) the brake holds instead of decelerating.
const STANDSTILL_SPEED: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowertrainOutput {
    /// Net longitudinal force at the wheels (N), engine + brake.
    pub drive_force: f32,
    pub engine_force: f32,
    pub brake_force: f32,
    /// Crankshaft power (W): delivered torque × engine speed.
    pub engine_power: f32,
    pub shifted: bool,
}

/// Engine speed for `gear` given wheel angular speed.
/// Returns (rpm, clutch engagement, rpm derived purely from the wheels).
fn engine_speed(
    params: &ParameterSet,
    gear: usize,
    wheel_omega: f32,
    throttle: f32,
    prev_rpm: f32,
    dt: f32,
) -> (f32, f32, f32) {
    let derived = wheel_omega.abs() * params.overall_ratio(gear) * RAD_S_TO_RPM;
    let slip_target = params.idle_rpm + throttle * (params.launch_rpm - params.idle_rpm);

    if derived >= slip_target {
        return (derived.clamp(params.idle_rpm, params.redline_rpm), 1.0, derived);
    }

    // clutch slipping: RPM relaxes toward the slip target
    let blend = 1.0 - (-dt / CLUTCH_TAU).exp();
    let rpm = prev_rpm + (slip_target - prev_rpm) * blend;
    let clutch = (derived / slip_target.max(1.0)).clamp(0.0, 1.0);

    (rpm.clamp(params.idle_rpm, params.redline_rpm), clutch, derived)
}

/// Fuel mass flow (g/s) at a given crankshaft power (W).
pub fn fuel_rate(engine_power: f32) -> f32 {
    engine_power.max(0.0) / 1000.0 * SPECIFIC_FUEL_CONSUMPTION / 3600.0
}

pub fn step(
    engine: &mut EngineState,
    params: &ParameterSet,
    chassis: &ChassisState,
    input: &ControlInput,
    dt: f32,
) -> PowertrainOutput {
    let throttle = input.throttle.clamp(0.0, 1.0);
    let brake = input.brake.clamp(0.0, 1.0);
    let top_gear = params.gear_ratios.len() - 1;

    let (v_long, _) = chassis.local_velocity();
    let wheel_omega = v_long / params.wheel_radius;

    // -------------------------
    // GEAR SELECTION
    // -------------------------
    let mut gear = engine.gear.min(top_gear);
    let mut shifted = false;

    match input.shift {
        ShiftRequest::Up if gear < top_gear => {
            gear += 1;
            shifted = true;
        }
        ShiftRequest::Down if gear > 0 => {
            gear -= 1;
            shifted = true;
        }
        _ => {}
    }

    let (mut rpm, mut clutch, mut derived) =
        engine_speed(params, gear, wheel_omega, throttle, engine.rpm, dt);

    if !shifted && params.transmission == Transmission::Automatic {
        if derived > params.upshift_rpm && gear < top_gear {
            gear += 1;
            shifted = true;
        } else if derived < params.downshift_rpm && gear > 0 {
            gear -= 1;
            shifted = true;
        }

        // one-tick recalculation from the new ratio and current wheel speed
        if shifted {
            (rpm, clutch, derived) =
                engine_speed(params, gear, wheel_omega, throttle, engine.rpm, dt);
        }
    }

    // -------------------------
    // ENGINE FORCE
    // -------------------------
    // rev limiter: no drive torque at or above redline
    let torque = if derived >= params.redline_rpm {
        0.0
    } else {
        params.torque_curve.torque_at(rpm) * throttle
    };

    let engine_force = torque * params.overall_ratio(gear) * params.drivetrain_efficiency
        / params.wheel_radius;

    // -------------------------
    // BRAKE
    // -------------------------
    // Brake opposes wheel motion; at standstill it holds against the engine.
    let dir = if v_long.abs() > STANDSTILL_SPEED {
        v_long.signum()
    } else if engine_force != 0.0 {
        engine_force.signum()
    } else {
        0.0
    };

    // force that brings the wheel speed to exactly zero this tick
    let to_stop = (params.mass * v_long.abs() / dt + engine_force * dir).max(0.0);
    let brake_force = -dir * (brake * params.max_brake_force).min(to_stop);

    engine.gear = gear;
    engine.rpm = rpm;
    engine.clutch = clutch;

    PowertrainOutput {
        drive_force: engine_force + brake_force,
        engine_force,
        brake_force,
        engine_power: torque * rpm / RAD_S_TO_RPM,
        shifted,
    }
}
