// ==============================================================================
// chassis.rs - PLANAR RIGID-BODY INTEGRATION (BICYCLE MODEL)
// ==============================================================================
// Forces in the body frame (x forward, y left), front axle steered by δ:
//
//     F_long = Fx - Fy_f·sin δ
//     F_lat  = Fy_f·cos δ + Fy_r
//     M_z    = a·Fy_f·cos δ - b·Fy_r
//
// plus aerodynamic drag (½·ρ·Cd·A·v²) and rolling resistance (Crr·ΣN), both
// opposing the world velocity and capped so they can bring the car to rest
// but never push it backwards.
//
// Integration is semi-implicit Euler:
//     v += (F/m)·dt ;  p += v·dt
//     r += (M_z/Iz)·dt ;  ψ += r·dt
//
// Opposing forces never reverse the body-frame longitudinal velocity: a tick
// whose brake plus resistance would carry it through zero ends at zero.
//
// Residue handling: speed and yaw rate snap to exactly zero once they fall
// below their epsilon while decaying, so a coasting car actually stops.
// ==============================================================================

use std::f32::consts::PI;

use crate::vehicle::params::{AIR_DENSITY, ParameterSet};
use crate::vehicle::tire;
use crate::vehicle::types::{ChassisState, Vec2};

/// m/s
pub const SPEED_EPSILON: f32 = 1e-3;
/// rad/s
pub const YAW_EPSILON: f32 = 1e-4;

/// Forces actually applied this tick (after the friction ellipse).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChassisForces {
    pub longitudinal: f32,
    pub lateral_front: f32,
    pub lateral_rear: f32,
    pub drag: f32,
    pub rolling: f32,
    pub steer_angle: f32,
    pub slip_front: f32,
    pub slip_rear: f32,
}

/// Road-wheel angle (rad) for a steering sample, reduced at speed.
pub fn effective_steer_angle(params: &ParameterSet, steering: f32, speed: f32) -> f32 {
    let authority = (1.0 - speed / params.steer_fade_speed).clamp(0.35, 1.0);
    steering.clamp(-1.0, 1.0) * params.steering_limit * authority
}

fn wrap_angle(a: f32) -> f32 {
    let mut a = a % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

pub fn step(
    chassis: &mut ChassisState,
    drive_force: f32,
    normal_loads: &[f32; 4],
    steering: f32,
    params: &ParameterSet,
    dt: f32,
) -> ChassisForces {
    let m = params.mass;
    let speed = chassis.speed();
    let forward = chassis.forward();
    let left = chassis.left();
    let (v_long, v_lat) = chassis.local_velocity();

    let n_front = normal_loads[0] + normal_loads[1];
    let n_rear = normal_loads[2] + normal_loads[3];

    // -------------------------
    // TIRE FORCES
    // -------------------------
    let delta = effective_steer_angle(params, steering, speed);
    let axle = tire::lateral_forces(
        params,
        v_long,
        v_lat,
        chassis.yaw_rate,
        delta,
        n_front,
        n_rear,
    );

    let cap = params.tire_friction * (n_front + n_rear);
    let (fx, fy_front, fy_rear) = tire::friction_ellipse(drive_force, axle.front, axle.rear, cap);

    let (sin_d, cos_d) = delta.sin_cos();
    let f_long = fx - fy_front * sin_d;
    let f_lat = fy_front * cos_d + fy_rear;
    let yaw_torque =
        params.cg_to_front() * fy_front * cos_d - params.cg_to_rear() * fy_rear;

    // -------------------------
    // RESISTANCE
    // -------------------------
    let drag = 0.5 * AIR_DENSITY * params.drag_coefficient * params.frontal_area * speed * speed;
    let rolling = params.rolling_resistance * (n_front + n_rear);

    let resist = if speed > 0.0 {
        // at most the force that stops the car this tick
        let magnitude = (drag + rolling).min(m * speed / dt);
        -chassis.velocity / speed * magnitude
    } else {
        Vec2::zeros()
    };

    // -------------------------
    // INTEGRATION
    // -------------------------
    let mut accel = (forward * f_long + left * f_lat + resist) / m;

    // Brake and resistance are each capped at a full stop, but together they
    // can still carry the wheel through zero. An opposing force stops it.
    let long_next = (chassis.velocity + accel * dt).dot(&forward);
    if long_next * v_long < 0.0 && fx * v_long <= 0.0 {
        accel -= forward * (long_next / dt);
    }

    chassis.velocity += accel * dt;
    chassis.position += chassis.velocity * dt;

    let new_speed = chassis.speed();
    if new_speed < SPEED_EPSILON && new_speed <= speed {
        chassis.velocity = Vec2::zeros();
    }

    let prev_yaw = chassis.yaw_rate;
    chassis.yaw_rate += yaw_torque / params.yaw_inertia * dt;
    if chassis.yaw_rate.abs() < YAW_EPSILON && chassis.yaw_rate.abs() <= prev_yaw.abs() {
        chassis.yaw_rate = 0.0;
    }
    chassis.heading = wrap_angle(chassis.heading + chassis.yaw_rate * dt);

    // read by the suspension on the next tick
    chassis.prev_accel = Vec2::new(accel.dot(&forward), accel.dot(&left));

    ChassisForces {
        longitudinal: fx,
        lateral_front: fy_front,
        lateral_rear: fy_rear,
        drag,
        rolling: if speed > 0.0 { rolling } else { 0.0 },
        steer_angle: delta,
        slip_front: axle.slip_front,
        slip_rear: axle.slip_rear,
    }
}
