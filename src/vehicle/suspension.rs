// ==============================================================================
// suspension.rs - PER-CORNER SPRING/DAMPER + LOAD TRANSFER
// ------------------------------------------------------------------------------
// Each corner is a damped spring carrying its share of the sprung mass:
//
//     m_c · x'' = F_target - k·x - c·x'
//     F_n       = max(k·x + c·x', 0)        (a wheel cannot pull the body down)
//
// F_target is the static share plus the load transfer produced by the chassis
// acceleration of the PREVIOUS tick (ChassisState::prev_accel):
// - longitudinal: m·a_long·h / L moves from front to rear under acceleration
// - lateral:      m·a_lat·h / T moves from the inside to the outside corners,
//                 split between axles by static weight distribution
//
// Load transfer lags the chassis by exactly one tick; chassis and suspension
// are never solved simultaneously.
//
// Compression x is measured from the spring's free length, so a car at rest
// sits at x = F_static / k with F_n equal to its static share.
// ==============================================================================

use crate::vehicle::params::ParameterSet;
use crate::vehicle::types::{ChassisState, CornerState, WheelId};

/// Corners at static equilibrium (no bounce on the first tick).
pub fn rest(params: &ParameterSet) -> [CornerState; 4] {
    WheelId::ALL.map(|id| {
        let load = params.static_corner_load(id);
        CornerState {
            compression: load / params.suspension_stiffness[id.index()],
            compression_velocity: 0.0,
            normal_load: load,
        }
    })
}

/// Load each corner is being pushed toward this tick (N, ≥ 0).
pub fn target_loads(params: &ParameterSet, chassis: &ChassisState) -> [f32; 4] {
    let a_long = chassis.prev_accel.x;
    let a_lat = chassis.prev_accel.y;

    let long_shift = params.mass * a_long * params.cg_height / params.wheelbase;
    let lat_shift = params.mass * a_lat * params.cg_height / params.track_width;
    let ff = params.front_weight_fraction;

    WheelId::ALL.map(|id| {
        let long = if id.is_front() { -0.5 * long_shift } else { 0.5 * long_shift };
        let axle = if id.is_front() { ff } else { 1.0 - ff };
        // positive a_lat = accelerating to the left → load moves right
        let lat = if id.is_left() { -axle * lat_shift } else { axle * lat_shift };

        (params.static_corner_load(id) + long + lat).max(0.0)
    })
}

#[inline]
pub(crate) fn spring_damper_load(compression: f32, velocity: f32, k: f32, c: f32) -> f32 {
    let spring = k * compression;
    let damper = c * velocity;
    (spring + damper).max(0.0)
}

/// Advances all four corners; returns the total normal load (N).
pub fn step(
    corners: &mut [CornerState; 4],
    chassis: &ChassisState,
    params: &ParameterSet,
    dt: f32,
) -> f32 {
    let targets = target_loads(params, chassis);
    let mut total = 0.0;

    for id in WheelId::ALL {
        let i = id.index();
        let k = params.suspension_stiffness[i];
        let c = params.suspension_damping[i];
        let m = params.corner_mass(id);
        let corner = &mut corners[i];

        // semi-implicit Euler: velocity first, then position with the new velocity
        let accel = (targets[i] - k * corner.compression - c * corner.compression_velocity) / m;
        corner.compression_velocity += accel * dt;
        corner.compression += corner.compression_velocity * dt;

        corner.normal_load =
            spring_damper_load(corner.compression, corner.compression_velocity, k, c);
        total += corner.normal_load;
    }

    total
}
