// ==============================================================================
// tire.rs - SATURATING LATERAL TIRE MODEL + COMBINED-SLIP ELLIPSE
// ==============================================================================
// Per-axle lateral force from a slip proxy instead of a full slip-angle curve:
//
//     travel_f = (v_lat + a·r) / v_ref        (direction the front axle moves)
//     travel_r = (v_lat - b·r) / v_ref
//     slip_f   = clamp((δ·fade - travel_f) / α_sat, -1, 1)
//     slip_r   = clamp((   -travel_r)      / α_sat, -1, 1)
//     Fy_axle  = μ · N_axle · slip_axle
//
// - v_ref = max(|v_long|, LOW_SPEED) keeps the proxy bounded at standstill.
// - fade ramps the steering term in from rest so a parked car does not slide
//   sideways when the wheel is turned.
// - |Fy_axle| ≤ μ·N_axle: once the proxy saturates the axle slides instead of
//   producing more cornering force.
//
// friction_ellipse() then caps drive/brake force and lateral force together
// against μ·ΣN, scaling all three by the same factor.
//
// wear_rate() turns the same slip proxy into tread loss: an axle scrubs once
// |slip| passes SCRUB_ONSET, and braking wears the tread while rolling.
// ==============================================================================

use crate::vehicle::params::ParameterSet;

/// m/s; below this the slip proxy uses a fixed reference speed.
pub const LOW_SPEED: f32 = 2.0;

/// Slip proxy magnitude where the tread starts scrubbing.
const SCRUB_ONSET: f32 = 0.5;
/// %/s of tread lost by one fully saturated axle.
const SCRUB_WEAR: f32 = 0.5;
/// %/s of tread lost under full brake.
const BRAKE_WEAR: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxleForces {
    pub front: f32,       // N, +left, in the steered wheel frame
    pub rear: f32,        // N, +left
    pub slip_front: f32,  // proxy, -1..1
    pub slip_rear: f32,   // proxy, -1..1
}

pub fn lateral_forces(
    params: &ParameterSet,
    v_long: f32,
    v_lat: f32,
    yaw_rate: f32,
    steer_angle: f32,
    n_front: f32,
    n_rear: f32,
) -> AxleForces {
    let a = params.cg_to_front();
    let b = params.cg_to_rear();
    let sat = params.slip_saturation;

    let v_ref = v_long.abs().max(LOW_SPEED);
    let fade = (v_long.abs() / LOW_SPEED).min(1.0);

    let travel_front = (v_lat + a * yaw_rate) / v_ref;
    let travel_rear = (v_lat - b * yaw_rate) / v_ref;

    let slip_front = ((steer_angle * fade - travel_front) / sat).clamp(-1.0, 1.0);
    let slip_rear = (-travel_rear / sat).clamp(-1.0, 1.0);

    let mu = params.tire_friction;
    AxleForces {
        front: mu * n_front.max(0.0) * slip_front,
        rear: mu * n_rear.max(0.0) * slip_rear,
        slip_front,
        slip_rear,
    }
}

/// Scales (fx, fy_front, fy_rear) onto the friction ellipse of capacity `cap`.
pub fn friction_ellipse(fx: f32, fy_front: f32, fy_rear: f32, cap: f32) -> (f32, f32, f32) {
    if cap <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let nx = fx.abs() / cap;
    let ny = (fy_front.abs() + fy_rear.abs()) / cap;

    let ellipse = nx * nx + ny * ny;
    let scale = if ellipse > 1.0 { 1.0 / ellipse.sqrt() } else { 1.0 };

    (fx * scale, fy_front * scale, fy_rear * scale)
}

/// Tread loss (%/s) for this tick's slip, brake demand and speed.
pub fn wear_rate(slip_front: f32, slip_rear: f32, brake: f32, speed: f32) -> f32 {
    let scrub = |s: f32| ((s.abs() - SCRUB_ONSET) / (1.0 - SCRUB_ONSET)).max(0.0);
    let rolling = (speed / LOW_SPEED).clamp(0.0, 1.0);

    (SCRUB_WEAR * (scrub(slip_front) + scrub(slip_rear)) + BRAKE_WEAR * brake.clamp(0.0, 1.0))
        * rolling
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loads(p: &ParameterSet) -> (f32, f32) {
        let w = p.mass * 9.81;
        (w * p.front_weight_fraction, w * (1.0 - p.front_weight_fraction))
    }

    #[test]
    fn test_no_force_when_parked_and_steering() {
        let p = ParameterSet::gt86();
        let (nf, nr) = loads(&p);
        let f = lateral_forces(&p, 0.0, 0.0, 0.0, p.steering_limit, nf, nr);
        assert_eq!(f.front, 0.0);
        assert_eq!(f.rear, 0.0);
    }

    #[test]
    fn test_left_steer_pushes_front_left() {
        let p = ParameterSet::gt86();
        let (nf, nr) = loads(&p);
        let f = lateral_forces(&p, 20.0, 0.0, 0.0, 0.05, nf, nr);
        assert!(f.front > 0.0);
        assert_eq!(f.rear, 0.0);
    }

    #[test]
    fn test_lateral_force_saturates_at_friction_limit() {
        let p = ParameterSet::gt86();
        let (nf, nr) = loads(&p);
        let f = lateral_forces(&p, 20.0, -15.0, 0.0, 0.6, nf, nr);

        assert_eq!(f.slip_front, 1.0);
        assert!((f.front - p.tire_friction * nf).abs() < 1e-2);
        assert!(f.rear <= p.tire_friction * nr + 1e-2);
    }

    #[test]
    fn test_lateral_slide_is_opposed() {
        let p = ParameterSet::gt86();
        let (nf, nr) = loads(&p);
        // sliding to the left with no steer: both axles push right
        let f = lateral_forces(&p, 15.0, 0.5, 0.0, 0.0, nf, nr);
        assert!(f.front < 0.0 && f.rear < 0.0);
    }

    #[test]
    fn test_ellipse_keeps_forces_inside_capacity() {
        let (fx, fyf, fyr) = friction_ellipse(9000.0, 4000.0, 4000.0, 10_000.0);
        let nx = fx / 10_000.0;
        let ny = (fyf + fyr) / 10_000.0;
        assert!((nx * nx + ny * ny - 1.0).abs() < 1e-4);
        assert!(fx > 0.0 && fyf > 0.0);

        assert_eq!(friction_ellipse(100.0, 50.0, -50.0, 10_000.0), (100.0, 50.0, -50.0));
        assert_eq!(friction_ellipse(100.0, 50.0, 50.0, 0.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_wear_from_scrub_and_brake() {
        assert_eq!(wear_rate(0.3, -0.3, 0.0, 20.0), 0.0, "grip below onset should not scrub");
        assert_eq!(wear_rate(1.0, 1.0, 1.0, 0.0), 0.0, "a parked car does not wear");

        let braking = wear_rate(0.0, 0.0, 1.0, 20.0);
        let sliding = wear_rate(1.0, -1.0, 0.0, 20.0);
        assert!((braking - BRAKE_WEAR).abs() < 1e-6);
        assert!((sliding - 2.0 * SCRUB_WEAR).abs() < 1e-6);
        assert!(wear_rate(1.0, -1.0, 1.0, 20.0) > sliding);
    }
}
