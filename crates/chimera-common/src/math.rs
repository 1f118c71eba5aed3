//! 2D math helpers on top of [`glam::Vec2`].
//!
//! World space is y-up: larger `y` is higher above the ground.

pub use glam::Vec2;

/// Sign of `value` with zero counted as positive.
#[must_use]
pub fn sign(value: f32) -> f32 {
    if value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Horizontal direction (`-1.0` or `1.0`) from `from` toward `to`.
#[must_use]
pub fn horizontal_sign(from: Vec2, to: Vec2) -> f32 {
    sign(to.x - from.x)
}

/// Unit vector from `from` toward `to`, or zero when the points coincide.
#[must_use]
pub fn direction(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Counter-clockwise perpendicular of `v`.
#[must_use]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Critically damped spring toward `target`.
///
/// `velocity` carries the spring state between calls. The result never
/// overshoots `target`.
pub fn smooth_damp(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    dt: f32,
) -> Vec2 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + change * omega) * dt;
    *velocity = (*velocity - temp * omega) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = Vec2::ZERO;
    }
    output
}

/// Moves `current` toward `target` by at most `max_delta`.
#[must_use]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_zero_is_positive() {
        assert_eq!(sign(0.0), 1.0);
        assert_eq!(sign(-0.5), -1.0);
        assert_eq!(horizontal_sign(Vec2::new(3.0, 0.0), Vec2::new(1.0, 9.0)), -1.0);
    }

    #[test]
    fn test_direction_of_coincident_points_is_zero() {
        assert_eq!(direction(Vec2::ONE, Vec2::ONE), Vec2::ZERO);
    }

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let target = Vec2::new(10.0, 0.0);
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        for _ in 0..200 {
            pos = smooth_damp(pos, target, &mut vel, 0.15, 1.0 / 60.0);
            assert!(pos.x <= target.x + 1e-4);
        }
        assert!((pos - target).length() < 0.01);
    }

    #[test]
    fn test_move_towards_clamps_step() {
        let p = move_towards(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0);
        assert_eq!(p, Vec2::new(2.0, 0.0));
        let q = move_towards(Vec2::ZERO, Vec2::new(1.0, 0.0), 2.0);
        assert_eq!(q, Vec2::new(1.0, 0.0));
    }

    proptest! {
        #[test]
        fn test_move_towards_never_exceeds_step(
            x in -100.0f32..100.0,
            y in -100.0f32..100.0,
            step in 0.0f32..10.0,
        ) {
            let target = Vec2::new(x, y);
            let p = move_towards(Vec2::ZERO, target, step);
            prop_assert!(p.length() <= step + 1e-3);
            prop_assert!(p.distance(target) <= target.length() + 1e-3);
        }
    }
}
