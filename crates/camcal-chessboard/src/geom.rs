//! Angle arithmetic for directed vectors and undirected axes.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Unsigned angular distance between two directions, in `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let d = (b - a).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Angle between an undirected axis (modulo π) and a direction, in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let d = angle_diff_abs(axis_angle, vec_angle);
    d.min(PI - d)
}

/// True when two axes are a quarter turn apart within `tolerance`.
pub fn is_orthogonal(a: f32, b: f32, tolerance: f32) -> bool {
    (FRAC_PI_2 - axis_vec_diff(a, b)).abs() <= tolerance.abs()
}

/// Axis angle folded into `[0, π)`.
pub fn wrap_pi(theta: f32) -> f32 {
    theta.rem_euclid(PI)
}
