/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Compass bearing from the horizontal field components.
//! See Honeywell AN-203, "Compass Heading Using Magnetometers".

/// convert radians into degrees
const DEGREES_PER_RADIAN: f32 = 180.0 / core::f32::consts::PI;

/// Full circle, in degrees
const FULL_TURN: f32 = 360.0;

/// Magnetic bearing in degrees, in [0, 360), for the raw `hx` and `hy`
/// components. No smoothing, tilt compensation or calibration is applied.
///
/// North (+hy only) is 90, south (-hy only) 270, -hx only 180.
/// A zero horizontal vector has no direction and reports 0.
pub fn magnetic_bearing(hx: i16, hy: i16) -> f32 {
    if hx == 0 && hy == 0 {
        return 0.0;
    }
    let angle = libm::atan2f(hx as f32, hy as f32) * DEGREES_PER_RADIAN;
    normalize(90.0 - angle)
}

/// Add `declination` to a magnetic bearing and wrap into [0, 360).
///
/// Any declination is accepted, including negative values and values
/// beyond a full turn.
pub fn true_bearing(magnetic: f32, declination: f32) -> f32 {
    normalize(magnetic + declination)
}

/// Wrap any finite angle into [0, 360)
pub fn normalize(degrees: f32) -> f32 {
    let mut wrapped = libm::fmodf(degrees, FULL_TURN);
    if wrapped < 0.0 {
        wrapped += FULL_TURN;
    }
    // -tiny + 360 rounds up to exactly 360
    if wrapped >= FULL_TURN {
        wrapped -= FULL_TURN;
    }
    wrapped
}
