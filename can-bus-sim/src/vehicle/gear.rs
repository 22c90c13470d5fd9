//! Gear ratio model
//!
//! Piecewise-linear gear ratio over vehicle speed bands. Ratios are constant
//! inside a band and interpolated across the 5-10 km/h shift zones between
//! bands, so the curve has no jumps.

/// (speed km/h, ratio) breakpoints, ascending by speed
const GEAR_BREAKPOINTS: [(f64, f64); 9] = [
    (15.0, 3.545),
    (20.0, 1.956),
    (30.0, 1.956),
    (40.0, 1.303),
    (55.0, 1.303),
    (60.0, 0.892),
    (70.0, 0.892),
    (80.0, 0.707),
    (f64::INFINITY, 0.707),
];

/// Upper speed of each gear band; anything above the last is top gear
const GEAR_BANDS: [f64; 4] = [15.0, 30.0, 55.0, 70.0];

/// Gear ratio for the given vehicle speed
pub fn gear_ratio(speed_kmph: f64) -> f64 {
    let (first_speed, first_ratio) = GEAR_BREAKPOINTS[0];
    if speed_kmph <= first_speed {
        return first_ratio;
    }

    for window in GEAR_BREAKPOINTS.windows(2) {
        let (x1, y1) = window[0];
        let (x2, y2) = window[1];
        if speed_kmph <= x2 {
            if y1 == y2 || speed_kmph == x2 {
                return y2;
            }
            return interpolate(speed_kmph, x1, y1, x2, y2);
        }
    }

    GEAR_BREAKPOINTS[GEAR_BREAKPOINTS.len() - 1].1
}

/// Gear index (1-based) for the given vehicle speed
pub fn gear_for_speed(speed_kmph: f64) -> u8 {
    let lower_bands = GEAR_BANDS
        .iter()
        .take_while(|&&upper| speed_kmph > upper)
        .count();
    lower_bands as u8 + 1
}

/// Straight line through (x1, y1) and (x2, y2), evaluated at x
fn interpolate(x: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (y1 * (x - x2) - y2 * (x - x1)) / (x1 - x2)
}
