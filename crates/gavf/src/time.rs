//! Global time units.
//!
//! Container-level times are expressed in [`TIME_SCALE`] ticks per second;
//! stream times use the per-stream timescale and are converted here.

/// Ticks per second of container-level times (microseconds).
pub const TIME_SCALE: i64 = 1_000_000;

/// Sentinel for "no time observed yet".
pub const TIME_UNDEFINED: i64 = i64::MIN;

/// Convert a stream time to container time, rounding to nearest.
pub fn time_unscale(scale: i32, time: i64) -> i64 {
    if time == TIME_UNDEFINED || scale <= 0 {
        return TIME_UNDEFINED;
    }
    ((i128::from(time) * i128::from(TIME_SCALE) + i128::from(scale / 2)) / i128::from(scale)) as i64
}

/// Convert a container time to stream time, rounding to nearest.
pub fn time_scale(scale: i32, time: i64) -> i64 {
    if time == TIME_UNDEFINED || scale <= 0 {
        return TIME_UNDEFINED;
    }
    ((i128::from(time) * i128::from(scale) + i128::from(TIME_SCALE / 2)) / i128::from(TIME_SCALE))
        as i64
}

/// Rescale a time between two stream timescales.
pub fn time_rescale(scale_from: i32, scale_to: i32, time: i64) -> i64 {
    if time == TIME_UNDEFINED || scale_from <= 0 || scale_to <= 0 {
        return TIME_UNDEFINED;
    }
    ((i128::from(time) * i128::from(scale_to) + i128::from(scale_from / 2))
        / i128::from(scale_from)) as i64
}

/// Container time in seconds.
pub fn time_to_seconds(time: i64) -> f64 {
    time as f64 / TIME_SCALE as f64
}
