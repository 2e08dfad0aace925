//! Pure value mapping: clamping into the CC range, evenly distributed stops for labelled
//! steps and nearest-stop snapping.
//!
//! Rounding is half-up (`floor(x + 0.5)`) everywhere, which is what the device web UI does.
//! `63.5` rounds to `64` and `-0.5` rounds to `0`.

use serde::Serialize;
use shared::domain::{CC_MAX, CC_MIN};

/// Rounds to the nearest integer, ties towards positive infinity.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Truncates towards zero, then clamps into `[0, 127]`. `NaN` maps to 0.
pub fn clamp(value: f64) -> u8 {
    if value.is_nan() {
        return CC_MIN;
    }
    value.trunc().clamp(f64::from(CC_MIN), f64::from(CC_MAX)) as u8
}

/// Same as [`clamp`] for values that are already integers, e.g. a fetched device value.
pub fn clamp_int(value: i64) -> u8 {
    value.clamp(i64::from(CC_MIN), i64::from(CC_MAX)) as u8
}

/// Maps a position along a track (0.0 at the low end, 1.0 at the high end) to a CC value.
pub fn ratio_to_value(ratio: f64) -> u8 {
    clamp(round_half_up(ratio * f64::from(CC_MAX)))
}

/// Index of the label shown after the next activation, wrapping back to the first one.
pub fn cycle_index(current: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (current + 1) % count
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stop {
    pub label: String,
    pub value: u8,
}

/// Labelled stops spread evenly over `[0, 127]`, in label order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepSet(Vec<Stop>);

impl StepSet {
    /// Parses a comma separated label list. Labels are trimmed and blank entries dropped, so
    /// an empty or blank list yields an empty set.
    pub fn parse(list: &str) -> Self {
        compute_stops(list.split(',').map(str::trim).filter(|label| !label.is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Stop> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.0.iter()
    }

    pub fn values(&self) -> Vec<u8> {
        self.0.iter().map(|stop| stop.value).collect()
    }

    /// Index of the stop closest to `value`. On an exact tie the earlier stop wins.
    pub fn nearest_index(&self, value: u8) -> Option<usize> {
        let mut best: Option<(usize, u8)> = None;
        for (index, stop) in self.0.iter().enumerate() {
            let distance = value.abs_diff(stop.value);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }
}

/// Assigns `round(i * 127 / (n - 1))` to the i-th of `n` labels. A single label maps to 0.
pub fn compute_stops<I, S>(labels: I) -> StepSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
    let count = labels.len();
    let interval = if count > 1 {
        f64::from(CC_MAX) / (count - 1) as f64
    } else {
        0.0
    };

    StepSet(
        labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| Stop {
                label,
                value: clamp(round_half_up(index as f64 * interval)),
            })
            .collect(),
    )
}

/// Snaps `value` onto the nearest stop. Without stops the value is returned unchanged.
pub fn snap_to_nearest(value: u8, stops: &StepSet) -> u8 {
    stops
        .nearest_index(value)
        .and_then(|index| stops.get(index))
        .map_or(value, |stop| stop.value)
}
