//! Pure indicator math. Every function takes observations in ascending date
//! order and returns `None` instead of guessing when the input is too thin.

use crate::domain::snapshot::Trend;
use crate::ingest::types::Observation;
use chrono::{Datelike, Months};

pub const LATEST_LOOKBACK: usize = 10;
pub const YOY_WINDOW: usize = 14;
pub const YOY_MIN_POINTS: usize = 13;
pub const TREND_WINDOW: usize = 8;
pub const POLICY_DELTA_POINTS: usize = 4;

/// Differences smaller than this (in the series' own unit) count as flat.
pub const TREND_FLAT_THRESHOLD: f64 = 1.0;

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Newest non-null value among the last [`LATEST_LOOKBACK`] points.
pub fn latest_value(obs: &[Observation]) -> Option<f64> {
    tail(obs, LATEST_LOOKBACK).iter().rev().find_map(|o| o.value)
}

/// YoY % change of an index series, rounded to one decimal.
///
/// The prior endpoint is the closest observation dated on or before exactly
/// twelve calendar months before the newest one.
pub fn yoy_from_index(obs: &[Observation]) -> Option<f64> {
    let window = tail(obs, YOY_WINDOW);
    if window.len() < YOY_MIN_POINTS {
        return None;
    }

    let latest = window.last()?;
    let target = latest.date.checked_sub_months(Months::new(12))?;
    let prior = window.iter().rev().find(|o| o.date <= target)?;

    let (now, then) = (latest.value?, prior.value?);
    if then == 0.0 {
        return None;
    }
    Some(round_to((now / then - 1.0) * 100.0, 1))
}

/// Mean of exactly the three most recent values.
pub fn trailing_three_month_average(values: &[Option<f64>]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let recent = tail(values, 3);
    let mut sum = 0.0;
    for v in recent {
        sum += (*v)?;
    }
    Some(sum / 3.0)
}

/// Compares the mean of the four newest values with the four before them.
pub fn classify_trend(values: &[Option<f64>]) -> Option<Trend> {
    if values.len() < TREND_WINDOW {
        return None;
    }
    let window: Vec<f64> = tail(values, TREND_WINDOW)
        .iter()
        .copied()
        .collect::<Option<Vec<_>>>()?;

    let half = TREND_WINDOW / 2;
    let previous = window[..half].iter().sum::<f64>() / half as f64;
    let recent = window[half..].iter().sum::<f64>() / half as f64;
    let diff = recent - previous;

    Some(if diff.abs() < TREND_FLAT_THRESHOLD {
        Trend::Flat
    } else if diff > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    })
}

/// Policy-rate move across the last four points, in basis points.
pub fn policy_rate_change_bps(values: &[Option<f64>]) -> Option<i32> {
    if values.len() < POLICY_DELTA_POINTS {
        return None;
    }
    let window = tail(values, POLICY_DELTA_POINTS);
    let latest = window[POLICY_DELTA_POINTS - 1]?;
    let base = window[0]?;
    Some(((latest - base) * 100.0).round() as i32)
}

/// Latest value minus the value `periods` points earlier, one decimal.
pub fn change_over_periods(values: &[Option<f64>], periods: usize) -> Option<f64> {
    if periods == 0 || values.len() <= periods {
        return None;
    }
    let latest = (*values.last()?)?;
    let base = values[values.len() - 1 - periods]?;
    Some(round_to(latest - base, 1))
}

/// Period-over-period differences; a gap on either side yields a gap.
pub fn period_changes(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .windows(2)
        .map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        })
        .collect()
}

/// Collapses a daily series to the last observation of each calendar month.
pub fn month_end(obs: &[Observation]) -> Vec<Observation> {
    let mut out: Vec<Observation> = Vec::new();
    for o in obs {
        match out.last_mut() {
            Some(last) if last.date.year() == o.date.year() && last.date.month() == o.date.month() => {
                *last = *o;
            }
            _ => out.push(*o),
        }
    }
    out
}

pub fn values(obs: &[Observation]) -> Vec<Option<f64>> {
    obs.iter().map(|o| o.value).collect()
}
