//! Metric engine: distance, elevation gain, active and elapsed time.
//!
//! Each metric applies its own noise threshold so that GPS jitter, barometric
//! drift and stationary pauses do not inflate the totals.

use geo::{point, GeodesicDistance};

use crate::config::SpeedBand;
use crate::gpx_reader::GeoSample;

/// WGS-84 geodesic distance between two samples, in meters.
pub fn segment_distance_m(a: &GeoSample, b: &GeoSample) -> f64 {
    let p1 = point!(x: a.longitude, y: a.latitude);
    let p2 = point!(x: b.longitude, y: b.latitude);
    p1.geodesic_distance(&p2)
}

/// Total distance in km. Segments shorter than `min_displacement_m` count as
/// zero; every segment is still measured from its immediate predecessor.
pub fn total_distance_km(samples: &[GeoSample], min_displacement_m: f64) -> f64 {
    let total_m: f64 = samples
        .windows(2)
        .map(|w| segment_distance_m(&w[0], &w[1]))
        .filter(|&d| d >= min_displacement_m)
        .sum();
    total_m / 1000.0
}

/// Positive elevation gain in meters, counting only single steps of at least
/// `min_delta_m`.
pub fn elevation_gain_m(samples: &[GeoSample], min_delta_m: f64) -> f64 {
    samples
        .windows(2)
        .map(|w| w[1].altitude_m - w[0].altitude_m)
        .filter(|&delta| delta > 0.0 && delta >= min_delta_m)
        .sum()
}

/// Minutes spent moving at a walking speed. `None` when the track carries no
/// timestamps at all.
pub fn active_time_min(samples: &[GeoSample], band: &SpeedBand) -> Option<f64> {
    if !samples.iter().any(|s| s.timestamp.is_some()) {
        return None;
    }

    let mut active_min = 0.0;
    for w in samples.windows(2) {
        let (Some(t0), Some(t1)) = (w[0].timestamp, w[1].timestamp) else {
            continue;
        };

        let delta_h = (t1 - t0).num_milliseconds() as f64 / 3_600_000.0;
        if delta_h <= 0.0 {
            continue;
        }

        let speed_kmh = segment_distance_m(&w[0], &w[1]) / 1000.0 / delta_h;
        if band.contains(speed_kmh) {
            active_min += delta_h * 60.0;
        }
    }

    Some(active_min)
}

/// Minutes between the first and last timestamped samples.
pub fn elapsed_time_min(samples: &[GeoSample]) -> Option<f64> {
    let mut times = samples.iter().filter_map(|s| s.timestamp);
    let first = times.next()?;
    let last = times.last()?;
    Some((last - first).num_milliseconds() as f64 / 60_000.0)
}

/// Mean slope in degrees from total gain over horizontal distance.
pub fn mean_slope_deg(distance_km: f64, elevation_gain_m: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    (elevation_gain_m / (distance_km * 1000.0)).atan().to_degrees()
}
