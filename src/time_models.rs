//! Classical hiking time estimates.
//!
//! Both models work on already computed distance, gain and slope, never on raw
//! samples, so they can be used on their own for route planning.

/// Floor applied to Tobler's speed on extreme slopes.
pub const TOBLER_MIN_SPEED_KMH: f64 = 0.1;

/// Naismith's rule: 5 km/h on the flat plus one hour per 600 m of ascent.
pub fn naismith_minutes(distance_km: f64, elevation_gain_m: f64) -> f64 {
    let hours = distance_km / 5.0 + elevation_gain_m / 600.0;
    hours * 60.0
}

/// Tobler's hiking function. Peaks at 6 km/h on a gentle downhill (-2.86°).
pub fn tobler_speed_kmh(slope_deg: f64) -> f64 {
    let gradient = slope_deg.to_radians().tan();
    let speed = 6.0 * (-3.5 * (gradient + 0.05).abs()).exp();
    speed.max(TOBLER_MIN_SPEED_KMH)
}

pub fn tobler_minutes(distance_km: f64, slope_deg: f64) -> f64 {
    60.0 * distance_km / tobler_speed_kmh(slope_deg)
}
