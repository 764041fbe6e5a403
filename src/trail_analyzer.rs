//! Per-trail analysis: metrics, multi-day normalization, time models and the
//! choice between observed and estimated duration.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::gpx_reader::{read_track, GeoSample, Track};
use crate::time_models::{naismith_minutes, tobler_minutes};
use crate::trail_metrics::{
    active_time_min, elapsed_time_min, elevation_gain_m, mean_slope_deg, total_distance_km,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailType {
    /// Fewer than two timestamped points, treated as one day.
    Unknown,
    SingleDay,
    MultiDay,
}

/// Where the reference duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSource {
    /// Observed active time at a plausible walking speed.
    #[serde(rename = "real")]
    Observed,
    /// Tobler estimate; the trail is treated as planned, not executed.
    #[serde(rename = "estimado")]
    Estimated,
}

impl TimeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSource::Observed => "real",
            TimeSource::Estimated => "estimado",
        }
    }
}

/// Analysis result for one trail. Values are rounded; see `analyze_track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailMetrics {
    #[serde(rename = "trilha")]
    pub trail_name: String,
    #[serde(rename = "pontos")]
    pub sample_count: usize,
    #[serde(rename = "latitude_inicio")]
    pub start_latitude: f64,
    #[serde(rename = "longitude_inicio")]
    pub start_longitude: f64,
    #[serde(rename = "distancia_km")]
    pub distance_km: f64,
    #[serde(rename = "ganho_elevacao_m")]
    pub elevation_gain_m: f64,
    #[serde(rename = "inclinacao_media_graus")]
    pub mean_slope_deg: f64,
    #[serde(rename = "dias_trilha")]
    pub day_count: u32,
    #[serde(rename = "tipo_trilha")]
    pub trail_type: TrailType,
    #[serde(rename = "distancia_por_dia_km")]
    pub distance_per_day_km: f64,
    #[serde(rename = "ganho_por_dia_m")]
    pub gain_per_day_m: f64,
    #[serde(rename = "inclinacao_media_dia_graus")]
    pub mean_slope_per_day_deg: f64,
    #[serde(rename = "tempo_real_min")]
    pub elapsed_time_min: Option<f64>,
    #[serde(rename = "tempo_ativo_min")]
    pub active_time_min: Option<f64>,
    #[serde(rename = "tempo_naismith_min")]
    pub naismith_min: f64,
    #[serde(rename = "tempo_tobler_min")]
    pub tobler_min: f64,
    #[serde(rename = "tempo_usado_min")]
    pub reference_time_min: f64,
    #[serde(rename = "origem_tempo")]
    pub time_source: TimeSource,
    #[serde(rename = "erro_naismith_min")]
    pub naismith_error_min: Option<f64>,
    #[serde(rename = "erro_tobler_min")]
    pub tobler_error_min: Option<f64>,
    #[serde(rename = "intensidade_diaria")]
    pub intensity_per_day: f64,
    #[serde(rename = "indice_concentracao_esforco")]
    pub effort_concentration_index: f64,
}

impl TrailMetrics {
    /// Reference minutes per km, `None` for a zero-distance trail.
    pub fn pace_min_per_km(&self) -> Option<f64> {
        (self.distance_km > 0.0).then(|| self.reference_time_min / self.distance_km)
    }

    pub fn climb_m_per_km(&self) -> Option<f64> {
        (self.distance_km > 0.0).then(|| self.elevation_gain_m / self.distance_km)
    }

    /// Reference minutes per km of a single day.
    pub fn pace_per_day_km(&self) -> Option<f64> {
        if self.distance_per_day_km <= 0.0 || self.day_count == 0 {
            return None;
        }
        Some(self.reference_time_min / self.day_count as f64 / self.distance_per_day_km)
    }
}

/// Reads and analyzes one GPX file.
pub fn analyze_trail(path: &Path, config: &AnalysisConfig) -> Result<TrailMetrics> {
    let track = read_track(path)?;
    Ok(analyze_track(&track, config))
}

pub fn analyze_track(track: &Track, config: &AnalysisConfig) -> TrailMetrics {
    let samples = track.samples();
    let origin = track.first();

    let distance_km = total_distance_km(samples, config.min_displacement_m);
    let gain_m = elevation_gain_m(samples, config.min_elevation_delta_m);
    let slope_deg = mean_slope_deg(distance_km, gain_m);

    let days = samples_by_day(samples);
    let (day_count, trail_type) = classify_days(samples, &days);
    let day_factor = day_count as f64;

    // Each day is modeled as a repetition of the same single-day effort
    let distance_per_day_km = distance_km / day_factor;
    let gain_per_day_m = gain_m / day_factor;
    let slope_per_day_deg = mean_slope_deg(distance_per_day_km, gain_per_day_m);

    let naismith_min = naismith_minutes(distance_per_day_km, gain_per_day_m) * day_factor;
    let tobler_min = tobler_minutes(distance_per_day_km, slope_per_day_deg) * day_factor;

    let elapsed_min = elapsed_time_min(samples);
    let active_min = active_time_min(samples, &config.active_speed_band);

    let observed_min = active_min.filter(|&active| {
        active > 0.0
            && distance_km > 0.0
            && config
                .reference_speed_band
                .contains(distance_km / (active / 60.0))
    });

    let (reference_min, time_source, naismith_error, tobler_error) = match observed_min {
        Some(observed) => (
            observed,
            TimeSource::Observed,
            Some(observed - naismith_min),
            Some(observed - tobler_min),
        ),
        None => (tobler_min, TimeSource::Estimated, None, None),
    };

    let pace_per_day = if distance_per_day_km > 0.0 {
        (reference_min / day_factor) / distance_per_day_km
    } else {
        0.0
    };
    let gain_per_km = if distance_km > 0.0 {
        gain_m / distance_km
    } else {
        0.0
    };
    let intensity = pace_per_day + gain_per_km / 100.0 + slope_per_day_deg;

    let concentration = effort_concentration(&days, config.min_elevation_delta_m);

    debug!(
        "{}: {:.3} km, {:.1} m gain, {} day(s), reference {:.1} min ({})",
        track.name(),
        distance_km,
        gain_m,
        day_count,
        reference_min,
        time_source.as_str()
    );

    TrailMetrics {
        trail_name: track.name().to_string(),
        sample_count: samples.len(),
        start_latitude: round_to(origin.latitude, 6),
        start_longitude: round_to(origin.longitude, 6),
        distance_km: round_to(distance_km, 3),
        elevation_gain_m: round_to(gain_m, 1),
        mean_slope_deg: round_to(slope_deg, 2),
        day_count,
        trail_type,
        distance_per_day_km: round_to(distance_per_day_km, 3),
        gain_per_day_m: round_to(gain_per_day_m, 1),
        mean_slope_per_day_deg: round_to(slope_per_day_deg, 2),
        elapsed_time_min: elapsed_min.map(|v| round_to(v, 2)),
        active_time_min: active_min.map(|v| round_to(v, 2)),
        naismith_min: round_to(naismith_min, 2),
        tobler_min: round_to(tobler_min, 2),
        reference_time_min: round_to(reference_min, 2),
        time_source,
        naismith_error_min: naismith_error.map(|v| round_to(v, 2)),
        tobler_error_min: tobler_error.map(|v| round_to(v, 2)),
        intensity_per_day: round_to(intensity, 3),
        effort_concentration_index: round_to(concentration, 3),
    }
}

/// Timestamped samples grouped by UTC calendar date, in track order.
fn samples_by_day(samples: &[GeoSample]) -> BTreeMap<NaiveDate, Vec<GeoSample>> {
    let mut days: BTreeMap<NaiveDate, Vec<GeoSample>> = BTreeMap::new();
    for sample in samples {
        if let Some(ts) = sample.timestamp {
            days.entry(ts.date_naive()).or_default().push(sample.clone());
        }
    }
    days
}

fn classify_days(
    samples: &[GeoSample],
    days: &BTreeMap<NaiveDate, Vec<GeoSample>>,
) -> (u32, TrailType) {
    let timed = samples.iter().filter(|s| s.timestamp.is_some()).count();
    if timed < 2 {
        return (1, TrailType::Unknown);
    }
    match days.len() {
        0 | 1 => (1, TrailType::SingleDay),
        n => (n as u32, TrailType::MultiDay),
    }
}

/// Coefficient of variation of the daily elevation gain.
fn effort_concentration(days: &BTreeMap<NaiveDate, Vec<GeoSample>>, min_delta_m: f64) -> f64 {
    if days.len() < 2 {
        return 0.0;
    }

    let gains: Vec<f64> = days
        .values()
        .map(|day| elevation_gain_m(day, min_delta_m))
        .collect();
    let n = gains.len() as f64;
    let mean = gains.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }

    let variance = gains.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
