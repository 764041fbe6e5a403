//! Tunable thresholds for trail analysis and difficulty classification.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TrailError};

/// Closed speed interval in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedBand {
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl SpeedBand {
    pub const fn new(min_kmh: f64, max_kmh: f64) -> Self {
        Self { min_kmh, max_kmh }
    }

    pub fn contains(&self, speed_kmh: f64) -> bool {
        speed_kmh >= self.min_kmh && speed_kmh <= self.max_kmh
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min_kmh.is_finite() && self.max_kmh.is_finite())
            || self.min_kmh < 0.0
            || self.min_kmh > self.max_kmh
        {
            return Err(TrailError::InvalidConfig(format!(
                "{name}: invalid speed band {:.2}-{:.2} km/h",
                self.min_kmh, self.max_kmh
            )));
        }
        Ok(())
    }
}

/// Noise thresholds and plausibility bands used per trail.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Segments shorter than this add nothing to the distance (GPS jitter).
    pub min_displacement_m: f64,
    /// Altitude deltas below this add nothing to the gain (sensor noise).
    pub min_elevation_delta_m: f64,
    /// Instantaneous speeds counted as walking when summing active time.
    pub active_speed_band: SpeedBand,
    /// Average speed for the observed time to be trusted as a real execution.
    pub reference_speed_band: SpeedBand,
    /// Worker threads for batch analysis.
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            min_displacement_m: 1.0,
            min_elevation_delta_m: 3.0,
            active_speed_band: SpeedBand::new(0.5, 7.0),
            reference_speed_band: SpeedBand::new(0.8, 6.5),
            workers: num_cpus::get(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_displacement_m.is_nan() || self.min_displacement_m < 0.0 {
            return Err(TrailError::InvalidConfig(
                "min_displacement_m must be >= 0".to_string(),
            ));
        }
        if self.min_elevation_delta_m.is_nan() || self.min_elevation_delta_m < 0.0 {
            return Err(TrailError::InvalidConfig(
                "min_elevation_delta_m must be >= 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(TrailError::InvalidConfig("workers must be >= 1".to_string()));
        }
        self.active_speed_band.validate("active_speed_band")?;
        self.reference_speed_band.validate("reference_speed_band")
    }
}

/// Which engineered features the classifier clusters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Pace per km, climb per km, mean slope.
    PerKm,
    /// Pace per day-km, climb per km, per-day slope, accumulated load.
    MultiDay,
    /// Daily intensity, day count, effort concentration.
    Intensity,
}

impl std::str::FromStr for FeatureSet {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_km" => Ok(FeatureSet::PerKm),
            "multi_day" => Ok(FeatureSet::MultiDay),
            "intensity" => Ok(FeatureSet::Intensity),
            other => Err(format!(
                "unknown feature set '{other}' (per_km, multi_day, intensity)"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub clusters: usize,
    pub seed: u64,
    /// Independent K-Means restarts; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    pub features: FeatureSet,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            clusters: 3,
            seed: 42,
            n_init: 30,
            max_iter: 300,
            features: FeatureSet::MultiDay,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(TrailError::InvalidConfig(
                "n_init and max_iter must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub classifier: ClassifierConfig,
}

impl PipelineConfig {
    /// Loads a JSON config; missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)
            .map_err(|e| TrailError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.analysis.validate()?;
        config.classifier.validate()?;
        Ok(config)
    }
}
