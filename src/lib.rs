//! # trail-effort
//!
//! Effort metrics, time estimates and difficulty classes for hiking trails
//! recorded as GPX tracks.
//!
//! Per trail: ingestion → distance / gain / active time → Naismith and Tobler
//! estimates → observed-vs-estimated reference time and effort indices.
//! Per batch: standardized features → K-Means → clusters labeled by effort.
//!
//! ```no_run
//! use std::path::Path;
//! use trail_effort::{analyze_folder, classify, AnalysisConfig, ClassifierConfig};
//!
//! let outcome = analyze_folder(Path::new("dados/gpx"), &AnalysisConfig::default())?;
//! let report = classify(&outcome.batch, &ClassifierConfig::default())?;
//! for trail in &report.trails {
//!     if let Some(a) = &trail.assignment {
//!         println!("{}: {}", trail.metrics.trail_name, a.difficulty);
//!     }
//! }
//! # Ok::<(), trail_effort::TrailError>(())
//! ```

pub mod config;
pub mod error;

pub mod gpx_reader;
pub mod time_models;
pub mod trail_metrics;

pub mod batch_processor;
pub mod trail_analyzer;

pub mod difficulty_classifier;
pub mod kmeans;

pub mod csv_io;

pub use batch_processor::{analyze_files, analyze_folder, collect_gpx_files, BatchOutcome, TrailBatch, TrailFailure};
pub use config::{AnalysisConfig, ClassifierConfig, FeatureSet, PipelineConfig, SpeedBand};
pub use csv_io::{read_trails_csv, write_classified_csv, write_trails_csv};
pub use difficulty_classifier::{classify, ClassificationReport, ClassifiedTrail, ClusterAssignment, ClusterSummary};
pub use error::{Result, TrailError};
pub use gpx_reader::{read_track, GeoSample, Track};
pub use time_models::{naismith_minutes, tobler_minutes, tobler_speed_kmh};
pub use trail_analyzer::{analyze_track, analyze_trail, TimeSource, TrailMetrics, TrailType};
