//! Error type shared by the whole pipeline.
//!
//! Ingestion errors are fatal for a single trail and get recovered by the batch
//! processor. Classifier errors abort the classification run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GPX without valid points: {}", path.display())]
    EmptyTrack { path: PathBuf },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported number of clusters: {0} (supported: 3, 4, 5)")]
    UnsupportedClusterCount(usize),

    #[error("{trails} trails eligible for clustering, at least {clusters} required")]
    InsufficientTrails { trails: usize, clusters: usize },
}

pub type Result<T> = std::result::Result<T, TrailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrailError::EmptyTrack {
            path: PathBuf::from("dados/gpx/pico.gpx"),
        };
        assert!(err.to_string().contains("pico.gpx"));

        let err = TrailError::UnsupportedClusterCount(7);
        assert!(err.to_string().contains('7'));
    }
}
