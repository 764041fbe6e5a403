/// Batch analysis of a folder of GPX files.
///
/// A file that fails to parse or analyze is logged and skipped, the rest of the
/// batch carries on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::{Result, TrailError};
use crate::trail_analyzer::{analyze_trail, TrailMetrics};

/// All successfully analyzed trails keyed by trail name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailBatch {
    trails: BTreeMap<String, TrailMetrics>,
}

impl TrailBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trail; a trail with the same name is replaced.
    pub fn insert(&mut self, metrics: TrailMetrics) {
        let name = metrics.trail_name.clone();
        if self.trails.insert(name.clone(), metrics).is_some() {
            warn!("Duplicate trail name '{}', keeping the last one", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TrailMetrics> {
        self.trails.get(name)
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailMetrics> {
        self.trails.values()
    }
}

impl FromIterator<TrailMetrics> for TrailBatch {
    fn from_iter<I: IntoIterator<Item = TrailMetrics>>(iter: I) -> Self {
        let mut batch = TrailBatch::new();
        for metrics in iter {
            batch.insert(metrics);
        }
        batch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrailFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub batch: TrailBatch,
    pub failures: Vec<TrailFailure>,
}

/// GPX files under `folder`, recursively, sorted by path.
pub fn collect_gpx_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(TrailError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    let mut gpx_files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.eq_ignore_ascii_case("gpx"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    gpx_files.sort();
    Ok(gpx_files)
}

pub fn analyze_folder(folder: &Path, config: &AnalysisConfig) -> Result<BatchOutcome> {
    let gpx_files = collect_gpx_files(folder)?;
    info!("Found {} GPX files in {}", gpx_files.len(), folder.display());
    analyze_files(&gpx_files, config)
}

/// Analyzes every file on a worker pool of `config.workers` threads.
pub fn analyze_files(gpx_files: &[PathBuf], config: &AnalysisConfig) -> Result<BatchOutcome> {
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| TrailError::InvalidConfig(format!("worker pool: {e}")))?;

    info!("Analyzing {} trails on {} workers", gpx_files.len(), config.workers);

    let results: Vec<(PathBuf, Result<TrailMetrics>)> = pool.install(|| {
        gpx_files
            .par_iter()
            .map(|path| (path.clone(), analyze_trail(path, config)))
            .collect()
    });

    let mut outcome = BatchOutcome::default();
    for (path, result) in results {
        match result {
            Ok(metrics) => outcome.batch.insert(metrics),
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                outcome.failures.push(TrailFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Batch complete: {} trails analyzed, {} failed",
        outcome.batch.len(),
        outcome.failures.len()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn gpx_document(points: &[(f64, f64, f64, &str)]) -> String {
        let mut gpx = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.1\" creator=\"test\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n<trk><trkseg>\n",
        );
        for (lat, lon, ele, time) in points {
            gpx.push_str(&format!(
                "<trkpt lat=\"{lat}\" lon=\"{lon}\"><ele>{ele}</ele><time>{time}</time></trkpt>\n"
            ));
        }
        gpx.push_str("</trkseg></trk>\n</gpx>\n");
        gpx
    }

    fn write_valid(dir: &Path, file: &str) {
        let doc = gpx_document(&[
            (-22.9500, -43.2100, 700.0, "2024-05-01T10:00:00Z"),
            (-22.9510, -43.2100, 720.0, "2024-05-01T10:02:00Z"),
            (-22.9520, -43.2100, 745.0, "2024-05-01T10:04:00Z"),
        ]);
        fs::write(dir.join(file), doc).unwrap();
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            workers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_valid(dir.path(), "pedra.gpx");
        write_valid(dir.path(), "pico.GPX");
        fs::write(dir.path().join("quebrado.gpx"), "<gpx><trk><trkseg>").unwrap();
        fs::write(dir.path().join("notas.txt"), "not a track").unwrap();

        let outcome = analyze_folder(dir.path(), &config()).unwrap();

        assert_eq!(outcome.batch.len(), 2);
        assert!(outcome.batch.get("pedra").is_some());
        assert!(outcome.batch.get("pico").is_some());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].path.ends_with("quebrado.gpx"));
        assert!(!outcome.failures[0].reason.is_empty());
    }

    #[test]
    fn test_track_without_elevation_is_reported() {
        let dir = TempDir::new().unwrap();
        write_valid(dir.path(), "boa.gpx");
        fs::write(
            dir.path().join("sem-altitude.gpx"),
            "<?xml version=\"1.0\"?>\n<gpx version=\"1.1\" creator=\"test\"><trk><trkseg><trkpt lat=\"1.0\" lon=\"1.0\"></trkpt></trkseg></trk></gpx>",
        )
        .unwrap();

        let outcome = analyze_folder(dir.path(), &config()).unwrap();
        assert_eq!(outcome.batch.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("sem-altitude.gpx"));
    }

    #[test]
    fn test_collects_nested_folders_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("2024")).unwrap();
        write_valid(dir.path(), "b.gpx");
        write_valid(&dir.path().join("2024"), "a.gpx");

        let files = collect_gpx_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = analyze_folder(&dir.path().join("nope"), &config());
        assert!(matches!(result, Err(TrailError::NotADirectory { .. })));
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("z")).unwrap();
        write_valid(dir.path(), "serra.gpx");
        write_valid(&dir.path().join("z"), "serra.gpx");

        let outcome = analyze_folder(dir.path(), &config()).unwrap();
        assert_eq!(outcome.batch.len(), 1);
        assert!(outcome.failures.is_empty());
    }
}
