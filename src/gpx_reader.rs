/// GPX ingestion: every track and segment of a file flattened into one
/// time-ordered sequence of samples.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gpx::{read, Gpx, Time};
use tracing::{debug, warn};

use crate::error::{Result, TrailError};

#[derive(Debug, Clone, PartialEq)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl GeoSample {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        GeoSample {
            latitude,
            longitude,
            altitude_m,
            timestamp: None,
        }
    }

    pub fn with_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A non-empty, time-ordered sequence of samples for one trail.
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    samples: Vec<GeoSample>,
}

impl Track {
    /// Sorts by timestamp (stable, untimed samples last) and rejects empty input.
    pub fn from_samples(name: impl Into<String>, mut samples: Vec<GeoSample>) -> Result<Self> {
        let name = name.into();
        if samples.is_empty() {
            return Err(TrailError::EmptyTrack {
                path: PathBuf::from(&name),
            });
        }

        samples.sort_by(|a, b| match (a.timestamp, b.timestamp) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(Track { name, samples })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[GeoSample] {
        &self.samples
    }

    pub fn first(&self) -> &GeoSample {
        // Non-empty by construction
        &self.samples[0]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn has_timestamps(&self) -> bool {
        self.samples.iter().any(|s| s.timestamp.is_some())
    }
}

/// Reads a GPX file; the trail is named after the file stem.
pub fn read_track(path: &Path) -> Result<Track> {
    let file = File::open(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    read_track_from(BufReader::new(file), &name).map_err(|e| match e {
        TrailError::EmptyTrack { .. } => TrailError::EmptyTrack {
            path: path.to_path_buf(),
        },
        other => other,
    })
}

pub fn read_track_from<R: Read>(mut reader: R, name: &str) -> Result<Track> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let gpx = parse_gpx(&content, name)?;

    let mut samples = Vec::new();
    let mut dropped = 0usize;

    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                let coords = point.point();
                let (lat, lon) = (coords.y(), coords.x());
                match point.elevation {
                    Some(ele) if lat.is_finite() && lon.is_finite() && ele.is_finite() => {
                        let mut sample = GeoSample::new(lat, lon, ele);
                        sample.timestamp = point.time.as_ref().and_then(to_utc);
                        samples.push(sample);
                    }
                    _ => dropped += 1,
                }
            }
        }
    }

    debug!(
        "{}: {} points kept, {} dropped without coordinates or elevation",
        name,
        samples.len(),
        dropped
    );

    Track::from_samples(name, samples)
}

/// Strict parse first. When that fails, retries once after dropping track
/// points without `lat`/`lon` and clearing timestamps that do not parse, so a
/// single bad point does not cost the whole trail.
fn parse_gpx(content: &str, name: &str) -> Result<Gpx> {
    let strict_err = match read(content.as_bytes()) {
        Ok(gpx) => return Ok(gpx),
        Err(e) => e,
    };

    let repair = repair_points(content);
    if repair.dropped_points == 0 && repair.cleared_times == 0 {
        return Err(strict_err.into());
    }

    match read(repair.content.as_bytes()) {
        Ok(gpx) => {
            warn!(
                "{}: {} ({} points without coordinates dropped, {} timestamps cleared)",
                name, strict_err, repair.dropped_points, repair.cleared_times
            );
            Ok(gpx)
        }
        Err(_) => Err(strict_err.into()),
    }
}

struct RepairedGpx {
    content: String,
    dropped_points: usize,
    cleared_times: usize,
}

fn repair_points(content: &str) -> RepairedGpx {
    let mut repaired = String::with_capacity(content.len());
    let mut dropped_points = 0;
    let mut cleared_times = 0;
    let mut rest = content;

    while let Some(start) = rest.find("<trkpt") {
        repaired.push_str(&rest[..start]);
        let tail = &rest[start..];

        let Some(open_end) = tail.find('>') else {
            rest = tail;
            break;
        };
        let open_tag = &tail[..=open_end];
        let block_end = if open_tag.ends_with("/>") {
            open_end + 1
        } else {
            tail.find("</trkpt>").map_or(tail.len(), |i| i + "</trkpt>".len())
        };
        let block = &tail[..block_end];

        if has_attribute(open_tag, "lat") && has_attribute(open_tag, "lon") {
            let (kept, cleared) = strip_bad_times(block);
            repaired.push_str(&kept);
            cleared_times += cleared;
        } else {
            dropped_points += 1;
        }
        rest = &tail[block_end..];
    }
    repaired.push_str(rest);

    RepairedGpx {
        content: repaired,
        dropped_points,
        cleared_times,
    }
}

fn has_attribute(open_tag: &str, name: &str) -> bool {
    open_tag
        .split_whitespace()
        .skip(1)
        .any(|token| token.split('=').next() == Some(name))
}

/// Removes `<time>` elements whose value is not an RFC 3339 timestamp.
fn strip_bad_times(block: &str) -> (String, usize) {
    let mut kept = String::with_capacity(block.len());
    let mut cleared = 0;
    let mut rest = block;

    while let Some(start) = rest.find("<time>") {
        let tail = &rest[start..];
        let Some(close) = tail.find("</time>") else {
            break;
        };
        let element_end = close + "</time>".len();
        let value = tail["<time>".len()..close].trim();

        kept.push_str(&rest[..start]);
        if DateTime::parse_from_rfc3339(value).is_ok() {
            kept.push_str(&tail[..element_end]);
        } else {
            cleared += 1;
        }
        rest = &tail[element_end..];
    }
    kept.push_str(rest);

    (kept, cleared)
}

fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let formatted = time.format().ok()?;
    formatted.parse::<DateTime<Utc>>().ok()
}
