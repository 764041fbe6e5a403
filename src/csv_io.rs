//! CSV tables: one row per trail, plus `cluster`/`dificuldade` after
//! classification. Column names come from the serde renames on
//! `TrailMetrics`; optional values are written as empty cells.

use std::path::Path;

use csv::{Reader, Writer};
use serde::Serialize;
use tracing::info;

use crate::batch_processor::TrailBatch;
use crate::difficulty_classifier::ClassificationReport;
use crate::error::Result;
use crate::trail_analyzer::TrailMetrics;

/// Trailing columns of the classified table; both empty for an unclassified trail.
#[derive(Serialize)]
struct ClassColumns<'a> {
    cluster: Option<usize>,
    dificuldade: Option<&'a str>,
}

pub fn write_trails_csv(path: &Path, batch: &TrailBatch) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for metrics in batch.iter() {
        wtr.serialize(metrics)?;
    }
    wtr.flush()?;

    info!("Wrote {} trails to {}", batch.len(), path.display());
    Ok(())
}

pub fn read_trails_csv(path: &Path) -> Result<TrailBatch> {
    let mut rdr = Reader::from_path(path)?;
    let mut batch = TrailBatch::new();
    for record in rdr.deserialize::<TrailMetrics>() {
        batch.insert(record?);
    }

    info!("Loaded {} trails from {}", batch.len(), path.display());
    Ok(batch)
}

pub fn write_classified_csv(path: &Path, report: &ClassificationReport) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    for trail in &report.trails {
        let class = ClassColumns {
            cluster: trail.assignment.as_ref().map(|a| a.cluster),
            dificuldade: trail.assignment.as_ref().map(|a| a.difficulty.as_str()),
        };
        wtr.serialize((&trail.metrics, class))?;
    }
    wtr.flush()?;

    info!("Wrote {} classified trails to {}", report.trails.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::difficulty_classifier::classify;
    use crate::trail_analyzer::{TimeSource, TrailType};
    use tempfile::TempDir;

    fn observed(name: &str, km: f64, gain: f64, minutes: f64) -> TrailMetrics {
        TrailMetrics {
            trail_name: name.to_string(),
            sample_count: 321,
            start_latitude: -22.951916,
            start_longitude: -43.210487,
            distance_km: km,
            elevation_gain_m: gain,
            mean_slope_deg: (gain / (km * 1000.0)).atan().to_degrees(),
            day_count: 1,
            trail_type: TrailType::SingleDay,
            distance_per_day_km: km,
            gain_per_day_m: gain,
            mean_slope_per_day_deg: (gain / (km * 1000.0)).atan().to_degrees(),
            elapsed_time_min: Some(minutes + 20.0),
            active_time_min: Some(minutes),
            naismith_min: 95.5,
            tobler_min: 101.25,
            reference_time_min: minutes,
            time_source: TimeSource::Observed,
            naismith_error_min: Some(minutes - 95.5),
            tobler_error_min: Some(minutes - 101.25),
            intensity_per_day: 17.125,
            effort_concentration_index: 0.0,
        }
    }

    fn planned(name: &str) -> TrailMetrics {
        TrailMetrics {
            trail_type: TrailType::Unknown,
            elapsed_time_min: None,
            active_time_min: None,
            reference_time_min: 101.25,
            time_source: TimeSource::Estimated,
            naismith_error_min: None,
            tobler_error_min: None,
            ..observed(name, 6.4, 310.0, 101.25)
        }
    }

    #[test]
    fn test_trails_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trilhas.csv");

        let batch: TrailBatch = vec![observed("Pedra Bonita", 7.25, 480.0, 110.0), planned("Pico, da Tijuca")]
            .into_iter()
            .collect();
        write_trails_csv(&path, &batch).unwrap();
        let loaded = read_trails_csv(&path).unwrap();

        assert_eq!(loaded, batch);
        let row = loaded.get("Pico, da Tijuca").unwrap();
        assert_eq!(row.time_source, TimeSource::Estimated);
        assert_eq!(row.naismith_error_min, None);
    }

    #[test]
    fn test_trail_table_header_and_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trilhas.csv");

        let batch: TrailBatch = vec![planned("Itatiaia")].into_iter().collect();
        write_trails_csv(&path, &batch).unwrap();

        let mut rdr = Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 22);
        let column = |name: &str| headers.iter().position(|h| h == name).unwrap();

        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[column("tipo_trilha")], "unknown");
        assert_eq!(&row[column("origem_tempo")], "estimado");
        assert_eq!(&row[column("tempo_real_min")], "");
        assert_eq!(&row[column("erro_tobler_min")], "");
        assert_eq!(&headers[21], "indice_concentracao_esforco");
    }

    #[test]
    fn test_classified_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classificadas.csv");

        let mut parked = observed("parado", 1.0, 0.0, 10.0);
        parked.distance_km = 0.0;
        parked.distance_per_day_km = 0.0;

        let batch: TrailBatch = vec![
            observed("a", 10.0, 0.0, 120.0),
            observed("b", 9.5, 20.0, 116.0),
            observed("c", 8.0, 700.0, 240.0),
            observed("d", 8.5, 720.0, 250.0),
            observed("e", 12.0, 1800.0, 600.0),
            observed("f", 12.5, 1850.0, 640.0),
            parked,
        ]
        .into_iter()
        .collect();
        let report = classify(&batch, &ClassifierConfig::default()).unwrap();
        write_classified_csv(&path, &report).unwrap();

        let mut rdr = Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 24);
        assert_eq!(&headers[0], "trilha");
        assert_eq!(&headers[22], "cluster");
        assert_eq!(&headers[23], "dificuldade");

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 7);
        let parked_row = rows.iter().find(|r| &r[0] == "parado").unwrap();
        assert_eq!(&parked_row[22], "");
        assert_eq!(&parked_row[23], "");
        let easy_row = rows.iter().find(|r| &r[0] == "a").unwrap();
        assert_eq!(&easy_row[23], "Leve");
    }
}
