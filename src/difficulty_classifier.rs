//! Difficulty classification of a whole batch of trails.
//!
//! Features are standardized on the batch being classified, grouped with
//! K-Means, and clusters are named by their effort score (sum of standardized
//! centroid coordinates), so the lightest cluster is always "Leve" whatever
//! raw id the clustering gave it.

use tracing::{debug, info};

use crate::batch_processor::TrailBatch;
use crate::config::{ClassifierConfig, FeatureSet};
use crate::error::{Result, TrailError};
use crate::kmeans::{kmeans, silhouette_score};
use crate::trail_analyzer::TrailMetrics;

const LABELS_3: [&str; 3] = ["Leve", "Moderada", "Pesada"];
const LABELS_4: [&str; 4] = ["Leve", "Moderada", "Pesada", "Extrema"];
const LABELS_5: [&str; 5] = ["Leve", "Moderada", "Pesada", "Muito Pesada", "Extrema"];

/// Ordered difficulty labels for `k` clusters, lightest first.
pub fn label_vocabulary(k: usize) -> Result<&'static [&'static str]> {
    match k {
        3 => Ok(&LABELS_3),
        4 => Ok(&LABELS_4),
        5 => Ok(&LABELS_5),
        other => Err(TrailError::UnsupportedClusterCount(other)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub cluster: usize,
    pub difficulty: String,
}

#[derive(Debug, Clone)]
pub struct ClassifiedTrail {
    pub metrics: TrailMetrics,
    /// `None` when a required feature was undefined for this trail.
    pub assignment: Option<ClusterAssignment>,
}

#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub difficulty: String,
    pub effort_score: f64,
    pub size: usize,
    /// Centroid in standardized feature space.
    pub centroid: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub trails: Vec<ClassifiedTrail>,
    /// Sorted from lightest to heaviest.
    pub clusters: Vec<ClusterSummary>,
    pub silhouette: Option<f64>,
    pub inertia: f64,
    pub features: FeatureSet,
}

impl ClassificationReport {
    pub fn assignment(&self, trail_name: &str) -> Option<&ClusterAssignment> {
        self.trails
            .iter()
            .find(|t| t.metrics.trail_name == trail_name)
            .and_then(|t| t.assignment.as_ref())
    }
}

pub fn feature_names(features: FeatureSet) -> &'static [&'static str] {
    match features {
        FeatureSet::PerKm => &["tempo_por_km", "ganho_por_km", "inclinacao_media_graus"],
        FeatureSet::MultiDay => &[
            "tempo_por_km_dia",
            "ganho_por_km",
            "inclinacao_media_dia_graus",
            "carga_acumulada",
        ],
        FeatureSet::Intensity => &[
            "intensidade_diaria",
            "dias_trilha",
            "indice_concentracao_esforco",
        ],
    }
}

/// Feature row for one trail, `None` if any value is undefined.
pub fn feature_vector(metrics: &TrailMetrics, features: FeatureSet) -> Option<Vec<f64>> {
    let row = match features {
        FeatureSet::PerKm => vec![
            metrics.pace_min_per_km()?,
            metrics.climb_m_per_km()?,
            metrics.mean_slope_deg,
        ],
        FeatureSet::MultiDay => {
            let pace = metrics.pace_per_day_km()?;
            vec![
                pace,
                metrics.climb_m_per_km()?,
                metrics.mean_slope_per_day_deg,
                metrics.day_count as f64 * pace,
            ]
        }
        FeatureSet::Intensity => vec![
            metrics.intensity_per_day,
            metrics.day_count as f64,
            metrics.effort_concentration_index,
        ],
    };

    row.iter().all(|v| v.is_finite()).then_some(row)
}

/// Zero mean, unit variance scaling fitted on one batch.
struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let n = rows.len() as f64;
        let dim = rows[0].len();

        let mean: Vec<f64> = (0..dim)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let scale = (0..dim)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                // Constant columns are centered but not scaled
                if var > 0.0 {
                    var.sqrt()
                } else {
                    1.0
                }
            })
            .collect();

        StandardScaler { mean, scale }
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|r| {
                r.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect()
    }
}

pub fn effort_score(centroid: &[f64]) -> f64 {
    centroid.iter().sum()
}

/// Label per raw cluster id, assigned in ascending effort order.
pub fn label_clusters(centroids: &[Vec<f64>]) -> Result<Vec<&'static str>> {
    let vocabulary = label_vocabulary(centroids.len())?;

    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| {
        effort_score(&centroids[a]).total_cmp(&effort_score(&centroids[b]))
    });

    let mut labels = vec![""; centroids.len()];
    for (rank, &cluster) in order.iter().enumerate() {
        labels[cluster] = vocabulary[rank];
    }
    Ok(labels)
}

pub fn classify(batch: &TrailBatch, config: &ClassifierConfig) -> Result<ClassificationReport> {
    let k = config.clusters;
    label_vocabulary(k)?;
    config.validate()?;

    let rows: Vec<(TrailMetrics, Option<Vec<f64>>)> = batch
        .iter()
        .map(|m| (m.clone(), feature_vector(m, config.features)))
        .collect();

    let eligible: Vec<Vec<f64>> = rows.iter().filter_map(|(_, f)| f.clone()).collect();
    let skipped = rows.len() - eligible.len();
    if skipped > 0 {
        info!("{} trails without complete features left unclassified", skipped);
    }
    if eligible.len() < k {
        return Err(TrailError::InsufficientTrails {
            trails: eligible.len(),
            clusters: k,
        });
    }

    let scaler = StandardScaler::fit(&eligible);
    let scaled = scaler.transform(&eligible);

    let result = kmeans(&scaled, k, config.n_init, config.max_iter, config.seed)?;
    debug!(
        "K-Means converged in {} iterations, inertia {:.4}",
        result.iterations, result.inertia
    );

    let labels = label_clusters(&result.centroids)?;

    let silhouette = silhouette_score(&scaled, &result.labels);
    match silhouette {
        Some(score) => info!("Silhouette score (k={}): {:.3}", k, score),
        None => info!("Silhouette score (k={}): undefined", k),
    }

    let mut cluster_ids = result.labels.iter();
    let trails: Vec<ClassifiedTrail> = rows
        .into_iter()
        .map(|(metrics, features)| {
            let assignment = features.and_then(|_| cluster_ids.next()).map(|&cluster| {
                ClusterAssignment {
                    cluster,
                    difficulty: labels[cluster].to_string(),
                }
            });
            ClassifiedTrail { metrics, assignment }
        })
        .collect();

    let mut clusters: Vec<ClusterSummary> = result
        .centroids
        .iter()
        .enumerate()
        .map(|(cluster, centroid)| ClusterSummary {
            cluster,
            difficulty: labels[cluster].to_string(),
            effort_score: effort_score(centroid),
            size: result.labels.iter().filter(|&&l| l == cluster).count(),
            centroid: centroid.clone(),
        })
        .collect();
    clusters.sort_by(|a, b| a.effort_score.total_cmp(&b.effort_score));

    for summary in &clusters {
        info!(
            "{:<13} cluster {} | {} trails | effort {:+.3}",
            summary.difficulty, summary.cluster, summary.size, summary.effort_score
        );
    }

    Ok(ClassificationReport {
        trails,
        clusters,
        silhouette,
        inertia: result.inertia,
        features: config.features,
    })
}
