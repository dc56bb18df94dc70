use emtrend_db::models::{Draw, Pool};
use rand::SeedableRng;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;

use super::AnalysisError;
use super::features::{self, FEATURE_NAMES, FeatureRow};

/// En dessous de ce nombre de tirages, le modèle n'est pas entraîné.
pub const MIN_TRAINING_DRAWS: usize = 10;
pub const DEFAULT_LOOKBACK: usize = 10;
/// Nombre maximal de tirages cibles utilisés pour l'entraînement.
const MAX_TRAINING_TARGETS: usize = 100;

/// Score de tendance par numéro, normalisé (somme = 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendScores {
    pub pool: Pool,
    scores: Vec<f64>,
}

impl TrendScores {
    /// Applique un plancher puis normalise des scores bruts indexés à partir du numéro 1.
    pub fn from_raw(pool: Pool, mut scores: Vec<f64>) -> Self {
        let floor = 1e-6;
        for s in &mut scores {
            if !s.is_finite() || *s < floor {
                *s = floor;
            }
        }
        let total: f64 = scores.iter().sum();
        for s in &mut scores {
            *s /= total;
        }
        Self { pool, scores }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .map(|(i, &s)| ((i + 1) as u8, s))
    }

    /// Les `k` numéros les mieux notés (égalités : numéro croissant).
    pub fn top(&self, k: usize) -> Vec<u8> {
        let mut ranked: Vec<(u8, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(k).map(|(n, _)| n).collect()
    }
}

/// Forêt aléatoire entraînée à prédire la présence de chaque numéro au tirage
/// suivant à partir de son motif d'apparition récent.
#[derive(Debug, Clone)]
pub struct TrendModel {
    n_trees: usize,
    max_depth: usize,
    seed: u64,
}

impl Default for TrendModel {
    fn default() -> Self {
        Self::new(30, 5, 42)
    }
}

/// Fenêtre réellement observée : au moins un tirage, au plus tout l'historique.
pub fn effective_lookback(lookback: usize, available: usize) -> usize {
    lookback.clamp(1, available.max(1))
}

impl TrendModel {
    pub fn new(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        Self { n_trees, max_depth, seed }
    }

    /// Scores pour le prochain tirage. `history[0]` = tirage le plus récent.
    /// La fenêtre `lookback` est ramenée à l'historique disponible.
    pub fn score(&self, history: &[Draw], lookback: usize, pool: Pool) -> Result<TrendScores, AnalysisError> {
        if history.len() < MIN_TRAINING_DRAWS {
            return Err(AnalysisError::InsufficientData {
                needed: MIN_TRAINING_DRAWS,
                available: history.len(),
            });
        }
        let lookback = effective_lookback(lookback, history.len());

        let targets = (history.len() - 1).min(MAX_TRAINING_TARGETS);
        let rows: Vec<FeatureRow> = (0..targets)
            .flat_map(|t| features::training_rows(history, pool, t, lookback))
            .collect();

        let features_per_split = (FEATURE_NAMES.len() as f64).sqrt().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut forest = Vec::with_capacity(self.n_trees);

        for _ in 0..self.n_trees {
            let mut sample: Vec<Sample<'_>> = (0..rows.len())
                .map(|_| Sample::from(&rows[rng.random_range(0..rows.len())]))
                .collect();
            forest.push(grow(&mut sample, self.max_depth, features_per_split, &mut rng));
        }

        let scores = features::prediction_rows(history, pool, lookback)
            .iter()
            .map(|row| {
                let sum: f64 = forest.iter().map(|tree| tree.likelihood(row)).sum();
                sum / self.n_trees.max(1) as f64
            })
            .collect();

        log::debug!(
            target: super::LOG_TARGET,
            "forêt de {} arbres entraînée sur {} lignes ({pool}, lookback {lookback})",
            forest.len(),
            rows.len()
        );

        Ok(TrendScores::from_raw(pool, scores))
    }
}

/// En dessous de cette taille, un noeud n'est plus découpé.
const MIN_SPLIT: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Sample<'a> {
    features: &'a [f64],
    present: bool,
}

impl<'a> From<&'a FeatureRow> for Sample<'a> {
    fn from(row: &'a FeatureRow) -> Self {
        Self {
            features: &row.features,
            present: row.present,
        }
    }
}

/// Arbre de décision binaire ; chaque feuille garde ses effectifs
/// (numéros sortis / lignes vues).
#[derive(Debug)]
enum Node {
    Leaf { present: usize, total: usize },
    Split {
        feature: usize,
        threshold: f64,
        below: Box<Node>,
        above: Box<Node>,
    },
}

impl Node {
    /// Probabilité de sortie lissée (Laplace) de la feuille atteinte.
    fn likelihood(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf { present, total } => (*present as f64 + 1.0) / (*total as f64 + 2.0),
            Node::Split { feature, threshold, below, above } => {
                if row[*feature] <= *threshold {
                    below.likelihood(row)
                } else {
                    above.likelihood(row)
                }
            }
        }
    }
}

fn gini(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = present as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

fn sort_by_feature(sample: &mut [Sample<'_>], feature: usize) {
    sample.sort_by(|a, b| a.features[feature].total_cmp(&b.features[feature]));
}

/// Meilleure coupe (impureté pondérée, feature, seuil) parmi les features
/// tirées : balayage des valeurs triées avec des effectifs cumulés.
fn best_split(sample: &mut [Sample<'_>], candidates: &[usize], present: usize) -> Option<(f64, usize, f64)> {
    let total = sample.len();
    let mut best: Option<(f64, usize, f64)> = None;

    for &feature in candidates {
        sort_by_feature(sample, feature);
        let mut present_below = 0;

        for i in 0..total - 1 {
            if sample[i].present {
                present_below += 1;
            }
            let (low, high) = (sample[i].features[feature], sample[i + 1].features[feature]);
            if low == high {
                continue;
            }

            let below = i + 1;
            let above = total - below;
            let impurity = (below as f64 * gini(present_below, below)
                + above as f64 * gini(present - present_below, above))
                / total as f64;

            if best.is_none_or(|(b, _, _)| impurity < b) {
                best = Some((impurity, feature, (low + high) / 2.0));
            }
        }
    }

    best
}

fn grow(sample: &mut [Sample<'_>], depth: usize, features_per_split: usize, rng: &mut StdRng) -> Node {
    let total = sample.len();
    let present = sample.iter().filter(|s| s.present).count();
    let leaf = Node::Leaf { present, total };

    if depth == 0 || total < MIN_SPLIT || present == 0 || present == total {
        return leaf;
    }

    let mut candidates: Vec<usize> = (0..sample[0].features.len()).collect();
    candidates.shuffle(rng);
    candidates.truncate(features_per_split);

    match best_split(sample, &candidates, present) {
        Some((impurity, feature, threshold)) if impurity < gini(present, total) => {
            sort_by_feature(sample, feature);
            let cut = sample.partition_point(|s| s.features[feature] <= threshold);
            let (below, above) = sample.split_at_mut(cut);
            Node::Split {
                feature,
                threshold,
                below: Box::new(grow(below, depth - 1, features_per_split, rng)),
                above: Box::new(grow(above, depth - 1, features_per_split, rng)),
            }
        }
        _ => leaf,
    }
}
