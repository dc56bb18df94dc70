use emtrend_db::models::{Draw, Pool};

pub const FEATURE_NAMES: &[&str] = &[
    "last_draw",
    "freq_recent",
    "freq_lookback",
    "gap_norm",
    "trend",
    "mean_gap_norm",
    "decade_density",
];

#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub features: Vec<f64>,
    pub present: bool,
}

/// Lignes d'entraînement pour le tirage `target_idx` : motif d'apparition de chaque
/// numéro sur les `lookback` tirages qui le précèdent, `present` = sorti dans la cible.
/// draws[0] = le plus récent.
pub fn training_rows(draws: &[Draw], pool: Pool, target_idx: usize, lookback: usize) -> Vec<FeatureRow> {
    let target = pool.numbers_from(&draws[target_idx]);
    let history = preceding(draws, target_idx + 1, lookback);

    (1..=pool.size() as u8)
        .map(|number| FeatureRow {
            features: pattern_features(number, history, pool),
            present: target.contains(&number),
        })
        .collect()
}

/// Vecteurs de features pour prédire le prochain tirage, à partir des plus récents.
pub fn prediction_rows(draws: &[Draw], pool: Pool, lookback: usize) -> Vec<Vec<f64>> {
    let history = preceding(draws, 0, lookback);
    (1..=pool.size() as u8)
        .map(|number| pattern_features(number, history, pool))
        .collect()
}

fn preceding(draws: &[Draw], start: usize, lookback: usize) -> &[Draw] {
    if start >= draws.len() {
        return &[];
    }
    let end = (start + lookback).min(draws.len());
    &draws[start..end]
}

fn pattern_features(number: u8, history: &[Draw], pool: Pool) -> Vec<f64> {
    let w = history.len();
    let recent = w.div_ceil(2);

    let last_draw = match history.first() {
        Some(draw) if pool.numbers_from(draw).contains(&number) => 1.0,
        _ => 0.0,
    };
    let freq_recent = frequency_in_window(number, history, pool, recent);
    let freq_lookback = frequency_in_window(number, history, pool, w);
    let gap_norm = if w > 0 { current_gap(number, history, pool) as f64 / w as f64 } else { 1.0 };
    let trend = freq_recent - freq_lookback;
    let mean_gap_norm = if w > 0 { mean_gap(number, history, pool) / w as f64 } else { 1.0 };
    let decade_density = decade_density(number, history, pool);

    vec![
        last_draw,      // 0
        freq_recent,    // 1
        freq_lookback,  // 2
        gap_norm,       // 3
        trend,          // 4
        mean_gap_norm,  // 5
        decade_density, // 6
    ]
}

fn frequency_in_window(number: u8, history: &[Draw], pool: Pool, window: usize) -> f64 {
    let w = window.min(history.len());
    if w == 0 {
        return 0.0;
    }
    let count = history[..w]
        .iter()
        .filter(|d| pool.numbers_from(d).contains(&number))
        .count();
    count as f64 / w as f64
}

fn current_gap(number: u8, history: &[Draw], pool: Pool) -> usize {
    history
        .iter()
        .position(|d| pool.numbers_from(d).contains(&number))
        .unwrap_or(history.len())
}

fn mean_gap(number: u8, history: &[Draw], pool: Pool) -> f64 {
    let seen: Vec<usize> = history
        .iter()
        .enumerate()
        .filter(|(_, d)| pool.numbers_from(d).contains(&number))
        .map(|(i, _)| i)
        .collect();

    if seen.len() < 2 {
        return history.len() as f64;
    }
    let gaps: usize = seen.windows(2).map(|pair| pair[1] - pair[0]).sum();
    gaps as f64 / (seen.len() - 1) as f64
}

fn decade_density(number: u8, history: &[Draw], pool: Pool) -> f64 {
    let decade_start = ((number - 1) / 10) * 10 + 1;
    let decade_end = (decade_start + 9).min(pool.size() as u8);
    let decade_size = (decade_end - decade_start + 1) as f64;

    if history.is_empty() {
        return 0.0;
    }

    let count = history
        .iter()
        .flat_map(|d| pool.numbers_from(d).iter())
        .filter(|&&n| n >= decade_start && n <= decade_end)
        .count();

    count as f64 / (history.len() as f64 * decade_size)
}
