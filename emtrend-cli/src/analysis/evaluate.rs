use emtrend_db::models::{Draw, Pool};
use serde::Serialize;

use super::AnalysisError;
use super::trend::{MIN_TRAINING_DRAWS, TrendModel};

pub const DEFAULT_LOOKBACKS: &str = "5,10,15,20,25";
pub const DEFAULT_HOLDOUT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationPoint {
    pub lookback: usize,
    pub holdout: usize,
    pub ball_hit_rate: f64,
    pub star_hit_rate: f64,
}

/// Taux de réussite d'une grille tirée au hasard : 5/50 et 2/12.
pub fn baseline(pool: Pool) -> f64 {
    pool.pick_count() as f64 / pool.size() as f64
}

fn hits(predicted: &[u8], actual: &[u8]) -> usize {
    predicted.iter().filter(|n| actual.contains(n)).count()
}

/// Validation glissante : pour chacun des `holdout` derniers tirages, le modèle
/// est entraîné sur les tirages strictement plus anciens et ses meilleurs numéros
/// sont comparés au tirage réel.
pub fn walk_forward(
    model: &TrendModel,
    draws: &[Draw],
    lookback: usize,
    holdout: usize,
) -> Result<EvaluationPoint, AnalysisError> {
    let holdout = holdout.min(draws.len().saturating_sub(MIN_TRAINING_DRAWS));
    if holdout == 0 {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_TRAINING_DRAWS + 1,
            available: draws.len(),
        });
    }

    let mut ball_hits = 0;
    let mut star_hits = 0;

    for h in 0..holdout {
        let target = &draws[h];
        let history = &draws[h + 1..];

        let balls = model.score(history, lookback, Pool::Balls)?;
        let stars = model.score(history, lookback, Pool::Stars)?;

        ball_hits += hits(&balls.top(Pool::Balls.pick_count()), &target.balls);
        star_hits += hits(&stars.top(Pool::Stars.pick_count()), &target.stars);
    }

    Ok(EvaluationPoint {
        lookback,
        holdout,
        ball_hit_rate: ball_hits as f64 / (holdout * Pool::Balls.pick_count()) as f64,
        star_hit_rate: star_hits as f64 / (holdout * Pool::Stars.pick_count()) as f64,
    })
}

pub fn parse_lookbacks(raw: &str) -> Result<Vec<usize>, std::num::ParseIntError> {
    raw.split(',')
        .map(|s| s.trim().parse::<usize>())
        .collect()
}
