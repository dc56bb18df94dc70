use emtrend_db::models::Pool;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use super::AnalysisError;
use super::classify::{Band, Bands, Classification};
use super::trend::TrendScores;
use super::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Hot,
    Cold,
    #[default]
    Balanced,
    Mixed,
    Ml,
}

impl Strategy {
    pub const FREQUENCY: [Strategy; 4] = [Strategy::Hot, Strategy::Cold, Strategy::Balanced, Strategy::Mixed];

    /// Quotas (bande, nombre) par pool. `ml` retombe sur les quotas équilibrés.
    pub fn quotas(&self, pool: Pool) -> &'static [(Band, usize)] {
        match (self, pool) {
            (Strategy::Hot, Pool::Balls) => &[(Band::Hot, 5)],
            (Strategy::Hot, Pool::Stars) => &[(Band::Hot, 2)],
            (Strategy::Cold, Pool::Balls) => &[(Band::Cold, 5)],
            (Strategy::Cold, Pool::Stars) => &[(Band::Cold, 2)],
            (Strategy::Balanced | Strategy::Ml, Pool::Balls) => {
                &[(Band::Hot, 2), (Band::Warm, 1), (Band::Cool, 1), (Band::Cold, 1)]
            }
            (Strategy::Balanced | Strategy::Ml, Pool::Stars) => &[(Band::Hot, 1), (Band::Cold, 1)],
            (Strategy::Mixed, Pool::Balls) => &[(Band::Hot, 2), (Band::Cold, 3)],
            (Strategy::Mixed, Pool::Stars) => &[(Band::Hot, 1), (Band::Cold, 1)],
        }
    }

    /// Les stratégies extrêmes retiennent toujours le numéro le plus extrême de leur bande.
    fn keeps_extreme(&self) -> bool {
        matches!(self, Strategy::Hot | Strategy::Cold)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Hot => write!(f, "hot"),
            Strategy::Cold => write!(f, "cold"),
            Strategy::Balanced => write!(f, "balanced"),
            Strategy::Mixed => write!(f, "mixed"),
            Strategy::Ml => write!(f, "ml"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub requested: Strategy,
    pub applied: Strategy,
    pub window: Window,
    pub lookback: Option<usize>,
    pub balls: [u8; 5],
    pub stars: [u8; 2],
    pub fallback: Option<String>,
}

impl Recommendation {
    pub fn with_fallback(mut self, requested: Strategy, reason: String) -> Self {
        self.requested = requested;
        self.fallback = Some(reason);
        self
    }
}

fn extreme_of(members: &[u8], band: Band) -> Option<u8> {
    match band {
        Band::Hot | Band::Warm => members.first().copied(),
        Band::Cool | Band::Cold => members.last().copied(),
    }
}

/// Tirage uniforme sans remise selon les quotas ; une bande trop petite est
/// complétée par ses voisines dans l'ordre de `Band::widening`.
pub fn pick_from_bands(
    classification: &Classification,
    quotas: &[(Band, usize)],
    keep_extreme: bool,
    rng: &mut StdRng,
) -> Result<Vec<u8>, AnalysisError> {
    let pool = classification.pool;
    let mut selected: Vec<u8> = Vec::with_capacity(pool.pick_count());

    for &(band, count) in quotas {
        let mut needed = count;

        if keep_extreme && needed > 0 {
            let members = classification.members(band);
            if let Some(lead) = extreme_of(&members, band).filter(|n| !selected.contains(n)) {
                selected.push(lead);
                needed -= 1;
            }
        }

        for candidate in band.widening() {
            if needed == 0 {
                break;
            }
            let available: Vec<u8> = classification
                .members(candidate)
                .into_iter()
                .filter(|n| !selected.contains(n))
                .collect();
            if candidate != band && !available.is_empty() {
                log::debug!(
                    target: super::LOG_TARGET,
                    "bande {band} insuffisante pour les {pool}, élargie à {candidate}"
                );
            }
            let take = needed.min(available.len());
            selected.extend(available.choose_multiple(rng, take).copied());
            needed -= take;
        }

        if needed > 0 {
            return Err(AnalysisError::EmptyPool { pool });
        }
    }

    selected.sort();
    Ok(selected)
}

/// Tirage pondéré sans remise, proportionnel aux scores.
pub fn pick_weighted(scores: &TrendScores, count: usize, rng: &mut StdRng) -> Result<Vec<u8>, AnalysisError> {
    let pool = scores.pool;
    let mut available: Vec<(u8, f64)> = scores.iter().collect();
    let mut selected = Vec::with_capacity(count);

    for _ in 0..count {
        let weights: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| AnalysisError::EmptyPool { pool })?;
        let idx = dist.sample(rng);
        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    selected.sort();
    Ok(selected)
}

fn into_ticket(balls: Vec<u8>, stars: Vec<u8>) -> Result<([u8; 5], [u8; 2]), AnalysisError> {
    let balls: [u8; 5] = balls
        .try_into()
        .map_err(|_| AnalysisError::EmptyPool { pool: Pool::Balls })?;
    let stars: [u8; 2] = stars
        .try_into()
        .map_err(|_| AnalysisError::EmptyPool { pool: Pool::Stars })?;
    Ok((balls, stars))
}

pub fn recommend_from_bands(
    strategy: Strategy,
    bands: &Bands,
    window: Window,
    rng: &mut StdRng,
) -> Result<Recommendation, AnalysisError> {
    let keep_extreme = strategy.keeps_extreme();
    let balls = pick_from_bands(&bands.balls, strategy.quotas(Pool::Balls), keep_extreme, rng)?;
    let stars = pick_from_bands(&bands.stars, strategy.quotas(Pool::Stars), keep_extreme, rng)?;
    let (balls, stars) = into_ticket(balls, stars)?;

    Ok(Recommendation {
        requested: strategy,
        applied: strategy,
        window,
        lookback: None,
        balls,
        stars,
        fallback: None,
    })
}

pub fn recommend_from_scores(
    ball_scores: &TrendScores,
    star_scores: &TrendScores,
    window: Window,
    lookback: usize,
    rng: &mut StdRng,
) -> Result<Recommendation, AnalysisError> {
    let balls = pick_weighted(ball_scores, Pool::Balls.pick_count(), rng)?;
    let stars = pick_weighted(star_scores, Pool::Stars.pick_count(), rng)?;
    let (balls, stars) = into_ticket(balls, stars)?;

    Ok(Recommendation {
        requested: Strategy::Ml,
        applied: Strategy::Ml,
        window,
        lookback: Some(lookback),
        balls,
        stars,
        fallback: None,
    })
}
