pub mod classify;
pub mod evaluate;
pub mod features;
pub mod frequency;
pub mod recommend;
pub mod trend;
pub mod window;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use serde::Serialize;

use emtrend_db::models::{Draw, Pool};
use emtrend_db::store::DrawStore;

use crate::analysis::classify::{Band, Bands, classify_all};
use crate::analysis::evaluate::{EvaluationPoint, walk_forward};
use crate::analysis::frequency::{Frequencies, compute_frequencies};
use crate::analysis::recommend::{Recommendation, Strategy, recommend_from_bands, recommend_from_scores};
use crate::analysis::trend::{DEFAULT_LOOKBACK, TrendModel, effective_lookback};
use crate::analysis::window::Window;

pub const LOG_TARGET: &str = "emtrend";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Données insuffisantes : {needed} tirages requis, {available} disponibles")]
    InsufficientData { needed: usize, available: usize },
    #[error("Période inconnue : `{0}` (attendu : 3months, 6months, year, 10years, all)")]
    InvalidWindow(String),
    #[error("Pas assez de numéros éligibles pour compléter la grille ({pool})")]
    EmptyPool { pool: Pool },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct HotColdSummary {
    pub window: Window,
    pub draws_analyzed: usize,
    pub total_draws: usize,
    pub first_draw: Option<NaiveDate>,
    pub last_draw: Option<NaiveDate>,
    pub hottest_balls: Vec<u8>,
    pub coldest_balls: Vec<u8>,
    pub hottest_stars: Vec<u8>,
    pub coldest_stars: Vec<u8>,
}

/// Point d'entrée de l'analyse : lit les tirages dans le magasin fourni,
/// relativement à la date `today`.
pub struct Analyzer<'a, S: DrawStore + ?Sized> {
    store: &'a S,
    today: NaiveDate,
    trend: TrendModel,
}

impl<'a, S: DrawStore + ?Sized> Analyzer<'a, S> {
    pub fn new(store: &'a S, today: NaiveDate) -> Self {
        Self {
            store,
            today,
            trend: TrendModel::default(),
        }
    }

    /// Tirages de la fenêtre, du plus récent au plus ancien.
    pub fn draws_in(&self, window: Window) -> Result<Vec<Draw>, AnalysisError> {
        let draws = self.store.fetch_draws(window.since(self.today), None)?;
        log::debug!(target: LOG_TARGET, "{} tirages dans la fenêtre {window}", draws.len());
        Ok(draws)
    }

    pub fn compute_frequencies(&self, window: Window) -> Result<Frequencies, AnalysisError> {
        Ok(compute_frequencies(&self.draws_in(window)?))
    }

    pub fn classify(&self, window: Window) -> Result<(Frequencies, Bands), AnalysisError> {
        let frequencies = self.compute_frequencies(window)?;
        let bands = classify_all(&frequencies);
        Ok((frequencies, bands))
    }

    /// Grille 5+2 selon la stratégie. `ml` retombe sur `balanced` si le modèle
    /// ne peut pas être entraîné sur les tirages de la fenêtre.
    pub fn recommend(
        &self,
        strategy: Strategy,
        window: Window,
        lookback: Option<usize>,
        rng: &mut StdRng,
    ) -> Result<Recommendation, AnalysisError> {
        if strategy != Strategy::Ml {
            return self.frequency_recommendation(strategy, window, rng);
        }

        let lookback = lookback.unwrap_or(DEFAULT_LOOKBACK);
        match self.ml_recommendation(window, lookback, rng) {
            Ok(rec) => Ok(rec),
            Err(AnalysisError::InsufficientData { needed, available }) => {
                log::warn!(
                    target: LOG_TARGET,
                    "modèle non entraînable ({available} tirages sur {needed} requis), repli sur balanced"
                );
                let rec = self.frequency_recommendation(Strategy::Balanced, window, rng)?;
                Ok(rec.with_fallback(
                    Strategy::Ml,
                    format!("données insuffisantes : {available} tirages sur {needed} requis"),
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn frequency_recommendation(
        &self,
        strategy: Strategy,
        window: Window,
        rng: &mut StdRng,
    ) -> Result<Recommendation, AnalysisError> {
        let (frequencies, bands) = self.classify(window)?;
        if frequencies.draws() == 0 {
            log::warn!(target: LOG_TARGET, "aucun tirage dans la fenêtre {window}, bandes en ordre numérique");
        }
        recommend_from_bands(strategy, &bands, window, rng)
    }

    pub fn ml_recommendation(
        &self,
        window: Window,
        lookback: usize,
        rng: &mut StdRng,
    ) -> Result<Recommendation, AnalysisError> {
        let history = self.draws_in(window)?;
        let balls = self.trend.score(&history, lookback, Pool::Balls)?;
        let stars = self.trend.score(&history, lookback, Pool::Stars)?;
        recommend_from_scores(&balls, &stars, window, effective_lookback(lookback, history.len()), rng)
    }

    /// Plusieurs grilles : le modèle d'abord s'il est entraînable, puis chaque
    /// stratégie de fréquence sur les fenêtres standard.
    pub fn combine_strategies(
        &self,
        count: usize,
        lookback: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        let mut recommendations = Vec::with_capacity(count);
        if count == 0 {
            return Ok(recommendations);
        }

        match self.ml_recommendation(Window::All, lookback, rng) {
            Ok(rec) => recommendations.push(rec),
            Err(AnalysisError::InsufficientData { available, .. }) => {
                log::warn!(target: LOG_TARGET, "grille ml ignorée : {available} tirages seulement");
            }
            Err(e) => return Err(e),
        }

        let combos = Window::STANDARD
            .into_iter()
            .flat_map(|w| Strategy::FREQUENCY.into_iter().map(move |s| (s, w)));
        for (strategy, window) in combos {
            if recommendations.len() >= count {
                break;
            }
            recommendations.push(self.frequency_recommendation(strategy, window, rng)?);
        }

        Ok(recommendations)
    }

    pub fn hot_cold_summary(&self, window: Window) -> Result<HotColdSummary, AnalysisError> {
        let all = self.store.fetch_draws(None, None)?;
        let (frequencies, bands) = self.classify(window)?;

        let mut coldest_balls = bands.balls.members(Band::Cold);
        coldest_balls.reverse();
        let mut coldest_stars = bands.stars.members(Band::Cold);
        coldest_stars.reverse();

        Ok(HotColdSummary {
            window,
            draws_analyzed: frequencies.draws(),
            total_draws: all.len(),
            first_draw: all.last().map(|d| d.draw_date),
            last_draw: all.first().map(|d| d.draw_date),
            hottest_balls: bands.balls.members(Band::Hot),
            coldest_balls,
            hottest_stars: bands.stars.members(Band::Hot),
            coldest_stars,
        })
    }

    /// Validation glissante du modèle pour chaque fenêtre d'apprentissage.
    pub fn evaluate_trend(&self, lookbacks: &[usize], holdout: usize) -> Result<Vec<EvaluationPoint>, AnalysisError> {
        let history = self.draws_in(Window::All)?;
        lookbacks
            .iter()
            .map(|&lookback| walk_forward(&self.trend, &history, lookback, holdout))
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn draw_on(days_ago: i64, balls: [u8; 5], stars: [u8; 2]) -> Draw {
    let reference = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    Draw::new(reference - chrono::Duration::days(days_ago), balls, stars).unwrap()
}

/// `n` tirages réguliers, draws[0] = le plus récent.
#[cfg(test)]
pub(crate) fn make_test_draws(n: usize) -> Vec<Draw> {
    (0..n)
        .map(|i| {
            let base = (i % 10) as u8;
            draw_on(
                (i * 3) as i64,
                [base * 5 + 1, base * 5 + 2, base * 5 + 3, base * 5 + 4, base * 5 + 5],
                [base % 12 + 1, (base + 1) % 12 + 1],
            )
        })
        .collect()
}

/// Dix tirages où le 7 sort à chaque fois et le 42 jamais ; le 42 est le
/// dernier du classement.
#[cfg(test)]
pub(crate) fn extremes_fixture() -> Vec<Draw> {
    (0..10u8)
        .map(|i| draw_on(i as i64 * 3, [7, 11 + i, 21 + i, 31 + i, 43 + i % 8], [1, 2 + i]))
        .collect()
}

/// 5 boules distinctes triées dans 1-50, 2 étoiles distinctes dans 1-12.
#[cfg(test)]
pub(crate) fn assert_valid_ticket(rec: &Recommendation) {
    assert!(rec.balls.windows(2).all(|w| w[0] < w[1]), "boules non triées ou en double : {:?}", rec.balls);
    assert!(rec.balls.iter().all(|&b| Pool::Balls.contains(b)), "boule hors limites : {:?}", rec.balls);
    assert_ne!(rec.stars[0], rec.stars[1]);
    assert!(rec.stars.iter().all(|&s| Pool::Stars.contains(s)), "étoile hors limites : {:?}", rec.stars);
}

#[cfg(test)]
mod tests {
    use super::*;
    use emtrend_db::store::MemoryStore;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_window_filters_frequencies() {
        // Un tirage tous les 3 jours, le plus récent le 28/06/2024
        let store = MemoryStore::new(make_test_draws(200));
        let analyzer = Analyzer::new(&store, today());

        let all = analyzer.compute_frequencies(Window::All).unwrap();
        assert_eq!(all.draws(), 200);
        assert_eq!(all.balls.total(), 1000);

        let quarter = analyzer.compute_frequencies(Window::ThreeMonths).unwrap();
        // 91 jours en arrière : 31/03/2024 ; tirages à 2, 5, ..., 89 jours
        assert_eq!(quarter.draws(), 30);
        assert_eq!(quarter.stars.total(), 60);
    }

    #[test]
    fn test_example_hot_and_cold() {
        let store = MemoryStore::new(extremes_fixture());
        let analyzer = Analyzer::new(&store, today());

        let freqs = analyzer.compute_frequencies(Window::Year).unwrap();
        assert_eq!(freqs.balls.count(7), 10);
        assert_eq!(freqs.balls.count(42), 0);

        let mut rng = StdRng::seed_from_u64(2024);
        let hot = analyzer.recommend(Strategy::Hot, Window::Year, None, &mut rng).unwrap();
        assert!(hot.balls.contains(&7));
        let cold = analyzer.recommend(Strategy::Cold, Window::Year, None, &mut rng).unwrap();
        assert!(cold.balls.contains(&42));
    }

    #[test]
    fn test_same_seed_same_recommendation() {
        let store = MemoryStore::new(make_test_draws(150));
        let analyzer = Analyzer::new(&store, today());
        let a = analyzer
            .recommend(Strategy::Hot, Window::Year, None, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = analyzer
            .recommend(Strategy::Hot, Window::Year, None, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ml_falls_back_on_empty_window() {
        let store = MemoryStore::new(Vec::new());
        let analyzer = Analyzer::new(&store, today());
        let mut rng = StdRng::seed_from_u64(1);

        let rec = analyzer.recommend(Strategy::Ml, Window::ThreeMonths, Some(10), &mut rng).unwrap();
        assert_eq!(rec.requested, Strategy::Ml);
        assert_eq!(rec.applied, Strategy::Balanced);
        assert!(rec.fallback.is_some());

        let err = analyzer.ml_recommendation(Window::All, 10, &mut rng).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { needed: 10, available: 0 }));
    }

    #[test]
    fn test_ml_with_enough_history() {
        let store = MemoryStore::new(make_test_draws(40));
        let analyzer = Analyzer::new(&store, today());
        let mut rng = StdRng::seed_from_u64(3);

        let rec = analyzer.recommend(Strategy::Ml, Window::All, Some(15), &mut rng).unwrap();
        assert_eq!(rec.applied, Strategy::Ml);
        assert_eq!(rec.lookback, Some(15));
        assert!(rec.fallback.is_none());
        assert!(rec.balls.windows(2).all(|w| w[0] < w[1]));
        assert_ne!(rec.stars[0], rec.stars[1]);
    }

    #[test]
    fn test_ml_ticket_valid_for_any_history() {
        for n in [0, 9, 10, 60] {
            let store = MemoryStore::new(make_test_draws(n));
            let analyzer = Analyzer::new(&store, today());
            for seed in 0..5 {
                let mut rng = StdRng::seed_from_u64(seed);
                let rec = analyzer.recommend(Strategy::Ml, Window::All, None, &mut rng).unwrap();
                assert_valid_ticket(&rec);
                assert_eq!(rec.requested, Strategy::Ml);
                let expected = if n < 10 { Strategy::Balanced } else { Strategy::Ml };
                assert_eq!(rec.applied, expected, "{n} tirages");
                assert_eq!(rec.fallback.is_some(), n < 10);
            }
        }
    }

    #[test]
    fn test_ml_records_clamped_lookback() {
        let store = MemoryStore::new(make_test_draws(40));
        let analyzer = Analyzer::new(&store, today());
        let mut rng = StdRng::seed_from_u64(8);

        let rec = analyzer.recommend(Strategy::Ml, Window::All, Some(0), &mut rng).unwrap();
        assert_eq!(rec.lookback, Some(1));
        let rec = analyzer.recommend(Strategy::Ml, Window::All, Some(500), &mut rng).unwrap();
        assert_eq!(rec.lookback, Some(40));
    }

    #[test]
    fn test_combine_strategies() {
        let store = MemoryStore::new(make_test_draws(60));
        let analyzer = Analyzer::new(&store, today());
        let mut rng = StdRng::seed_from_u64(5);

        let recs = analyzer.combine_strategies(5, 10, &mut rng).unwrap();
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[0].applied, Strategy::Ml);
        let rest: Vec<(Strategy, Window)> = recs[1..].iter().map(|r| (r.applied, r.window)).collect();
        assert_eq!(
            rest,
            vec![
                (Strategy::Hot, Window::ThreeMonths),
                (Strategy::Cold, Window::ThreeMonths),
                (Strategy::Balanced, Window::ThreeMonths),
                (Strategy::Mixed, Window::ThreeMonths),
            ]
        );
    }

    #[test]
    fn test_combine_without_model() {
        let store = MemoryStore::new(make_test_draws(4));
        let analyzer = Analyzer::new(&store, today());
        let recs = analyzer.combine_strategies(3, 10, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.applied != Strategy::Ml));
        assert!(analyzer.combine_strategies(0, 10, &mut StdRng::seed_from_u64(5)).unwrap().is_empty());
    }

    #[test]
    fn test_hot_cold_summary() {
        let store = MemoryStore::new(extremes_fixture());
        let analyzer = Analyzer::new(&store, today());
        let summary = analyzer.hot_cold_summary(Window::All).unwrap();

        assert_eq!(summary.total_draws, 10);
        assert_eq!(summary.draws_analyzed, 10);
        assert_eq!(summary.hottest_balls[0], 7);
        assert_eq!(summary.coldest_balls[0], 42);
        assert_eq!(summary.hottest_balls.len(), 10);
        assert_eq!(summary.hottest_stars, vec![1, 2]);
        assert_eq!(summary.last_draw, NaiveDate::from_ymd_opt(2024, 6, 28));
        assert_eq!(summary.first_draw, NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn test_evaluate_trend() {
        let store = MemoryStore::new(make_test_draws(25));
        let analyzer = Analyzer::new(&store, today());
        let points = analyzer.evaluate_trend(&[5, 10], 3).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].lookback, 10);
        assert_eq!(points[0].holdout, 3);
    }
}
