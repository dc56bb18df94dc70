use emtrend_db::models::{Draw, Pool};
use serde::Serialize;

/// Nombre d'apparitions de chaque numéro du pool sur un ensemble de tirages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    pub pool: Pool,
    pub draws: usize,
    counts: Vec<u32>,
}

impl FrequencyTable {
    pub fn zeroed(pool: Pool) -> Self {
        Self {
            pool,
            draws: 0,
            counts: vec![0; pool.size()],
        }
    }

    pub fn count(&self, number: u8) -> u32 {
        if !self.pool.contains(number) {
            return 0;
        }
        self.counts[(number - 1) as usize]
    }

    /// Part des numéros tirés dans la fenêtre, en pourcentage.
    pub fn percentage(&self, number: u8) -> f64 {
        let picks = self.draws * self.pool.pick_count();
        if picks == 0 {
            return 0.0;
        }
        self.count(number) as f64 / picks as f64 * 100.0
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| ((i + 1) as u8, count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frequencies {
    pub balls: FrequencyTable,
    pub stars: FrequencyTable,
}

impl Frequencies {
    pub fn table(&self, pool: Pool) -> &FrequencyTable {
        match pool {
            Pool::Balls => &self.balls,
            Pool::Stars => &self.stars,
        }
    }

    pub fn draws(&self) -> usize {
        self.balls.draws
    }
}

pub fn count_pool(draws: &[Draw], pool: Pool) -> FrequencyTable {
    let mut table = FrequencyTable::zeroed(pool);
    table.draws = draws.len();

    for draw in draws {
        for &n in pool.numbers_from(draw) {
            if pool.contains(n) {
                table.counts[(n - 1) as usize] += 1;
            }
        }
    }

    table
}

/// Tables de fréquence des boules et des étoiles. Une liste vide donne des tables à zéro.
pub fn compute_frequencies(draws: &[Draw]) -> Frequencies {
    Frequencies {
        balls: count_pool(draws, Pool::Balls),
        stars: count_pool(draws, Pool::Stars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{draw_on, make_test_draws};

    #[test]
    fn test_counts_sum_to_picks() {
        let draws = make_test_draws(37);
        let freqs = compute_frequencies(&draws);
        assert_eq!(freqs.balls.total(), 5 * 37);
        assert_eq!(freqs.stars.total(), 2 * 37);
        assert_eq!(freqs.balls.len(), 50);
        assert_eq!(freqs.stars.len(), 12);
    }

    #[test]
    fn test_empty_draws_zero_filled() {
        let freqs = compute_frequencies(&[]);
        assert_eq!(freqs.draws(), 0);
        assert!(freqs.balls.iter().all(|(_, c)| c == 0));
        assert!(freqs.stars.iter().all(|(_, c)| c == 0));
        assert_eq!(freqs.balls.len(), 50);
        assert_eq!(freqs.balls.percentage(1), 0.0);
    }

    #[test]
    fn test_always_and_never_drawn() {
        let draws: Vec<_> = (0..10)
            .map(|i| draw_on(i, [7, 10 + i as u8, 20 + i as u8, 30 + i as u8, 43], [1, 2]))
            .collect();
        let freqs = compute_frequencies(&draws);
        assert_eq!(freqs.balls.count(7), 10);
        assert_eq!(freqs.balls.count(42), 0);
        assert_eq!(freqs.stars.count(1), 10);
        assert!((freqs.balls.percentage(7) - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_out_of_range_lookup_is_zero() {
        let freqs = compute_frequencies(&make_test_draws(5));
        assert_eq!(freqs.balls.count(0), 0);
        assert_eq!(freqs.balls.count(51), 0);
        assert_eq!(freqs.stars.count(13), 0);
    }

    #[test]
    fn test_idempotent() {
        let draws = make_test_draws(20);
        assert_eq!(compute_frequencies(&draws), compute_frequencies(&draws));
    }
}
