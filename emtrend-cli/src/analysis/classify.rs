use emtrend_db::models::Pool;
use serde::Serialize;

use super::frequency::{Frequencies, FrequencyTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Hot,
    Warm,
    Cool,
    Cold,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Hot, Band::Warm, Band::Cool, Band::Cold];

    /// La bande elle-même puis ses voisines, de la plus proche à la plus éloignée.
    pub fn widening(&self) -> [Band; 4] {
        match self {
            Band::Hot => [Band::Hot, Band::Warm, Band::Cool, Band::Cold],
            Band::Warm => [Band::Warm, Band::Hot, Band::Cool, Band::Cold],
            Band::Cool => [Band::Cool, Band::Cold, Band::Warm, Band::Hot],
            Band::Cold => [Band::Cold, Band::Cool, Band::Warm, Band::Hot],
        }
    }

    fn index(&self) -> usize {
        match self {
            Band::Hot => 0,
            Band::Warm => 1,
            Band::Cool => 2,
            Band::Cold => 3,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Hot => write!(f, "HOT"),
            Band::Warm => write!(f, "WARM"),
            Band::Cool => write!(f, "COOL"),
            Band::Cold => write!(f, "COLD"),
        }
    }
}

/// Rangs de coupure (20e, 50e et 80e centile), arrondis à l'inférieur.
pub fn cutoffs(size: usize) -> [usize; 3] {
    [size * 20 / 100, size * 50 / 100, size * 80 / 100]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub pool: Pool,
    ranked: Vec<u8>,
    bands: Vec<Band>,
}

impl Classification {
    pub fn band_of(&self, number: u8) -> Option<Band> {
        if !self.pool.contains(number) {
            return None;
        }
        Some(self.bands[(number - 1) as usize])
    }

    /// Numéros de la bande, du plus fréquent au moins fréquent.
    pub fn members(&self, band: Band) -> Vec<u8> {
        self.ranked
            .iter()
            .copied()
            .filter(|&n| self.bands[(n - 1) as usize] == band)
            .collect()
    }

    pub fn sizes(&self) -> [usize; 4] {
        let mut sizes = [0; 4];
        for band in &self.bands {
            sizes[band.index()] += 1;
        }
        sizes
    }

    /// Tous les numéros du pool, du plus fréquent au moins fréquent.
    pub fn ranked(&self) -> &[u8] {
        &self.ranked
    }
}

/// Range les numéros par fréquence décroissante (égalités : numéro croissant)
/// puis découpe le classement en quatre bandes contiguës.
pub fn classify(table: &FrequencyTable) -> Classification {
    let mut ranked: Vec<(u8, u32)> = table.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let [hot_end, warm_end, cool_end] = cutoffs(ranked.len());
    let mut bands = vec![Band::Cold; table.len()];

    for (rank, &(number, _)) in ranked.iter().enumerate() {
        let band = if rank < hot_end {
            Band::Hot
        } else if rank < warm_end {
            Band::Warm
        } else if rank < cool_end {
            Band::Cool
        } else {
            Band::Cold
        };
        bands[(number - 1) as usize] = band;
    }

    Classification {
        pool: table.pool,
        ranked: ranked.into_iter().map(|(n, _)| n).collect(),
        bands,
    }
}

/// Classements indépendants des boules et des étoiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bands {
    pub balls: Classification,
    pub stars: Classification,
}

impl Bands {
    pub fn get(&self, pool: Pool) -> &Classification {
        match pool {
            Pool::Balls => &self.balls,
            Pool::Stars => &self.stars,
        }
    }
}

pub fn classify_all(frequencies: &Frequencies) -> Bands {
    Bands {
        balls: classify(&frequencies.balls),
        stars: classify(&frequencies.stars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frequency::{compute_frequencies, count_pool};
    use crate::analysis::{draw_on, make_test_draws};

    #[test]
    fn test_cutoffs_pinned() {
        assert_eq!(cutoffs(50), [10, 25, 40]);
        assert_eq!(cutoffs(12), [2, 6, 9]);
    }

    #[test]
    fn test_band_sizes_balls() {
        let freqs = compute_frequencies(&make_test_draws(40));
        assert_eq!(classify(&freqs.balls).sizes(), [10, 15, 15, 10]);
    }

    #[test]
    fn test_band_sizes_stars() {
        let freqs = compute_frequencies(&make_test_draws(40));
        assert_eq!(classify(&freqs.stars).sizes(), [2, 4, 3, 3]);
    }

    #[test]
    fn test_partition_is_complete() {
        for n in [0, 1, 13, 100] {
            let freqs = compute_frequencies(&make_test_draws(n));
            for table in [&freqs.balls, &freqs.stars] {
                let classification = classify(table);
                let mut all: Vec<u8> = Band::ALL
                    .iter()
                    .flat_map(|&b| classification.members(b))
                    .collect();
                all.sort();
                let expected: Vec<u8> = (1..=table.pool.size() as u8).collect();
                assert_eq!(all, expected);
            }
        }
    }

    #[test]
    fn test_ties_broken_by_number() {
        let table = count_pool(&[], Pool::Stars);
        let classification = classify(&table);
        assert_eq!(classification.ranked(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(classification.members(Band::Hot), vec![1, 2]);
        assert_eq!(classification.members(Band::Cold), vec![10, 11, 12]);
    }

    #[test]
    fn test_most_frequent_is_hot() {
        let draws: Vec<_> = (0..10)
            .map(|i| draw_on(i, [7, 10 + i as u8, 20 + i as u8, 30 + i as u8, 43], [5, 9]))
            .collect();
        let freqs = compute_frequencies(&draws);
        let balls = classify(&freqs.balls);
        assert_eq!(balls.ranked()[0], 7);
        assert_eq!(balls.band_of(7), Some(Band::Hot));
        assert_eq!(balls.band_of(42), Some(Band::Cold));
        assert_eq!(balls.band_of(0), None);

        let stars = classify(&freqs.stars);
        assert_eq!(stars.members(Band::Hot), vec![5, 9]);
    }

    #[test]
    fn test_widening_starts_with_band() {
        for band in Band::ALL {
            let order = band.widening();
            assert_eq!(order[0], band);
            let mut sorted = order.to_vec();
            sorted.sort_by_key(|b| b.index());
            assert_eq!(sorted, Band::ALL.to_vec());
        }
    }
}
