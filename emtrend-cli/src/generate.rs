use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use emtrend_db::models::{Draw, Pool, ValidationError};

/// Date du premier tirage EuroMillions.
pub const FIRST_DRAW: Option<NaiveDate> = NaiveDate::from_ymd_opt(2004, 2, 13);

fn is_draw_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Tue | Weekday::Fri)
}

fn pick<const N: usize>(pool: Pool, rng: &mut StdRng) -> [u8; N] {
    let numbers: Vec<u8> = (1..=pool.size() as u8).collect();
    let mut picked = [0u8; N];
    for (slot, &n) in picked.iter_mut().zip(numbers.choose_multiple(rng, N)) {
        *slot = n;
    }
    picked
}

/// Tirages fictifs, un mardi et un vendredi par semaine entre `start` et `end`
/// inclus, numérotés à partir de 1. Même graine, même historique.
pub fn generate_draws(start: NaiveDate, end: NaiveDate, rng: &mut StdRng) -> Result<Vec<Draw>, ValidationError> {
    let mut draws = Vec::new();
    let mut number = 0u32;

    for date in start.iter_days().take_while(|d| *d <= end).filter(|d| is_draw_day(*d)) {
        number += 1;
        let balls = pick::<5>(Pool::Balls, rng);
        let stars = pick::<2>(Pool::Stars, rng);
        let jackpot = rng.random_range(17..=240) as f64 * 1_000_000.0;
        draws.push(
            Draw::new(date, balls, stars)?
                .with_draw_number(Some(number))
                .with_jackpot(Some(jackpot)),
        );
    }

    draws.reverse();
    Ok(draws)
}
