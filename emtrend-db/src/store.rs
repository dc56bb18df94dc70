use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db;
use crate::models::Draw;

/// Source de tirages en lecture seule, passée explicitement à chaque analyse.
pub trait DrawStore {
    /// Tirages entre `since` et `until` (bornes incluses), du plus récent au plus ancien.
    fn fetch_draws(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Vec<Draw>>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl DrawStore for SqliteStore<'_> {
    fn fetch_draws(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Vec<Draw>> {
        db::fetch_draws(self.conn, since, until)
    }
}

/// Magasin en mémoire, utilisé pour les tests et les données synthétiques.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    draws: Vec<Draw>,
}

impl MemoryStore {
    pub fn new(mut draws: Vec<Draw>) -> Self {
        draws.sort_by(|a, b| b.draw_date.cmp(&a.draw_date));
        Self { draws }
    }
}

impl DrawStore for MemoryStore {
    fn fetch_draws(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Vec<Draw>> {
        Ok(self
            .draws
            .iter()
            .filter(|d| since.is_none_or(|s| d.draw_date >= s))
            .filter(|d| until.is_none_or(|u| d.draw_date <= u))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(y: i32, m: u32, d: u32) -> Draw {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Draw::new(date, [1, 2, 3, 4, 5], [1, 2]).unwrap()
    }

    #[test]
    fn test_memory_store_orders_most_recent_first() {
        let store = MemoryStore::new(vec![draw(2024, 1, 2), draw(2024, 3, 1), draw(2024, 2, 6)]);
        let draws = store.fetch_draws(None, None).unwrap();
        let months: Vec<u32> = draws.iter().map(|d| chrono::Datelike::month(&d.draw_date)).collect();
        assert_eq!(months, vec![3, 2, 1]);
    }

    #[test]
    fn test_memory_store_filters_inclusive() {
        let store = MemoryStore::new(vec![draw(2024, 1, 2), draw(2024, 2, 6), draw(2024, 3, 1)]);
        let since = NaiveDate::from_ymd_opt(2024, 2, 6);
        assert_eq!(store.fetch_draws(since, None).unwrap().len(), 2);
        assert_eq!(store.fetch_draws(None, since).unwrap().len(), 2);
        assert_eq!(store.fetch_draws(since, since).unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_store_matches_db() {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();
        db::insert_draw(&conn, &draw(2024, 1, 2)).unwrap();
        db::insert_draw(&conn, &draw(2024, 1, 5)).unwrap();

        let store = SqliteStore::new(&conn);
        let draws = store.fetch_draws(NaiveDate::from_ymd_opt(2024, 1, 3), None).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].draw_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }
}
