use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use std::path::{Path, PathBuf};

use crate::models::{Draw, validate_draw};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_date     TEXT PRIMARY KEY,
    draw_number   INTEGER,
    ball_1        INTEGER NOT NULL,
    ball_2        INTEGER NOT NULL,
    ball_3        INTEGER NOT NULL,
    ball_4        INTEGER NOT NULL,
    ball_5        INTEGER NOT NULL,
    star_1        INTEGER NOT NULL,
    star_2        INTEGER NOT NULL,
    jackpot       REAL
);
CREATE INDEX IF NOT EXISTS idx_draws_number ON draws (draw_number);
";

const SELECT_DRAW: &str = "SELECT draw_date, draw_number, ball_1, ball_2, ball_3, ball_4, ball_5, star_1, star_2, jackpot FROM draws";

pub fn default_db_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("emtrend.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    log::debug!(target: "emtrend_db", "schéma à jour");
    Ok(())
}

/// Insère un tirage validé. Retourne `false` si un tirage existe déjà à cette date.
pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    validate_draw(&draw.balls, &draw.stars)
        .with_context(|| format!("Tirage du {} invalide", draw.draw_date))?;

    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_date, draw_number, ball_1, ball_2, ball_3, ball_4, ball_5, star_1, star_2, jackpot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            draw.draw_date,
            draw.draw_number,
            draw.balls[0],
            draw.balls[1],
            draw.balls[2],
            draw.balls[3],
            draw.balls[4],
            draw.stars[0],
            draw.stars[1],
            draw.jackpot,
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

fn draw_from_row(row: &Row<'_>) -> rusqlite::Result<Draw> {
    Ok(Draw {
        draw_date: row.get(0)?,
        draw_number: row.get(1)?,
        balls: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
        ],
        stars: [
            row.get::<_, u8>(7)?,
            row.get::<_, u8>(8)?,
        ],
        jackpot: row.get(9)?,
    })
}

/// Tirages entre `since` et `until` (bornes incluses), du plus récent au plus ancien.
pub fn fetch_draws(conn: &Connection, since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Vec<Draw>> {
    let sql = format!(
        "{SELECT_DRAW}
         WHERE (?1 IS NULL OR draw_date >= ?1) AND (?2 IS NULL OR draw_date <= ?2)
         ORDER BY draw_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map(rusqlite::params![since, until], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()
        .context("Échec de la lecture des tirages")?;
    Ok(draws)
}

pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let sql = format!("{SELECT_DRAW} ORDER BY draw_date DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let draws = stmt
        .query_map([limit], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

/// Première et dernière date de tirage enregistrées.
pub fn date_range(conn: &Connection) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let range: (Option<NaiveDate>, Option<NaiveDate>) = conn.query_row(
        "SELECT MIN(draw_date), MAX(draw_date) FROM draws",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match range {
        (Some(first), Some(last)) => Some((first, last)),
        _ => None,
    })
}
