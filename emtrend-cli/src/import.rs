use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use emtrend_db::rusqlite::Connection;
use std::io::Read;
use std::path::Path;

use emtrend_db::db::insert_draw;
use emtrend_db::models::Draw;

use crate::analysis::LOG_TARGET;

pub fn parse_french_decimal(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().replace(',', ".");
    let value = normalized
        .parse::<f64>()
        .with_context(|| format!("Impossible de parser le nombre: '{}'", s))?;
    Ok(Some(value))
}

/// `YYYY-MM-DD` ou `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("Format de date invalide: '{}'", raw))
}

/// Colonnes : date, 5 boules, 2 étoiles, puis jackpot et numéro de tirage optionnels.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
    };

    let date = parse_date(get(0)?)?;
    let balls = [get_u8(1)?, get_u8(2)?, get_u8(3)?, get_u8(4)?, get_u8(5)?];
    let stars = [get_u8(6)?, get_u8(7)?];

    let jackpot = match record.get(8) {
        Some(raw) => parse_french_decimal(raw)?,
        None => None,
    };
    let draw_number = match record.get(9).map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<u32>()
                .with_context(|| format!("Numéro de tirage invalide: '{}'", raw))?,
        ),
        _ => None,
    };

    Ok(Draw::new(date, balls, stars)?
        .with_jackpot(jackpot)
        .with_draw_number(draw_number))
}

/// Séparateur de la première ligne : `;` s'il y en a un, sinon `,`.
fn detect_delimiter(content: &str) -> u8 {
    match content.lines().next() {
        Some(header) if header.contains(';') => b';',
        _ => b',',
    }
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut content = String::new();
    std::fs::File::open(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?
        .read_to_string(&mut content)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    import_str(conn, &content)
}

pub fn import_str(conn: &Connection, content: &str) -> Result<ImportResult> {
    if content.trim().is_empty() {
        bail!("Fichier CSV vide");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut draws = Vec::new();
    let mut result = ImportResult::default();

    for (line, record_result) in reader.records().enumerate() {
        result.total_records += 1;
        match record_result.map_err(anyhow::Error::from).and_then(|r| parse_record(&r)) {
            Ok(draw) => draws.push(draw),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "ligne {} ignorée : {e:#}", line + 2);
                result.errors += 1;
            }
        }
    }

    let stored = store_draws(conn, &draws)?;
    result.inserted = stored.inserted;
    result.skipped = stored.skipped;
    result.errors += stored.errors;
    Ok(result)
}

/// Insère les tirages dans une seule transaction. Les doublons de date sont ignorés.
pub fn store_draws(conn: &Connection, draws: &[Draw]) -> Result<ImportResult> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult {
        total_records: draws.len() as u32,
        ..Default::default()
    };

    for draw in draws {
        match insert_draw(&tx, draw) {
            Ok(true) => result.inserted += 1,
            Ok(false) => result.skipped += 1,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "insertion du tirage du {} impossible : {e:#}", draw.draw_date);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    log::info!(
        target: LOG_TARGET,
        "{} tirages insérés, {} doublons ignorés",
        result.inserted,
        result.skipped
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emtrend_db::db::{count_draws, fetch_last_draws, migrate};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_parse_french_decimal() {
        assert!((parse_french_decimal("109156,50").unwrap().unwrap() - 109156.50).abs() < 0.001);
        assert!((parse_french_decimal("3,80").unwrap().unwrap() - 3.80).abs() < 0.001);
        assert!((parse_french_decimal("17 000 000").unwrap().unwrap() - 17_000_000.0).abs() < 0.001);
        assert_eq!(parse_french_decimal("").unwrap(), None);
        assert!((parse_french_decimal("  42,5  ").unwrap().unwrap() - 42.5).abs() < 0.001);
        assert!(parse_french_decimal("abc").is_err());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();
        assert_eq!(parse_date("17/02/2026").unwrap(), expected);
        assert_eq!(parse_date("2026-02-17").unwrap(), expected);
        assert!(parse_date("2026/02/17").is_err());
        assert!(parse_date("31/02/2026").is_err());
    }

    #[test]
    fn test_import_semicolon_file() {
        let conn = memory_db();
        let csv = "date;b1;b2;b3;b4;b5;s1;s2;jackpot;numero\n\
                   14/06/2024;3;17;22;38;45;4;11;34000000,00;1745\n\
                   2024-06-11;1;2;3;4;5;1;2;;\n";
        let result = import_str(&conn, csv).unwrap();
        assert_eq!(result.total_records, 2);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.errors, 0);

        let draws = fetch_last_draws(&conn, 1).unwrap();
        assert_eq!(draws[0].balls, [3, 17, 22, 38, 45]);
        assert_eq!(draws[0].draw_number, Some(1745));
        assert_eq!(draws[0].jackpot, Some(34_000_000.0));
    }

    #[test]
    fn test_import_comma_file_with_bad_rows() {
        let conn = memory_db();
        let csv = "date,b1,b2,b3,b4,b5,s1,s2\n\
                   2024-06-14,3,17,22,38,45,4,11\n\
                   2024-06-11,3,3,22,38,45,4,11\n\
                   2024-06-07,3,17,22,38,51,4,11\n\
                   pas-une-date,1,2,3,4,5,1,2\n\
                   2024-06-14,1,2,3,4,5,1,2\n";
        let result = import_str(&conn, csv).unwrap();
        assert_eq!(result.total_records, 5);
        assert_eq!(result.inserted, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 3);
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_import_empty_is_error() {
        assert!(import_str(&memory_db(), "  \n").is_err());
    }
}
