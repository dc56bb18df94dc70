mod analysis;
mod display;
mod generate;
mod import;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use emtrend_db::db::{count_draws, date_range, default_db_path, fetch_last_draws, insert_draw, migrate, open_db};
use emtrend_db::models::{Draw, validate_draw};
use emtrend_db::rusqlite::Connection;
use emtrend_db::store::SqliteStore;

use crate::analysis::evaluate::{DEFAULT_HOLDOUT, DEFAULT_LOOKBACKS, EvaluationPoint, parse_lookbacks};
use crate::analysis::recommend::{Recommendation, Strategy};
use crate::analysis::trend::DEFAULT_LOOKBACK;
use crate::analysis::window::Window;
use crate::analysis::{AnalysisError, Analyzer, HotColdSummary, LOG_TARGET};
use crate::display::{
    chart_evaluation, chart_frequencies, display_draws, display_evaluation, display_frequencies,
    display_import_summary, display_recommendations, display_summary,
};

#[derive(Parser)]
#[command(name = "emtrend", about = "Analyse des tendances EuroMillions : fréquences, bandes et grilles")]
struct Cli {
    /// Chemin de la base SQLite (défaut : ./data/emtrend.db)
    #[arg(long, global = true, env = "EMTREND_DB")]
    db: Option<PathBuf>,

    /// Directive de log (ex: debug, emtrend=trace)
    #[arg(long, global = true, env = "EMTREND_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV
        #[arg(short, long, default_value = "data/euromillions.csv")]
        file: PathBuf,
    },

    /// Générer un historique fictif (mardis et vendredis)
    Generate {
        /// Premier jour (AAAA-MM-JJ ou JJ/MM/AAAA), défaut : 13/02/2004
        #[arg(long)]
        since: Option<String>,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Ajouter un tirage manuellement
    Add,

    /// Lister les derniers tirages
    List {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Fréquences et bandes chaud/tiède/frais/froid
    Analyze {
        /// Période : 3months, 6months, year, 10years, all
        #[arg(short, long, default_value = "all")]
        window: Window,
    },

    /// Numéros les plus chauds et les plus froids
    HotCold {
        /// Période : 3months, 6months, year, 10years, all
        #[arg(short, long, default_value = "all")]
        window: Window,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Histogrammes des fréquences
    Chart {
        /// Période : 3months, 6months, year, 10years, all
        #[arg(short, long, default_value = "all")]
        window: Window,
    },

    /// Recommander une grille
    Recommend {
        /// Stratégie de sélection
        #[arg(short, long, value_enum, default_value = "balanced")]
        strategy: Strategy,

        /// Période : 3months, 6months, year, 10years, all
        #[arg(short, long, default_value = "all")]
        window: Window,

        /// Tirages passés observés par le modèle (stratégie ml)
        #[arg(short, long)]
        lookback: Option<usize>,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },

    /// Validation glissante du modèle de tendance
    Evaluate {
        /// Valeurs de lookback à tester, séparées par des virgules
        #[arg(long, default_value = DEFAULT_LOOKBACKS)]
        lookbacks: String,

        /// Nombre de tirages récents utilisés pour le test
        #[arg(long, default_value_t = DEFAULT_HOLDOUT)]
        holdout: usize,
    },

    /// Analyse complète : graphiques, évaluation, grilles et synthèse
    FullAnalysis {
        /// Nombre de grilles
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Tirages passés observés par le modèle
        #[arg(short, long, default_value_t = DEFAULT_LOOKBACK)]
        lookback: usize,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Sortie JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Fichiers optionnels ; .env.local a priorité
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    init_logging(&cli.log)?;

    let path = cli.db.clone().unwrap_or_else(default_db_path);
    let conn = open_db(&path)?;
    migrate(&conn)?;
    log::debug!(target: LOG_TARGET, "base ouverte : {}", path.display());

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::Generate { since, seed } => cmd_generate(&conn, since.as_deref(), seed),
        Command::Add => cmd_add(&conn),
        Command::List { last } => cmd_list(&conn, last),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::Analyze { window } => cmd_analyze(&conn, window),
        Command::HotCold { window, json } => cmd_hot_cold(&conn, window, json),
        Command::Chart { window } => cmd_chart(&conn, window),
        Command::Recommend {
            strategy,
            window,
            lookback,
            seed,
            json,
        } => cmd_recommend(&conn, strategy, window, lookback, seed, json),
        Command::Evaluate { lookbacks, holdout } => cmd_evaluate(&conn, &lookbacks, holdout),
        Command::FullAnalysis {
            count,
            lookback,
            seed,
            json,
        } => cmd_full_analysis(&conn, count, lookback, seed, json),
    }
}

fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(
        directive
            .parse()
            .with_context(|| format!("Directive de log invalide : '{}'", directive))?,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `false` (avec un message) si la base ne contient aucun tirage.
fn ensure_data(conn: &Connection) -> Result<bool> {
    if count_draws(conn)? == 0 {
        println!("Base vide. Lancez d'abord : emtrend import (ou emtrend generate)");
        return Ok(false);
    }
    Ok(true)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_generate(conn: &Connection, since: Option<&str>, seed: Option<u64>) -> Result<()> {
    let start = match since {
        Some(raw) => import::parse_date(raw)?,
        None => generate::FIRST_DRAW.context("Date de premier tirage invalide")?,
    };
    let mut rng = make_rng(seed);
    let draws = generate::generate_draws(start, today(), &mut rng)?;
    log::info!(target: LOG_TARGET, "{} tirages fictifs générés depuis le {start}", draws.len());

    let result = import::store_draws(conn, &draws)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    if let Some((first, latest)) = date_range(conn)? {
        println!(
            "{} tirages en base, du {} au {}",
            count_draws(conn)?,
            first.format("%d/%m/%Y"),
            latest.format("%d/%m/%Y")
        );
    }
    Ok(())
}

fn cmd_analyze(conn: &Connection, window: Window) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let store = SqliteStore::new(conn);
    let analyzer = Analyzer::new(&store, today());
    let (frequencies, bands) = analyzer.classify(window)?;
    display_frequencies(&frequencies, &bands, window);
    Ok(())
}

fn cmd_hot_cold(conn: &Connection, window: Window, json: bool) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let store = SqliteStore::new(conn);
    let summary = Analyzer::new(&store, today()).hot_cold_summary(window)?;
    if json {
        return print_json(&summary);
    }
    display_summary(&summary);
    Ok(())
}

fn cmd_chart(conn: &Connection, window: Window) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let store = SqliteStore::new(conn);
    let frequencies = Analyzer::new(&store, today()).compute_frequencies(window)?;
    chart_frequencies(&frequencies, window);
    Ok(())
}

fn cmd_recommend(
    conn: &Connection,
    strategy: Strategy,
    window: Window,
    lookback: Option<usize>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let store = SqliteStore::new(conn);
    let analyzer = Analyzer::new(&store, today());
    let mut rng = make_rng(seed);

    let recommendation = analyzer.recommend(strategy, window, lookback, &mut rng)?;
    if json {
        return print_json(&recommendation);
    }
    display_recommendations(std::slice::from_ref(&recommendation));
    Ok(())
}

fn cmd_evaluate(conn: &Connection, lookbacks: &str, holdout: usize) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let lookbacks = parse_lookbacks(lookbacks)
        .with_context(|| format!("Liste de lookbacks invalide : '{}'", lookbacks))?;

    let store = SqliteStore::new(conn);
    let points = Analyzer::new(&store, today()).evaluate_trend(&lookbacks, holdout)?;
    display_evaluation(&points);
    chart_evaluation(&points);
    Ok(())
}

#[derive(Serialize)]
struct FullAnalysis {
    summary: HotColdSummary,
    evaluation: Vec<EvaluationPoint>,
    recommendations: Vec<Recommendation>,
}

fn cmd_full_analysis(conn: &Connection, count: usize, lookback: usize, seed: Option<u64>, json: bool) -> Result<()> {
    if !ensure_data(conn)? {
        return Ok(());
    }
    let store = SqliteStore::new(conn);
    let analyzer = Analyzer::new(&store, today());
    let mut rng = make_rng(seed);

    let lookbacks = parse_lookbacks(DEFAULT_LOOKBACKS)?;
    let evaluation = match analyzer.evaluate_trend(&lookbacks, DEFAULT_HOLDOUT) {
        Ok(points) => points,
        Err(AnalysisError::InsufficientData { needed, available }) => {
            log::warn!(target: LOG_TARGET, "évaluation ignorée : {available} tirages sur {needed} requis");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    let recommendations = analyzer.combine_strategies(count, lookback, &mut rng)?;
    let summary = analyzer.hot_cold_summary(Window::All)?;

    if json {
        return print_json(&FullAnalysis {
            summary,
            evaluation,
            recommendations,
        });
    }

    for window in Window::STANDARD {
        let (frequencies, bands) = analyzer.classify(window)?;
        display_frequencies(&frequencies, &bands, window);
        chart_frequencies(&frequencies, window);
    }
    if !evaluation.is_empty() {
        display_evaluation(&evaluation);
        chart_evaluation(&evaluation);
    }
    display_recommendations(&recommendations);
    display_summary(&summary);
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Ajout d'un tirage manuellement\n");

    let raw_date = prompt("Date (JJ/MM/AAAA) : ")?;
    let date = import::parse_date(&raw_date)?;

    let raw_number = prompt("Numéro du tirage (optionnel) : ")?;
    let draw_number = if raw_number.is_empty() {
        None
    } else {
        Some(raw_number.parse::<u32>().context("Numéro de tirage invalide")?)
    };

    let balls = prompt_balls()?;
    let stars = prompt_stars()?;

    let draw = Draw::new(date, balls, stars)?.with_draw_number(draw_number);

    println!("\nTirage à insérer :");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirmer l'insertion ? (o/n) : ")?;
    if confirm.trim().to_lowercase() == "o" {
        let inserted = insert_draw(conn, &draw)?;
        if inserted {
            println!("Tirage inséré avec succès.");
        } else {
            println!("Un tirage existe déjà à cette date (doublon ignoré).");
        }
    } else {
        println!("Insertion annulée.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

/// Une ligne de réponse ; erreur si l'entrée est fermée.
fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Erreur de lecture")?;
    if read == 0 {
        bail!("Entrée fermée, saisie interrompue");
    }
    Ok(line.trim().to_string())
}

fn prompt_balls() -> Result<[u8; 5]> {
    loop {
        let input = prompt("5 boules (séparées par des espaces, 1-50) : ")?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) if v.len() == 5 => {
                let arr = [v[0], v[1], v[2], v[3], v[4]];
                match validate_draw(&arr, &[1, 2]) {
                    Ok(()) => return Ok(arr),
                    Err(e) => println!("{e}. Réessayez."),
                }
            }
            _ => println!("Entrez exactement 5 numéros. Réessayez."),
        }
    }
}

fn prompt_stars() -> Result<[u8; 2]> {
    loop {
        let input = prompt("2 étoiles (séparées par un espace, 1-12) : ")?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) if v.len() == 2 => {
                let arr = [v[0], v[1]];
                match validate_draw(&[1, 2, 3, 4, 5], &arr) {
                    Ok(()) => return Ok(arr),
                    Err(e) => println!("{e}. Réessayez."),
                }
            }
            _ => println!("Entrez exactement 2 numéros. Réessayez."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_answer_trims_line() {
        let mut input = io::Cursor::new("  3 17 22 38 45 \n4 11\n");
        assert_eq!(read_answer(&mut input).unwrap(), "3 17 22 38 45");
        assert_eq!(read_answer(&mut input).unwrap(), "4 11");
    }

    #[test]
    fn test_read_answer_fails_on_closed_input() {
        let mut input = io::Cursor::new("");
        assert!(read_answer(&mut input).is_err());

        // Ligne vide : réponse vide, pas une fin d'entrée
        let mut input = io::Cursor::new("\n");
        assert_eq!(read_answer(&mut input).unwrap(), "");
        assert!(read_answer(&mut input).is_err());
    }
}
