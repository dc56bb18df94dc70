use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};
use textplots::Plot;

use emtrend_db::models::{Draw, Pool};

use crate::analysis::HotColdSummary;
use crate::analysis::classify::{Band, Bands};
use crate::analysis::evaluate::{EvaluationPoint, baseline};
use crate::analysis::frequency::{Frequencies, FrequencyTable};
use crate::analysis::recommend::Recommendation;
use crate::analysis::window::Window;
use crate::import::ImportResult;

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn band_color(band: Band) -> Color {
    match band {
        Band::Hot => Color::Red,
        Band::Warm => Color::Yellow,
        Band::Cool => Color::Cyan,
        Band::Cold => Color::Blue,
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Date", "N°", "Boules", "Étoiles", "Jackpot"]);

    for draw in draws {
        let number = draw
            .draw_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "—".to_string());
        let jackpot = match draw.jackpot {
            Some(j) if j > 0.0 => format!("{:.0} €", j),
            _ => "—".to_string(),
        };

        table.add_row(vec![
            draw.draw_date.format("%d/%m/%Y").to_string(),
            number,
            join_numbers(&draw.sorted_balls()),
            join_numbers(&draw.sorted_stars()),
            jackpot,
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

/// Classement complet d'un pool, coloré par bande.
pub fn display_frequencies(frequencies: &Frequencies, bands: &Bands, window: Window) {
    println!("\n📊 Fréquences sur la période {window} ({} tirages)\n", frequencies.draws());

    for pool in [Pool::Balls, Pool::Stars] {
        let table_data = frequencies.table(pool);
        let classification = bands.get(pool);

        println!("── {} (1-{}) ──", capitalize(&pool.to_string()), pool.size());
        let sizes = classification.sizes();
        let legend: Vec<String> = Band::ALL
            .iter()
            .zip(sizes)
            .map(|(band, size)| format!("{band} {size}"))
            .collect();
        println!("   {} sorties, bandes : {}", table_data.total(), legend.join(", "));
        let mut table = new_table();
        table.set_header(vec!["Rang", "Numéro", "Sorties", "%", "Bande"]);

        for (rank, &number) in classification.ranked().iter().enumerate() {
            let band = classification.band_of(number).unwrap_or(Band::Cold);
            table.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(format!("{:2}", number)),
                Cell::new(table_data.count(number)),
                Cell::new(format!("{:.2}", table_data.percentage(number))),
                Cell::new(band.to_string()).fg(band_color(band)),
            ]);
        }
        println!("{table}\n");
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn display_summary(summary: &HotColdSummary) {
    println!("\n🔥 Numéros chauds et froids ({})\n", summary.window);

    let period = match (summary.first_draw, summary.last_draw) {
        (Some(first), Some(last)) => format!(
            "du {} au {}",
            first.format("%d/%m/%Y"),
            last.format("%d/%m/%Y")
        ),
        _ => "—".to_string(),
    };
    println!("  Tirages analysés : {} / {} ({period})\n", summary.draws_analyzed, summary.total_draws);

    let mut table = new_table();
    table.set_header(vec!["", "Boules", "Étoiles"]);
    table.add_row(vec![
        Cell::new("Chauds").fg(band_color(Band::Hot)),
        Cell::new(join_numbers(&summary.hottest_balls)),
        Cell::new(join_numbers(&summary.hottest_stars)),
    ]);
    table.add_row(vec![
        Cell::new("Froids").fg(band_color(Band::Cold)),
        Cell::new(join_numbers(&summary.coldest_balls)),
        Cell::new(join_numbers(&summary.coldest_stars)),
    ]);
    println!("{table}");
}

pub fn display_recommendations(recommendations: &[Recommendation]) {
    println!("\n🎲 Grilles recommandées\n");

    let mut table = new_table();
    table.set_header(vec!["#", "Stratégie", "Période", "Boules", "Étoiles"]);

    for (i, rec) in recommendations.iter().enumerate() {
        let strategy = match rec.lookback {
            Some(lookback) => format!("{} (lookback {lookback})", rec.applied),
            None => rec.applied.to_string(),
        };
        table.add_row(vec![
            format!("{}", i + 1),
            strategy,
            rec.window.to_string(),
            join_numbers(&rec.balls),
            join_numbers(&rec.stars),
        ]);
    }
    println!("{table}");

    for rec in recommendations {
        if let Some(reason) = &rec.fallback {
            println!("  ⚠ {} indisponible, {} utilisée : {reason}", rec.requested, rec.applied);
        }
    }
}

pub fn display_evaluation(points: &[EvaluationPoint]) {
    println!("\n🧪 Validation glissante du modèle de tendance\n");

    let mut table = new_table();
    table.set_header(vec!["Lookback", "Tirages testés", "Boules", "Étoiles"]);

    let ball_base = baseline(Pool::Balls);
    let star_base = baseline(Pool::Stars);

    for point in points {
        let ball_color = if point.ball_hit_rate > ball_base { Color::Green } else { Color::White };
        let star_color = if point.star_hit_rate > star_base { Color::Green } else { Color::White };
        table.add_row(vec![
            Cell::new(point.lookback),
            Cell::new(point.holdout),
            Cell::new(format!("{:.1} %", point.ball_hit_rate * 100.0)).fg(ball_color),
            Cell::new(format!("{:.1} %", point.star_hit_rate * 100.0)).fg(star_color),
        ]);
    }
    table.add_row(vec![
        Cell::new("hasard"),
        Cell::new("—"),
        Cell::new(format!("{:.1} %", ball_base * 100.0)),
        Cell::new(format!("{:.1} %", star_base * 100.0)),
    ]);
    println!("{table}");
}

/// Trace les formes sur le canevas puis le rend en texte.
fn render(chart: &mut textplots::Chart<'_>) -> String {
    chart.figures();
    chart.to_string()
}

fn frequency_chart(table: &FrequencyTable) -> String {
    let points: Vec<(f32, f32)> = table.iter().map(|(n, c)| (n as f32, c as f32)).collect();
    let y_max = points.iter().map(|(_, c)| *c).fold(1.0, f32::max);

    let shape = textplots::Shape::Bars(&points);
    let x_max = table.pool.size() as f32 + 0.5;
    let mut chart = textplots::Chart::new_with_y_range(120, 40, 0.5, x_max, 0.0, y_max * 1.1);
    render(chart.lineplot(&shape))
}

/// Histogramme des sorties par numéro.
pub fn chart_frequencies(frequencies: &Frequencies, window: Window) {
    for pool in [Pool::Balls, Pool::Stars] {
        let table = frequencies.table(pool);
        println!("\n  {}, période {window} ({} tirages) :", capitalize(&pool.to_string()), table.draws);
        println!("{}", frequency_chart(table));
    }
}

/// `None` en dessous de deux points.
fn evaluation_chart(points: &[EvaluationPoint]) -> Option<String> {
    if points.len() < 2 {
        return None;
    }

    let x_min = points.iter().map(|p| p.lookback).min()? as f32;
    let x_max = points.iter().map(|p| p.lookback).max()? as f32;

    let balls: Vec<(f32, f32)> = points.iter().map(|p| (p.lookback as f32, p.ball_hit_rate as f32 * 100.0)).collect();
    let stars: Vec<(f32, f32)> = points.iter().map(|p| (p.lookback as f32, p.star_hit_rate as f32 * 100.0)).collect();
    let y_max = balls
        .iter()
        .chain(stars.iter())
        .map(|(_, y)| *y)
        .fold((baseline(Pool::Stars) * 100.0) as f32, f32::max);

    let ball_shape = textplots::Shape::Lines(&balls);
    let star_shape = textplots::Shape::Lines(&stars);
    let mut chart = textplots::Chart::new_with_y_range(120, 40, x_min, x_max, 0.0, y_max * 1.1);
    Some(render(chart.lineplot(&ball_shape).lineplot(&star_shape)))
}

pub fn chart_evaluation(points: &[EvaluationPoint]) {
    match evaluation_chart(points) {
        Some(chart) => {
            println!("\n  Taux de réussite (%) par lookback, boules puis étoiles :");
            println!("{chart}");
        }
        None => println!("  (Pas assez de points à afficher)"),
    }
}
