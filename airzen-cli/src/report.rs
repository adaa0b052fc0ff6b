//! Plain-text rendering of a snapshot and its derived metrics.

use airzen_core::{Location, Snapshot, metrics};

/// Full one-shot report for `airzen show`.
pub fn print_snapshot(location: &Location, snapshot: &Snapshot) {
    let message = metrics::health_message(snapshot.aqi);

    println!("{location}");
    println!();
    println!("  AQI {:>4}   {}", snapshot.aqi.round(), snapshot.risk_level);
    println!("  \"{}\" — {}", message.short, message.long);

    if !snapshot.pollutants.is_empty() {
        println!();
        println!("  Pollutants (µg/m³):");
        for (name, value) in &snapshot.pollutants {
            println!("    {name:<6} {value:>7.1}");
        }
    }

    let cigarettes = metrics::cigarette_equivalent(&snapshot.pollutants);
    println!();
    println!(
        "  24h exposure ≈ {:.1} cigarettes — {}",
        cigarettes.cigarettes, cigarettes.message
    );

    if !snapshot.ml_forecast.is_empty() {
        println!();
        println!("  ML forecast:");
        for point in &snapshot.ml_forecast {
            println!("    {:<8} {:>4}", point.hour, point.aqi.round());
        }
    }

    if !snapshot.forecast.is_empty() {
        println!();
        println!("  Satellite forecast:");
        for point in snapshot.forecast.iter().take(6) {
            println!("    {:<8} {:>4}", point.hour, point.aqi.round());
        }
    }

    if let Some(window) = metrics::best_window(&snapshot.forecast) {
        println!();
        println!(
            "  Best time for outdoor activity: {} — {} (avg AQI {})",
            window.start,
            window.end,
            window.mean_aqi.round()
        );
    }

    let accuracy = metrics::forecast_accuracy(&snapshot.ml_forecast, &snapshot.forecast);
    if accuracy.total() > 0 {
        println!();
        println!(
            "  Model accuracy: {} accurate / {} close / {} off (score {})",
            accuracy.accurate, accuracy.close, accuracy.off, accuracy.score
        );
    }

    let tips = metrics::recommendations(snapshot.aqi);
    println!();
    println!("  Health tips:");
    for tip in tips.precautions {
        println!("    - {tip}");
    }
    println!("  Improve air quality:");
    for tip in tips.improvements {
        println!("    - {tip}");
    }

    if !snapshot.pollution_sources.is_empty() {
        println!();
        println!("  Estimated sources:");
        for (source, share) in &snapshot.pollution_sources {
            println!("    {source:<14} {share:>3.0}%");
        }
    }

    if !snapshot.source.is_empty() {
        println!();
        println!(
            "  {} • Updated {}",
            snapshot.source,
            snapshot.last_updated.as_deref().unwrap_or("now")
        );
    }
}

/// Compact single line for `airzen watch` refreshes.
pub fn print_refresh_line(clock: &str, location: &str, snapshot: &Snapshot) {
    println!(
        "[{clock}] {location}: AQI {} ({}) — {}",
        snapshot.aqi.round(),
        snapshot.risk_level,
        metrics::health_message(snapshot.aqi).short,
    );
}
