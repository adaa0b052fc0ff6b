use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{Select, Text};
use tokio::sync::mpsc;

use airzen_core::{
    AirQualityApi, Config, Event, HttpApi, Location, Multipliers, Notice, Pipeline,
    config::SavedLocation, metrics, resolver,
};

use crate::report;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "airzen", version, about = "Air-quality dashboard CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the backend URL and default location.
    Configure,

    /// Show current air quality for a location (default or explicit coordinates).
    Show {
        /// Latitude, -90 to 90. Needs --lng as well.
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude, -180 to 180.
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Search for a place by name and show its air quality.
    Search {
        /// Free-text query, e.g. "delhi" or "são paulo".
        query: String,
    },

    /// Keep watching a location, refreshing every two minutes.
    Watch {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// What-if simulation: scale pollution sources and see the projected AQI.
    Simulate {
        /// Traffic emission multiplier, 0 to 2 (1 = unchanged).
        #[arg(long, default_value_t = 1.0)]
        traffic: f64,

        /// Industrial emission multiplier, 0 to 2.
        #[arg(long, default_value_t = 1.0)]
        industrial: f64,

        /// Power-plant emission multiplier, 0 to 2.
        #[arg(long, default_value_t = 1.0)]
        power: f64,

        /// Biomass-burning multiplier, 0 to 2.
        #[arg(long, default_value_t = 1.0)]
        biomass: f64,

        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        lng: Option<f64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;
        let api = HttpApi::new(config.resolved_api_url());

        match self.command {
            Command::Configure => configure(config),
            Command::Show { lat, lng } => show(&api, &config, coords(lat, lng)?).await,
            Command::Search { query } => search(&api, &query).await,
            Command::Watch { lat, lng } => watch(api, &config, coords(lat, lng)?).await,
            Command::Simulate { traffic, industrial, power, biomass, lat, lng } => {
                simulate(
                    &api,
                    &config,
                    coords(lat, lng)?,
                    [traffic, industrial, power, biomass],
                )
                .await
            }
        }
    }
}

fn coords(lat: Option<f64>, lng: Option<f64>) -> anyhow::Result<Option<(f64, f64)>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some((lat, lng))),
        (None, None) => Ok(None),
        _ => bail!("--lat and --lng must be given together"),
    }
}

/// Starting location: explicit coordinates beat the configured default beats
/// the built-in fallback.
async fn start_location(
    api: &dyn AirQualityApi,
    config: &Config,
    coords: Option<(f64, f64)>,
) -> anyhow::Result<Location> {
    if coords.is_none() {
        if let Some(saved) = &config.default_location {
            return Ok(Location::new(saved.lat, saved.lng, saved.name.clone())?);
        }
    }

    resolver::resolve_initial(api, coords).await
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_url = Text::new("Backend URL:")
        .with_default(&config.resolved_api_url())
        .prompt()
        .context("Configuration aborted")?;
    config.set_api_url(api_url.trim_end_matches('/'));

    let name = Text::new("Default location name (empty to skip):")
        .with_default(
            config
                .default_location
                .as_ref()
                .map(|l| l.name.as_str())
                .unwrap_or(""),
        )
        .prompt()
        .context("Configuration aborted")?;

    if !name.trim().is_empty() {
        let lat: f64 = Text::new("Latitude:")
            .prompt()
            .context("Configuration aborted")?
            .trim()
            .parse()
            .context("Latitude must be a number")?;
        let lng: f64 = Text::new("Longitude:")
            .prompt()
            .context("Configuration aborted")?
            .trim()
            .parse()
            .context("Longitude must be a number")?;

        // Validate before persisting.
        let location = Location::new(lat, lng, name.trim())?;
        config.default_location = Some(SavedLocation {
            lat: location.lat,
            lng: location.lng,
            name: location.name,
        });
    }

    config.save()?;
    println!("Saved to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn show(api: &HttpApi, config: &Config, coords: Option<(f64, f64)>) -> anyhow::Result<()> {
    let location = start_location(api, config, coords).await?;
    let snapshot = api.fetch_aqi(location.lat, location.lng).await?;

    report::print_snapshot(&location, &snapshot);

    Ok(())
}

async fn search(api: &HttpApi, query: &str) -> anyhow::Result<()> {
    let results = api.search(query).await?;
    if results.is_empty() {
        println!("No places found for \"{query}\".");
        return Ok(());
    }

    let labels: Vec<String> = results.iter().map(|p| p.name.clone()).collect();
    let picked = Select::new("Pick a place:", labels)
        .prompt()
        .context("Selection aborted")?;

    let place = results
        .iter()
        .find(|p| p.name == picked)
        .context("Selected place disappeared from results")?;

    let location = Location::new(place.lat, place.lng, place.short_name())?;
    let snapshot = api.fetch_aqi(location.lat, location.lng).await?;

    report::print_snapshot(&location, &snapshot);

    Ok(())
}

async fn watch(api: HttpApi, config: &Config, coords: Option<(f64, f64)>) -> anyhow::Result<()> {
    let location = start_location(&api, config, coords).await?;
    println!("Watching {location} — Ctrl-C to stop.");

    let (notices_tx, mut notices_rx) = mpsc::unbounded_channel();
    let pipeline = Pipeline::new(Arc::new(api), location, notices_tx);
    let events = pipeline.sender();

    let worker = tokio::spawn(pipeline.run());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                let _ = events.send(Event::Shutdown);
                break;
            }
            notice = notices_rx.recv() => {
                let Some(notice) = notice else { break };
                match notice {
                    Notice::SnapshotApplied { location, snapshot } => {
                        let clock = Local::now().format("%H:%M:%S").to_string();
                        report::print_refresh_line(&clock, &location, &snapshot);
                    }
                    Notice::Error(message) => eprintln!("warning: {message}"),
                    // Loading/search/simulation notices are irrelevant here.
                    _ => {}
                }
            }
        }
    }

    worker.await.context("Pipeline task panicked")?;

    Ok(())
}

async fn simulate(
    api: &HttpApi,
    config: &Config,
    coords: Option<(f64, f64)>,
    [traffic, industrial, power, biomass]: [f64; 4],
) -> anyhow::Result<()> {
    let location = start_location(api, config, coords).await?;
    let snapshot = api.fetch_aqi(location.lat, location.lng).await?;

    if snapshot.pollutants.is_empty() {
        bail!("No pollutant data available for {location}; nothing to simulate");
    }

    let mut multipliers = Multipliers::default();
    multipliers.set("traffic", traffic);
    multipliers.set("industrial", industrial);
    multipliers.set("power", power);
    multipliers.set("biomass", biomass);

    let result = api.simulate(&snapshot.pollutants, &multipliers).await?;

    println!("{location}");
    println!();
    println!("  Current AQI:   {:>4} ({})", snapshot.aqi.round(), snapshot.risk_level);
    println!("  Projected AQI: {:>4} ({})", result.aqi.round(), result.risk);

    if result.improvement > 0.0 {
        println!("  ▼ {:.1}% improvement", result.improvement);
    } else if result.improvement < 0.0 {
        println!("  ▲ {:.1}% worse", result.improvement.abs());
    } else {
        println!("  No change");
    }

    println!();
    println!("  Multipliers: traffic {traffic}, industrial {industrial}, power {power}, biomass {biomass}");
    println!("  \"{}\"", metrics::health_message(result.aqi).short);

    Ok(())
}
