//! The location-driven refresh pipeline.
//!
//! One event loop owns the [`AppState`] and serializes every mutation, the
//! same way a browser event loop would. Network calls run as spawned tasks
//! and re-enter the loop as events, tagged with the state generation they
//! were issued under, so a response for a superseded location is discarded
//! instead of overwriting fresher data.

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Local;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};

use crate::{
    api::AirQualityApi,
    model::{Location, Place, SimulationResult, Snapshot},
    state::AppState,
};

/// Silent background refresh cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(120);
/// Display-clock tick.
pub const CLOCK_INTERVAL: Duration = Duration::from_secs(1);
/// Free-text search input settles for this long before a request goes out.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
/// Simulator slider changes settle for this long.
pub const SIMULATE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Inputs to the pipeline, from the UI layer or from its own spawned tasks.
#[derive(Debug)]
pub enum Event {
    /// User picked a location (search selection or map click).
    SelectLocation(Location),
    /// A keystroke in the search box; debounced.
    SearchInput(String),
    /// The search debounce elapsed with this query pending.
    SearchFire(String),
    /// A simulator slider moved; debounced.
    SetMultiplier { source: String, value: f64 },
    /// The simulate debounce elapsed.
    SimulateFire,
    /// A spawned AQI fetch came back.
    SnapshotFetched { generation: u64, result: Result<Snapshot> },
    /// A spawned simulation came back.
    SimulationDone(Result<SimulationResult>),
    Shutdown,
}

/// Outputs for whoever is rendering.
#[derive(Debug)]
pub enum Notice {
    /// A user-visible fetch started.
    Loading,
    /// A fresh snapshot was accepted for the named location.
    SnapshotApplied { location: String, snapshot: Snapshot },
    /// An in-flight response arrived for a location that is no longer active.
    SnapshotDiscarded,
    SearchResults(Vec<Place>),
    Simulation(SimulationResult),
    /// A degraded step; the last good state is still on display.
    Error(String),
}

/// A cancellable one-shot timer. Scheduling replaces any pending run, so a
/// burst of triggers fires at most once.
#[derive(Debug)]
struct Debounce {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debounce {
    fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            action.await;
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.cancel();
    }
}

enum Tick {
    Poll,
    Clock,
    Event(Option<Event>),
}

pub struct Pipeline {
    state: AppState,
    api: Arc<dyn AirQualityApi>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    notices: mpsc::UnboundedSender<Notice>,
    search_debounce: Debounce,
    simulate_debounce: Debounce,
    poll: Interval,
    clock: Interval,
}

impl Pipeline {
    pub fn new(
        api: Arc<dyn AirQualityApi>,
        location: Location,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state: AppState::new(location),
            api,
            events_tx,
            events_rx,
            notices,
            search_debounce: Debounce::new(SEARCH_DEBOUNCE),
            simulate_debounce: Debounce::new(SIMULATE_DEBOUNCE),
            poll: poll_interval(),
            clock: clock_interval(),
        }
    }

    /// Sender for feeding events in from outside the loop.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events_tx.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run until shutdown, starting with one user-visible fetch for the
    /// initial location.
    pub async fn run(mut self) {
        self.spawn_fetch(true);

        while self.step().await {}
    }

    /// One iteration of the loop. Returns `false` when the pipeline is done.
    async fn step(&mut self) -> bool {
        let tick = tokio::select! {
            _ = self.poll.tick() => Tick::Poll,
            _ = self.clock.tick() => Tick::Clock,
            ev = self.events_rx.recv() => Tick::Event(ev),
        };

        match tick {
            // Background refresh for the current location, no loading flag.
            Tick::Poll => self.spawn_fetch(false),
            Tick::Clock => self.state.clock = Local::now().format("%H:%M:%S").to_string(),
            Tick::Event(Some(event)) => return self.handle_event(event),
            Tick::Event(None) => return false,
        }

        true
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::SelectLocation(location) => {
                self.state.replace_location(location);
                // The old location's poll must never fire again: the interval
                // is replaced, not stacked.
                self.poll = poll_interval();
                self.spawn_fetch(true);
            }

            Event::SearchInput(query) => {
                let tx = self.events_tx.clone();
                self.search_debounce.schedule(async move {
                    let _ = tx.send(Event::SearchFire(query));
                });
            }

            Event::SearchFire(query) => self.spawn_search(query),

            Event::SetMultiplier { source, value } => {
                self.state.multipliers.set(&source, value);

                let tx = self.events_tx.clone();
                self.simulate_debounce.schedule(async move {
                    let _ = tx.send(Event::SimulateFire);
                });
            }

            Event::SimulateFire => self.spawn_simulate(),

            Event::SnapshotFetched { generation, result } => match result {
                Ok(snapshot) => {
                    let pollutants_changed = self
                        .state
                        .snapshot()
                        .is_none_or(|prev| prev.pollutants != snapshot.pollutants);

                    let time = Local::now().format("%H:%M").to_string();
                    if self.state.apply_snapshot(generation, snapshot, time) {
                        // Accepted: state now holds the snapshot we just applied.
                        if let Some(snapshot) = self.state.snapshot() {
                            self.notify(Notice::SnapshotApplied {
                                location: self.state.location().name.clone(),
                                snapshot: snapshot.clone(),
                            });
                        }

                        // A live projection is keyed to the pollutants it was
                        // computed from; refresh it when they change.
                        if self.state.simulation.is_some() && pollutants_changed {
                            let tx = self.events_tx.clone();
                            self.simulate_debounce.schedule(async move {
                                let _ = tx.send(Event::SimulateFire);
                            });
                        }
                    } else {
                        self.notify(Notice::SnapshotDiscarded);
                    }
                }
                // Stale-is-better-than-empty: report and keep the last state.
                Err(err) => self.notify(Notice::Error(format!("AQI fetch failed: {err:#}"))),
            },

            Event::SimulationDone(result) => match result {
                Ok(simulation) => {
                    self.state.simulation = Some(simulation.clone());
                    self.notify(Notice::Simulation(simulation));
                }
                Err(err) => self.notify(Notice::Error(format!("Simulation failed: {err:#}"))),
            },

            Event::Shutdown => return false,
        }

        true
    }

    /// Issue one fetch for the active location, tagged with the current
    /// generation. An in-flight fetch is never cancelled; its response is
    /// generation-checked on arrival instead.
    fn spawn_fetch(&mut self, show_loading: bool) {
        if show_loading {
            self.notify(Notice::Loading);
        }

        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        let generation = self.state.generation();
        let (lat, lng) = (self.state.location().lat, self.state.location().lng);

        tokio::spawn(async move {
            let result = api.fetch_aqi(lat, lng).await;
            let _ = tx.send(Event::SnapshotFetched { generation, result });
        });
    }

    fn spawn_search(&mut self, query: String) {
        // Too short to be worth a round trip; clear any stale results.
        if query.chars().count() < 2 {
            self.notify(Notice::SearchResults(Vec::new()));
            return;
        }

        let api = Arc::clone(&self.api);
        let notices = self.notices.clone();

        tokio::spawn(async move {
            match api.search(&query).await {
                Ok(results) => {
                    let _ = notices.send(Notice::SearchResults(results));
                }
                Err(err) => {
                    let _ = notices.send(Notice::Error(format!("Search failed: {err:#}")));
                }
            }
        });
    }

    fn spawn_simulate(&mut self) {
        let Some(snapshot) = self.state.snapshot() else {
            return;
        };
        if snapshot.pollutants.is_empty() {
            return;
        }

        let pollutants = snapshot.pollutants.clone();
        let multipliers = self.state.multipliers;
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = api.simulate(&pollutants, &multipliers).await;
            let _ = tx.send(Event::SimulationDone(result));
        });
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

/// Location-scoped refresh timer: first tick a full period out.
fn poll_interval() -> Interval {
    let mut interval = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn clock_interval() -> Interval {
    let mut interval = time::interval_at(Instant::now() + CLOCK_INTERVAL, CLOCK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
