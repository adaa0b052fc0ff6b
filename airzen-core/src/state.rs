//! Application state for the refresh pipeline.
//!
//! All mutation goes through the transition functions here, so the
//! "which response wins" question is a checked policy rather than an
//! accident of callback ordering: every fetch carries the generation it was
//! issued under, and responses from a superseded location are dropped.

use std::collections::VecDeque;

use crate::model::{HistoryEntry, Location, Multipliers, SimulationResult, Snapshot};

/// Rolling history keeps the 10 most recent observations, FIFO.
pub const HISTORY_CAP: usize = 10;

#[derive(Debug)]
pub struct AppState {
    location: Location,
    generation: u64,
    snapshot: Option<Snapshot>,
    history: VecDeque<HistoryEntry>,
    pub multipliers: Multipliers,
    pub simulation: Option<SimulationResult>,
    /// Display clock, advanced by the 1-second tick.
    pub clock: String,
}

impl AppState {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            generation: 0,
            snapshot: None,
            history: VecDeque::with_capacity(HISTORY_CAP),
            multipliers: Multipliers::default(),
            simulation: None,
            clock: String::new(),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Generation token to tag an outgoing fetch with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replace the active location. Last write wins; the rolling history
    /// belongs to the old location and is cleared. The previous simulation
    /// result is stale too.
    pub fn replace_location(&mut self, location: Location) {
        self.location = location;
        self.generation += 1;
        self.history.clear();
        self.simulation = None;
    }

    /// Apply a fetched snapshot if it still belongs to the active location.
    ///
    /// Returns `false` (and drops the snapshot) when `generation` is stale,
    /// i.e. the location changed while the request was in flight. An accepted
    /// snapshot replaces the previous one wholesale and records a history
    /// entry from its AQI and first ML prediction.
    pub fn apply_snapshot(&mut self, generation: u64, snapshot: Snapshot, time: String) -> bool {
        if generation != self.generation {
            return false;
        }

        self.push_history(HistoryEntry {
            time,
            aqi: snapshot.aqi,
            predicted: snapshot.first_prediction(),
        });
        self.snapshot = Some(snapshot);

        true
    }

    fn push_history(&mut self, entry: HistoryEntry) {
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForecastPoint;

    fn delhi() -> Location {
        Location::new(28.6139, 77.2090, "New Delhi").unwrap()
    }

    fn snapshot(aqi: f64) -> Snapshot {
        Snapshot { aqi, ..Default::default() }
    }

    #[test]
    fn accepted_snapshot_records_history_with_prediction() {
        let mut state = AppState::new(delhi());

        let snap = Snapshot {
            aqi: 120.0,
            ml_forecast: vec![ForecastPoint { hour: "03 PM".into(), aqi: 130.0 }],
            ..Default::default()
        };

        assert!(state.apply_snapshot(0, snap, "14:00".into()));

        let entry = state.history().next().unwrap();
        assert_eq!(entry.aqi, 120.0);
        assert_eq!(entry.predicted, Some(130.0));
        assert_eq!(state.snapshot().unwrap().aqi, 120.0);
    }

    #[test]
    fn no_ml_forecast_means_no_prediction() {
        let mut state = AppState::new(delhi());
        assert!(state.apply_snapshot(0, snapshot(60.0), "09:00".into()));
        assert_eq!(state.history().next().unwrap().predicted, None);
    }

    #[test]
    fn history_capped_at_ten_fifo() {
        let mut state = AppState::new(delhi());

        for i in 0..11 {
            assert!(state.apply_snapshot(0, snapshot(i as f64), format!("t{i}")));
        }

        assert_eq!(state.history_len(), HISTORY_CAP);

        // First entry evicted, the last 10 remain in insertion order.
        let values: Vec<f64> = state.history().map(|e| e.aqi).collect();
        let expected: Vec<f64> = (1..11).map(|i| i as f64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn location_change_resets_history_and_bumps_generation() {
        let mut state = AppState::new(delhi());
        assert!(state.apply_snapshot(0, snapshot(80.0), "t0".into()));
        assert_eq!(state.history_len(), 1);

        let mumbai = Location::new(19.076, 72.8777, "Mumbai").unwrap();
        state.replace_location(mumbai.clone());

        assert_eq!(state.location(), &mumbai);
        assert_eq!(state.generation(), 1);
        assert_eq!(state.history_len(), 0);
        // Stale snapshot is retained until a fresh one arrives.
        assert_eq!(state.snapshot().unwrap().aqi, 80.0);
    }

    #[test]
    fn stale_generation_snapshot_is_discarded() {
        let mut state = AppState::new(delhi());
        let issued_at = state.generation();

        state.replace_location(Location::new(19.076, 72.8777, "Mumbai").unwrap());

        // The old location's response resolves after the switch.
        assert!(!state.apply_snapshot(issued_at, snapshot(500.0), "late".into()));
        assert!(state.snapshot().is_none());
        assert_eq!(state.history_len(), 0);

        // The new location's own fetch still lands.
        assert!(state.apply_snapshot(state.generation(), snapshot(70.0), "t1".into()));
        assert_eq!(state.snapshot().unwrap().aqi, 70.0);
    }
}
