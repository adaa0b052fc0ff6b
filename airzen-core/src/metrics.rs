//! Pure transforms over a fetched snapshot.
//!
//! Everything here is a free function of its inputs so the dashboard numbers
//! can be unit-tested without a network or a UI harness.

use std::collections::BTreeMap;

use crate::model::ForecastPoint;

/// Short/long health guidance for an AQI band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthMessage {
    pub short: &'static str,
    pub long: &'static str,
}

/// Map an AQI value to its health message. Total over all inputs: negative
/// values fall into the cleanest band.
pub fn health_message(aqi: f64) -> HealthMessage {
    if aqi <= 50.0 {
        HealthMessage {
            short: "Breathe easy",
            long: "The air is clean. A perfect day to be outside.",
        }
    } else if aqi <= 100.0 {
        HealthMessage {
            short: "Stay aware",
            long: "Air quality is acceptable. Sensitive individuals should take note.",
        }
    } else if aqi <= 150.0 {
        HealthMessage {
            short: "Take care",
            long: "Consider reducing prolonged outdoor activities.",
        }
    } else {
        HealthMessage {
            short: "Stay inside",
            long: "Air quality is concerning. Limit exposure.",
        }
    }
}

/// Five-step AQI color ramp (green, lime, yellow, orange, red).
///
/// Single source of truth so a given AQI renders the same color everywhere.
pub fn aqi_color(aqi: f64) -> &'static str {
    if aqi <= 50.0 {
        "#10b981"
    } else if aqi <= 100.0 {
        "#84cc16"
    } else if aqi <= 150.0 {
        "#eab308"
    } else if aqi <= 200.0 {
        "#f97316"
    } else {
        "#ef4444"
    }
}

/// Six-band EPA-style risk label for locally computed AQI values.
pub fn risk_level(aqi: f64) -> &'static str {
    if aqi <= 50.0 {
        "Good"
    } else if aqi <= 100.0 {
        "Moderate"
    } else if aqi <= 150.0 {
        "Unhealthy for Sensitive Groups"
    } else if aqi <= 200.0 {
        "Unhealthy"
    } else if aqi <= 300.0 {
        "Very Unhealthy"
    } else {
        "Hazardous"
    }
}

/// 24-hour exposure expressed as cigarettes smoked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CigaretteEquivalent {
    /// Cigarettes per day, rounded to one decimal.
    pub cigarettes: f64,
    pub message: &'static str,
}

/// Berkeley Earth rule of thumb: 22 µg/m³ of PM2.5 over 24 hours equals one
/// cigarette. Missing PM2.5 counts as 0.
pub fn cigarette_equivalent(pollutants: &BTreeMap<String, f64>) -> CigaretteEquivalent {
    let pm25 = pollutants.get("PM2.5").copied().unwrap_or(0.0);
    let cigarettes = (pm25 / 22.0 * 10.0).round() / 10.0;

    let message = if cigarettes > 5.0 {
        "Serious health risk."
    } else if cigarettes > 2.0 {
        "Passive smoking levels."
    } else if cigarettes > 0.5 {
        "Not great, but okay."
    } else {
        "Clean air, keep breathing."
    };

    CigaretteEquivalent { cigarettes, message }
}

/// The 3-hour forecast slice with the lowest mean AQI.
#[derive(Debug, Clone, PartialEq)]
pub struct BestWindow {
    pub start: String,
    pub end: String,
    pub mean_aqi: f64,
}

/// Scan every 3-point contiguous window within the first `min(12, len - 3)`
/// starting offsets and keep the one with the strictly lowest mean (first
/// winner kept on ties). Needs at least 5 forecast points.
pub fn best_window(forecast: &[ForecastPoint]) -> Option<BestWindow> {
    if forecast.len() < 5 {
        return None;
    }

    let limit = 12.min(forecast.len() - 3);
    let mut best: Option<BestWindow> = None;
    let mut min_mean = f64::INFINITY;

    for i in 0..limit {
        let slice = &forecast[i..i + 3];
        let mean = slice.iter().map(|p| p.aqi).sum::<f64>() / 3.0;

        if mean < min_mean {
            min_mean = mean;
            best = Some(BestWindow {
                start: slice[0].hour.clone(),
                end: slice[2].hour.clone(),
                mean_aqi: mean,
            });
        }
    }

    best
}

/// How one ML prediction compared against its satellite counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyBucket {
    /// Within 15% of the satellite value.
    Accurate,
    /// Within 35%, or no satellite value to compare against.
    Close,
    /// More than 35% off.
    Off,
}

/// Aggregate model-accuracy report over one forecast pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccuracyReport {
    pub accurate: usize,
    pub close: usize,
    pub off: usize,
    /// 0–100; accurate pairs count full, close pairs 0.6.
    pub score: u32,
}

impl AccuracyReport {
    pub fn total(&self) -> usize {
        self.accurate + self.close + self.off
    }
}

/// Pair ML and satellite forecasts index-by-index (not by hour label) and
/// bucket each pair by percent difference. With no ML data at all the score
/// defaults to a neutral 75.
pub fn forecast_accuracy(ml: &[ForecastPoint], satellite: &[ForecastPoint]) -> AccuracyReport {
    if ml.is_empty() {
        return AccuracyReport { accurate: 0, close: 0, off: 0, score: 75 };
    }

    let mut accurate = 0usize;
    let mut close = 0usize;
    let mut off = 0usize;

    for (i, predicted) in ml.iter().enumerate() {
        let bucket = match satellite.get(i) {
            Some(observed) if observed.aqi > 0.0 => {
                let percent_diff = (predicted.aqi - observed.aqi).abs() / observed.aqi * 100.0;

                if percent_diff <= 15.0 {
                    AccuracyBucket::Accurate
                } else if percent_diff <= 35.0 {
                    AccuracyBucket::Close
                } else {
                    AccuracyBucket::Off
                }
            }
            // Missing or unusable satellite counterpart: call it close.
            _ => AccuracyBucket::Close,
        };

        match bucket {
            AccuracyBucket::Accurate => accurate += 1,
            AccuracyBucket::Close => close += 1,
            AccuracyBucket::Off => off += 1,
        }
    }

    let total = (accurate + close + off) as f64;
    let score = ((accurate as f64 + close as f64 * 0.6) / total * 100.0).round() as u32;

    AccuracyReport { accurate, close, off, score }
}

/// Fixed tip lists per AQI band, shown alongside the health message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommendations {
    pub precautions: &'static [&'static str],
    pub improvements: &'static [&'static str],
}

pub fn recommendations(aqi: f64) -> Recommendations {
    if aqi <= 50.0 {
        Recommendations {
            precautions: &["Great for outdoor activities", "Open windows for fresh air"],
            improvements: &["Support green initiatives"],
        }
    } else if aqi <= 100.0 {
        Recommendations {
            precautions: &["Limit outdoor exertion for sensitive groups", "Watch for symptoms"],
            improvements: &["Reduce vehicle usage"],
        }
    } else if aqi <= 150.0 {
        Recommendations {
            precautions: &["Wear N95 mask outdoors", "Keep windows closed"],
            improvements: &["Use air purifiers"],
        }
    } else {
        Recommendations {
            precautions: &["Avoid outdoor activities", "N95 mask required"],
            improvements: &["Report to authorities"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[f64]) -> Vec<ForecastPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &aqi)| ForecastPoint { hour: format!("{i:02}:00"), aqi })
            .collect()
    }

    #[test]
    fn health_bands_are_total_and_lower_inclusive() {
        assert_eq!(health_message(-5.0).short, "Breathe easy");
        assert_eq!(health_message(0.0).short, "Breathe easy");
        assert_eq!(health_message(50.0).short, "Breathe easy");
        assert_eq!(health_message(50.1).short, "Stay aware");
        assert_eq!(health_message(100.0).short, "Stay aware");
        assert_eq!(health_message(150.0).short, "Take care");
        assert_eq!(health_message(150.1).short, "Stay inside");
        assert_eq!(health_message(500.0).short, "Stay inside");
    }

    #[test]
    fn color_ramp_boundaries() {
        assert_eq!(aqi_color(50.0), "#10b981");
        assert_eq!(aqi_color(51.0), "#84cc16");
        assert_eq!(aqi_color(100.0), "#84cc16");
        assert_eq!(aqi_color(150.0), "#eab308");
        assert_eq!(aqi_color(200.0), "#f97316");
        assert_eq!(aqi_color(201.0), "#ef4444");
    }

    #[test]
    fn risk_level_bands() {
        assert_eq!(risk_level(40.0), "Good");
        assert_eq!(risk_level(120.0), "Unhealthy for Sensitive Groups");
        assert_eq!(risk_level(250.0), "Very Unhealthy");
        assert_eq!(risk_level(400.0), "Hazardous");
    }

    #[test]
    fn one_cigarette_at_twenty_two_micrograms() {
        let mut pollutants = BTreeMap::new();
        pollutants.insert("PM2.5".to_string(), 22.0);

        let eq = cigarette_equivalent(&pollutants);
        assert_eq!(eq.cigarettes, 1.0);
        assert_eq!(eq.message, "Not great, but okay.");
    }

    #[test]
    fn cigarettes_monotonic_in_pm25() {
        let mut previous = -1.0;
        for pm25 in [0.0, 5.0, 11.0, 22.0, 44.0, 110.0, 200.0] {
            let mut pollutants = BTreeMap::new();
            pollutants.insert("PM2.5".to_string(), pm25);

            let eq = cigarette_equivalent(&pollutants);
            assert!(eq.cigarettes >= previous, "not monotonic at PM2.5 = {pm25}");
            previous = eq.cigarettes;
        }
    }

    #[test]
    fn cigarette_severity_thresholds() {
        let at = |pm25: f64| {
            let mut p = BTreeMap::new();
            p.insert("PM2.5".to_string(), pm25);
            cigarette_equivalent(&p).message
        };

        assert_eq!(at(0.0), "Clean air, keep breathing.");
        assert_eq!(at(11.0), "Clean air, keep breathing."); // exactly 0.5
        assert_eq!(at(13.2), "Not great, but okay."); // 0.6
        assert_eq!(at(44.0), "Not great, but okay."); // exactly 2.0
        assert_eq!(at(46.2), "Passive smoking levels."); // 2.1
        assert_eq!(at(121.0), "Serious health risk."); // 5.5
    }

    #[test]
    fn cigarettes_missing_pm25_counts_as_zero() {
        let eq = cigarette_equivalent(&BTreeMap::new());
        assert_eq!(eq.cigarettes, 0.0);
        assert_eq!(eq.message, "Clean air, keep breathing.");
    }

    #[test]
    fn best_window_needs_five_points() {
        assert_eq!(best_window(&points(&[10.0, 20.0, 30.0, 40.0])), None);
        assert!(best_window(&points(&[10.0, 20.0, 30.0, 40.0, 50.0])).is_some());
    }

    #[test]
    fn best_window_picks_lowest_mean() {
        // Candidate windows start at offsets 0..4:
        //   [90,80,70] -> 80, [80,70,95] -> 81.7, [70,95,60] -> 75, [95,60,55] -> 70
        let forecast = points(&[90.0, 80.0, 70.0, 95.0, 60.0, 55.0, 65.0]);
        let best = best_window(&forecast).unwrap();

        assert_eq!(best.start, "03:00");
        assert_eq!(best.end, "05:00");
        assert!((best.mean_aqi - 70.0).abs() < 1e-9);
    }

    #[test]
    fn best_window_mean_is_minimal_and_idempotent() {
        let forecast = points(&[42.0, 17.0, 63.0, 8.0, 91.0, 33.0, 5.0, 77.0, 12.0, 48.0]);
        let best = best_window(&forecast).unwrap();

        // Brute force over every candidate offset.
        let limit = 12.min(forecast.len() - 3);
        for i in 0..limit {
            let mean = forecast[i..i + 3].iter().map(|p| p.aqi).sum::<f64>() / 3.0;
            assert!(best.mean_aqi <= mean, "window at {i} beats the selected one");
        }

        assert_eq!(best_window(&forecast).unwrap(), best);
    }

    #[test]
    fn best_window_first_winner_kept_on_tie() {
        // Offsets 0 and 2 both average 50; strict `<` keeps the earlier one.
        let forecast = points(&[50.0, 50.0, 50.0, 50.0, 50.0, 50.0]);
        let best = best_window(&forecast).unwrap();
        assert_eq!(best.start, "00:00");
    }

    #[test]
    fn identical_forecasts_are_fully_accurate() {
        let ml = points(&[80.0, 90.0, 100.0]);
        let report = forecast_accuracy(&ml, &ml.clone());

        assert_eq!(report.accurate, 3);
        assert_eq!(report.close, 0);
        assert_eq!(report.off, 0);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn accuracy_buckets_by_percent_difference() {
        let ml = points(&[100.0, 100.0, 100.0]);
        let satellite = points(&[90.0, 75.0, 50.0]); // 11.1%, 33.3%, 100%
        let report = forecast_accuracy(&ml, &satellite);

        assert_eq!(report.accurate, 1);
        assert_eq!(report.close, 1);
        assert_eq!(report.off, 1);
        // (1 + 0.6) / 3 * 100 = 53.3 -> 53
        assert_eq!(report.score, 53);
    }

    #[test]
    fn missing_satellite_counterparts_count_as_close() {
        let ml = points(&[100.0, 100.0, 100.0]);
        let satellite = points(&[100.0]);
        let report = forecast_accuracy(&ml, &satellite);

        assert_eq!(report.accurate, 1);
        assert_eq!(report.close, 2);
        assert_eq!(report.off, 0);
    }

    #[test]
    fn zero_satellite_aqi_counts_as_close() {
        let report = forecast_accuracy(&points(&[60.0]), &points(&[0.0]));
        assert_eq!(report.close, 1);
    }

    #[test]
    fn no_forecast_data_defaults_to_neutral_score() {
        let report = forecast_accuracy(&[], &points(&[50.0]));
        assert_eq!(report.total(), 0);
        assert_eq!(report.score, 75);
    }

    #[test]
    fn recommendations_track_the_health_bands() {
        assert_eq!(recommendations(30.0).precautions[0], "Great for outdoor activities");
        assert_eq!(recommendations(120.0).precautions[0], "Wear N95 mask outdoors");
        assert_eq!(recommendations(250.0).improvements[0], "Report to authorities");
    }
}
