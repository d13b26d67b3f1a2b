use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::VecDeque;

/// One normalized historical reading. Temperatures stay in whichever
/// unit the controller reports; probe 0 is the pit probe on
/// single-sensor builds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub probe: u32,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

/// Sliding per-probe temperature window backing the chart.
///
/// Series stay sorted by timestamp and capped to the configured span;
/// merging the same backend page twice is a no-op.
#[derive(Debug, Clone)]
pub struct TempWindow {
    minutes: i64,
    series: IndexMap<u32, VecDeque<(DateTime<Utc>, f64)>>,
}

impl TempWindow {
    pub fn new(minutes: u32) -> Self {
        TempWindow {
            minutes: i64::from(minutes.max(1)),
            series: IndexMap::new(),
        }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes as u32
    }

    /// Merge a batch of points, deduplicating per probe by timestamp.
    /// Returns the number of points actually inserted.
    pub fn merge(&mut self, points: &[HistoryPoint]) -> usize {
        let mut inserted = 0;
        for point in points {
            let series = self.series.entry(point.probe).or_default();
            match series.binary_search_by(|(t, _)| t.cmp(&point.timestamp)) {
                Ok(_) => {}
                Err(pos) => {
                    series.insert(pos, (point.timestamp, point.temperature));
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Append a live status reading to the pit probe series.
    pub fn push_live(&mut self, timestamp: DateTime<Utc>, temperature: f64) {
        self.merge(&[HistoryPoint {
            probe: 0,
            timestamp,
            temperature,
        }]);
    }

    /// Drop points older than the window span, measured from `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(self.minutes);
        for series in self.series.values_mut() {
            while series.front().map_or(false, |(t, _)| *t < cutoff) {
                series.pop_front();
            }
        }
        self.series.retain(|_, series| !series.is_empty());
    }

    pub fn probes(&self) -> Vec<u32> {
        self.series.keys().copied().collect()
    }

    pub fn series(&self, probe: u32) -> Option<&VecDeque<(DateTime<Utc>, f64)>> {
        self.series.get(&probe)
    }

    pub fn len(&self) -> usize {
        self.series.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(VecDeque::is_empty)
    }

    pub fn latest(&self, probe: u32) -> Option<(DateTime<Utc>, f64)> {
        self.series.get(&probe).and_then(|s| s.back().copied())
    }

    /// Time and temperature extents across every probe, for axis scaling.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>, f64, f64)> {
        let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>, f64, f64)> = None;
        for series in self.series.values() {
            for (timestamp, temperature) in series {
                bounds = Some(match bounds {
                    None => (*timestamp, *timestamp, *temperature, *temperature),
                    Some((t_min, t_max, v_min, v_max)) => (
                        t_min.min(*timestamp),
                        t_max.max(*timestamp),
                        v_min.min(*temperature),
                        v_max.max(*temperature),
                    ),
                });
            }
        }
        bounds
    }
}

impl Default for TempWindow {
    fn default() -> Self {
        TempWindow::new(120)
    }
}

/// Normalize a history payload into points.
///
/// Backends disagree on the envelope: bare `[[ts, temp], ...]` pairs,
/// the same list under a `data` or `temperatures` key, or per-record
/// objects with optional `probe_id`/`sensor_id`. Entries that cannot be
/// read are skipped rather than failing the whole page.
pub fn parse_history(value: &Value) -> Vec<HistoryPoint> {
    match value {
        Value::Object(map) => {
            for key in ["data", "temperatures", "history"] {
                if let Some(inner) = map.get(key) {
                    return parse_history(inner);
                }
            }
            Vec::new()
        }
        Value::Array(entries) => entries.iter().filter_map(parse_entry).collect(),
        _ => Vec::new(),
    }
}

/// Whether `value` is one of the known history envelopes. An empty
/// recognized envelope is a valid "no readings" reply; anything else is
/// not history at all.
pub fn is_history_payload(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => ["data", "temperatures", "history"]
            .iter()
            .any(|key| map.get(*key).map_or(false, is_history_payload)),
        _ => false,
    }
}

fn parse_entry(entry: &Value) -> Option<HistoryPoint> {
    match entry {
        Value::Array(pair) if pair.len() >= 2 => Some(HistoryPoint {
            probe: 0,
            timestamp: parse_timestamp(&pair[0])?,
            temperature: pair[1].as_f64()?,
        }),
        Value::Object(map) => {
            let timestamp = map
                .get("timestamp")
                .or_else(|| map.get("time"))
                .and_then(parse_timestamp)?;
            let temperature = ["temperature", "temp", "value", "entry"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(Value::as_f64)?;
            let probe = ["probe_id", "sensor_id"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            Some(HistoryPoint {
                probe,
                timestamp,
                temperature,
            })
        }
        _ => None,
    }
}

/// Timestamps arrive as epoch seconds or milliseconds, RFC 3339, or the
/// sqlite `YYYY-MM-DD HH:MM:SS` form.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(_) => value.as_f64().and_then(epoch_to_datetime),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    s.trim().parse::<f64>().ok().and_then(epoch_to_datetime)
}

fn epoch_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    // Anything past ~2001 in milliseconds dwarfs any plausible seconds value.
    if value >= 1e12 {
        DateTime::from_timestamp_millis(value as i64)
    } else {
        DateTime::from_timestamp(value.trunc() as i64, (value.fract() * 1e9) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 12, minute, 0).unwrap()
    }

    #[test]
    fn test_merge_sorts_and_deduplicates() {
        let mut window = TempWindow::new(120);
        let points = vec![
            HistoryPoint {
                probe: 0,
                timestamp: at(10),
                temperature: 101.0,
            },
            HistoryPoint {
                probe: 0,
                timestamp: at(5),
                temperature: 99.0,
            },
            HistoryPoint {
                probe: 0,
                timestamp: at(10),
                temperature: 101.0,
            },
        ];
        assert_eq!(window.merge(&points), 2);
        assert_eq!(window.merge(&points), 0);

        let series = window.series(0).unwrap();
        let times: Vec<_> = series.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![at(5), at(10)]);
    }

    #[test]
    fn test_prune_respects_window_span() {
        let mut window = TempWindow::new(30);
        window.push_live(at(0), 80.0);
        window.push_live(at(20), 90.0);
        window.push_live(at(45), 95.0);

        window.prune(at(45));
        let series = window.series(0).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.front().unwrap().0, at(20));
    }

    #[test]
    fn test_prune_drops_emptied_probes() {
        let mut window = TempWindow::new(10);
        window.merge(&[HistoryPoint {
            probe: 3,
            timestamp: at(0),
            temperature: 50.0,
        }]);
        window.prune(at(30));
        assert!(window.is_empty());
        assert!(window.probes().is_empty());
    }

    #[test]
    fn test_bounds_span_all_probes() {
        let mut window = TempWindow::new(120);
        window.merge(&[
            HistoryPoint {
                probe: 0,
                timestamp: at(5),
                temperature: 90.0,
            },
            HistoryPoint {
                probe: 1,
                timestamp: at(15),
                temperature: 140.0,
            },
        ]);
        let (t_min, t_max, v_min, v_max) = window.bounds().unwrap();
        assert_eq!(t_min, at(5));
        assert_eq!(t_max, at(15));
        assert_eq!(v_min, 90.0);
        assert_eq!(v_max, 140.0);
    }

    #[test]
    fn test_parse_bare_pairs() {
        let payload = json!([[1720094400, 95.5], [1720094460, 96.0]]);
        let points = parse_history(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].probe, 0);
        assert_eq!(points[0].temperature, 95.5);
        assert_eq!(points[0].timestamp.timestamp(), 1720094400);
    }

    #[test]
    fn test_parse_data_envelope() {
        let payload = json!({"data": [[1720094400, 95.5]]});
        assert_eq!(parse_history(&payload).len(), 1);
    }

    #[test]
    fn test_parse_record_objects_with_probes() {
        let payload = json!({"temperatures": [
            {"probe_id": 0, "timestamp": "2024-07-04 12:00:00", "temperature": 95.5},
            {"sensor_id": 1, "timestamp": "2024-07-04T12:01:00Z", "temperature": 61.2},
        ]});
        let points = parse_history(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].probe, 0);
        assert_eq!(points[1].probe, 1);
        assert_eq!(points[0].timestamp, at(0));
        assert_eq!(points[1].timestamp, at(1));
    }

    #[test]
    fn test_parse_timestamp_entry_objects() {
        let payload = json!([
            {"timestamp": 1720094400, "entry": 95.5},
            {"timestamp": 1720094460, "entry": 96.0},
        ]);
        let points = parse_history(&payload);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].temperature, 95.5);
        assert_eq!(points[0].timestamp.timestamp(), 1720094400);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let payload = json!([
            [1720094400, 95.5],
            ["not-a-time", 96.0],
            {"timestamp": 1720094460},
            42,
        ]);
        let points = parse_history(&payload);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_parse_millisecond_epochs() {
        let payload = json!([[1720094400000i64, 95.5]]);
        let points = parse_history(&payload);
        assert_eq!(points[0].timestamp.timestamp(), 1720094400);
    }

    #[test]
    fn test_recognizes_history_envelopes() {
        assert!(is_history_payload(&json!([])));
        assert!(is_history_payload(&json!({"data": []})));
        assert!(is_history_payload(&json!({"temperatures": [[1720094400, 95.5]]})));
        assert!(!is_history_payload(&json!({"error": "database not initialised"})));
        assert!(!is_history_payload(&json!("nope")));
    }
}
