use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

const TABLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CHART_TIME_FORMAT: &str = "%H:%M:%S";

/// A single telemetry sample as returned by the `/vehicle_data/` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehicleRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Vehicle speed, absent when the sensor did not report
    #[serde(default)]
    pub speed: Option<f64>,
    pub odometer: f64,
    /// State of charge in percent, 0 to 100
    pub soc: f64,
    /// Elevation in meters
    pub elevation: f64,
    #[serde(default)]
    pub shift_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
}

impl VehicleRecord {
    pub fn local_timestamp(&self, tz: &Tz) -> String {
        self.timestamp
            .with_timezone(tz)
            .format(TABLE_TIME_FORMAT)
            .to_string()
    }

    pub fn speed_label(&self) -> String {
        self.speed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn shift_state_label(&self) -> &str {
        self.shift_state.as_deref().unwrap_or("-")
    }
}

/// One page of the list endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleDataPage {
    pub count: u64,
    pub results: Vec<VehicleRecord>,
    #[serde(rename = "vehicleIDs", default)]
    pub vehicle_ids: Vec<String>,
}

/// State-of-charge series for the chart. X values are seconds since the epoch.
pub fn soc_series(records: &[VehicleRecord]) -> Vec<[f64; 2]> {
    records
        .iter()
        .map(|r| [r.timestamp.timestamp() as f64, r.soc])
        .collect()
}

/// Formats a chart x value (epoch seconds) as a wall clock label in `tz`.
pub fn chart_time_label(epoch_s: f64, tz: &Tz) -> String {
    DateTime::<Utc>::from_timestamp(epoch_s.round() as i64, 0)
        .map(|dt| dt.with_timezone(tz).format(CHART_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_JSON: &str = r#"{
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            {"id": 1, "vehicle_id": "truck-7", "timestamp": "2024-03-01T10:00:00Z", "speed": 42.5, "odometer": 1200.0, "soc": 88, "elevation": 310.0, "shift_state": "D"},
            {"id": 2, "vehicle_id": "truck-7", "timestamp": "2024-03-01T10:00:10+01:00", "speed": null, "odometer": 1200.4, "soc": 87, "elevation": 311.5, "shift_state": null}
        ],
        "vehicleIDs": ["truck-7", "van-2"]
    }"#;

    #[test]
    fn test_page_deserialization() {
        let page: VehicleDataPage = serde_json::from_str(PAGE_JSON).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.vehicle_ids, vec!["truck-7", "van-2"]);

        let second = &page.results[1];
        assert_eq!(second.speed, None);
        assert_eq!(second.shift_state, None);
        // offsets are normalized to UTC
        assert_eq!(second.timestamp.to_rfc3339(), "2024-03-01T09:00:10+00:00");
    }

    #[test]
    fn test_missing_vehicle_ids_defaults_to_empty() {
        let page: VehicleDataPage =
            serde_json::from_str(r#"{"count": 0, "results": []}"#).unwrap();
        assert!(page.vehicle_ids.is_empty());
    }

    #[test]
    fn test_optional_field_labels() {
        let page: VehicleDataPage = serde_json::from_str(PAGE_JSON).unwrap();
        assert_eq!(page.results[0].speed_label(), "42.5");
        assert_eq!(page.results[0].shift_state_label(), "D");
        assert_eq!(page.results[1].speed_label(), "-");
        assert_eq!(page.results[1].shift_state_label(), "-");
    }

    #[test]
    fn test_soc_series_and_labels() {
        let page: VehicleDataPage = serde_json::from_str(PAGE_JSON).unwrap();
        let series = soc_series(&page.results);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0][1], 88.0);
        assert_eq!(series[1][0] - series[0][0], -3590.0);

        let tz: Tz = "Europe/Berlin".parse().unwrap();
        assert_eq!(chart_time_label(series[0][0], &tz), "11:00:00");
        assert_eq!(
            page.results[0].local_timestamp(&tz),
            "2024-03-01 11:00:00"
        );
    }
}
