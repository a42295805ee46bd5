//! Per-frame scalar series

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One value per frame, ordered by frame index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarSeries {
    pub name: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl ScalarSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Mean of the finite values, `None` for an empty series
    pub fn mean(&self) -> Option<f64> {
        let finite: Vec<f64> = self.values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }

    /// Write `timestamp,<name>` CSV rows with an RFC 3339 timestamp
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "timestamp,{}", self.name)?;
        for (ts, value) in self.iter() {
            writeln!(writer, "{},{}", ts.to_rfc3339_opts(SecondsFormat::Secs, true), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_csv_output() {
        let mut series = ScalarSeries::new("WATER_LEVEL");
        series.push(Utc.with_ymd_and_hms(2019, 1, 5, 0, 0, 0).unwrap(), 0.5);
        series.push(Utc.with_ymd_and_hms(2019, 1, 10, 0, 0, 0).unwrap(), 0.75);

        let mut out = Vec::new();
        series.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "timestamp,WATER_LEVEL\n2019-01-05T00:00:00Z,0.5\n2019-01-10T00:00:00Z,0.75\n"
        );
        assert_eq!(series.mean(), Some(0.625));
    }

    #[test]
    fn test_empty_series() {
        let series = ScalarSeries::new("COVERAGE");
        assert!(series.is_empty());
        assert_eq!(series.mean(), None);
    }
}
