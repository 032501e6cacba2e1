// External crates
use serde::ser::{Error as _, SerializeTuple};
use serde::{Serialize, Serializer};

/// Submission semantics of a metric.
///
/// Serialized as the lowercase name Datadog expects in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Monotonic increment.
    Counter,
    /// Point-in-time value.
    Gauge,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(timestamp, value)` pair submitted for a metric.
///
/// On the wire a point is a two element array `[timestamp, value]`, with the
/// timestamp expressed as epoch seconds. Non-finite numbers have no JSON
/// form, so serializing one is an error rather than a `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: f64,
    pub value: f64,
}

impl Serialize for DataPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.timestamp.is_finite() || !self.value.is_finite() {
            return Err(S::Error::custom(format_args!(
                "unsupported non-finite point [{}, {}]",
                self.timestamp, self.value
            )));
        }

        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.timestamp)?;
        pair.serialize_element(&self.value)?;
        pair.end()
    }
}

/// A validated metric submission, built once by the parser and consumed once
/// by the submitter.
///
/// Field order matches the payload Datadog's series endpoint accepts, so the
/// dry run output can be pasted straight into a request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    #[serde(rename = "metric")]
    pub name: String,
    pub points: Vec<DataPoint>,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub tags: Vec<String>,
}
