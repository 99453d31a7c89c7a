//! Metric family data model.
//!
//! Mirrors the Prometheus client data model as the game server encodes it:
//! protobuf field names in snake_case, optional scalars that may be absent
//! or `null`, and the metric type given either by name or by number.

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// A named group of samples sharing help text and type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricFamily {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// `None` when the server sent no help at all; an empty string is kept.
    #[serde(default)]
    pub help: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub metric_type: MetricType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metric: Vec<Metric>,
}

/// Kind of a metric family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricType {
    #[default]
    Counter,
    Gauge,
    Summary,
    Untyped,
    Histogram,
    GaugeHistogram,
}

impl MetricType {
    const ALL: [MetricType; 6] = [
        MetricType::Counter,
        MetricType::Gauge,
        MetricType::Summary,
        MetricType::Untyped,
        MetricType::Histogram,
        MetricType::GaugeHistogram,
    ];

    /// The protobuf enum name (`"GAUGE"`, `"GAUGE_HISTOGRAM"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            MetricType::Counter => "COUNTER",
            MetricType::Gauge => "GAUGE",
            MetricType::Summary => "SUMMARY",
            MetricType::Untyped => "UNTYPED",
            MetricType::Histogram => "HISTOGRAM",
            MetricType::GaugeHistogram => "GAUGE_HISTOGRAM",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    fn from_number(n: i64) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Number(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => Self::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown metric type {name:?}"))),
            Repr::Number(n) => Self::from_number(n)
                .ok_or_else(|| de::Error::custom(format!("unknown metric type {n}"))),
        }
    }
}

/// A single sample (or summary/histogram) with its label set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Metric {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: Vec<LabelPair>,
    #[serde(default)]
    pub gauge: Option<Gauge>,
    #[serde(default)]
    pub counter: Option<Counter>,
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub untyped: Option<Untyped>,
    #[serde(default)]
    pub histogram: Option<Histogram>,
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LabelPair {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Gauge {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Counter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Untyped {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_sum: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantile: Vec<Quantile>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Quantile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantile: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Histogram {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_sum: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bucket: Vec<Bucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Bucket {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cumulative_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub upper_bound: f64,
}

/// Decode a JSON array of metric families.
///
/// A bare `null` decodes to an empty set; anything that is not an array
/// of family objects is an error.
pub fn decode_families(raw: &[u8]) -> serde_json::Result<Vec<MetricFamily>> {
    let families: Option<Vec<MetricFamily>> = serde_json::from_slice(raw)?;
    Ok(families.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
