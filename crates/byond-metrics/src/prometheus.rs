//! Prometheus text exposition format.
//!
//! Renders gathered metric families into the text exposition format
//! (version 0.0.4) for scraping by a Prometheus server or compatible agent.

use thiserror::Error;

use crate::model::{Bucket, LabelPair, Metric, MetricFamily, MetricType};

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A family that cannot be expressed in the text format.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("metric family has no name")]
    MissingName,

    #[error("metric family {0} has no metrics")]
    Empty(String),

    #[error("expected {expected} value in metric family {family}")]
    MissingValue {
        family: String,
        expected: &'static str,
    },
}

/// Render metric families into Prometheus text format.
///
/// Fails on the first family that cannot be rendered; no partial output
/// is returned.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, EncodeError> {
    let mut out = String::new();
    for family in families {
        encode_family(&mut out, family)?;
    }
    Ok(out)
}

fn encode_family(out: &mut String, family: &MetricFamily) -> Result<(), EncodeError> {
    let name = family.name.as_str();
    if name.is_empty() {
        return Err(EncodeError::MissingName);
    }
    if family.metric.is_empty() {
        return Err(EncodeError::Empty(name.to_string()));
    }

    if let Some(help) = &family.help {
        out.push_str(&format!("# HELP {name} {}\n", escape_help(help)));
    }
    out.push_str(&format!("# TYPE {name} {}\n", type_name(family.metric_type)));

    let missing = |expected| EncodeError::MissingValue {
        family: name.to_string(),
        expected,
    };

    for metric in &family.metric {
        match family.metric_type {
            MetricType::Counter => {
                let counter = metric.counter.as_ref().ok_or_else(|| missing("counter"))?;
                write_sample(out, name, "", metric, None, counter.value);
            }
            MetricType::Gauge => {
                let gauge = metric.gauge.as_ref().ok_or_else(|| missing("gauge"))?;
                write_sample(out, name, "", metric, None, gauge.value);
            }
            MetricType::Untyped => {
                let untyped = metric.untyped.as_ref().ok_or_else(|| missing("untyped"))?;
                write_sample(out, name, "", metric, None, untyped.value);
            }
            MetricType::Summary => {
                let summary = metric.summary.as_ref().ok_or_else(|| missing("summary"))?;
                for q in &summary.quantile {
                    let extra = ("quantile", format_float(q.quantile));
                    write_sample(out, name, "", metric, Some(extra), q.value);
                }
                write_sample(out, name, "_sum", metric, None, summary.sample_sum);
                write_sample(out, name, "_count", metric, None, summary.sample_count as f64);
            }
            MetricType::Histogram | MetricType::GaugeHistogram => {
                let histogram = metric
                    .histogram
                    .as_ref()
                    .ok_or_else(|| missing("histogram"))?;
                for bucket in &histogram.bucket {
                    write_bucket(out, name, metric, bucket);
                }
                let has_inf = histogram
                    .bucket
                    .iter()
                    .any(|b| b.upper_bound == f64::INFINITY);
                if !has_inf {
                    let inf = Bucket {
                        cumulative_count: histogram.sample_count,
                        upper_bound: f64::INFINITY,
                    };
                    write_bucket(out, name, metric, &inf);
                }
                write_sample(out, name, "_sum", metric, None, histogram.sample_sum);
                write_sample(out, name, "_count", metric, None, histogram.sample_count as f64);
            }
        }
    }

    Ok(())
}

fn type_name(metric_type: MetricType) -> &'static str {
    match metric_type {
        MetricType::Counter => "counter",
        MetricType::Gauge => "gauge",
        MetricType::Summary => "summary",
        MetricType::Untyped => "untyped",
        // The 0.0.4 text format has no gauge histogram type.
        MetricType::Histogram | MetricType::GaugeHistogram => "histogram",
    }
}

fn write_bucket(out: &mut String, name: &str, metric: &Metric, bucket: &Bucket) {
    let extra = ("le", format_float(bucket.upper_bound));
    write_sample(
        out,
        name,
        "_bucket",
        metric,
        Some(extra),
        bucket.cumulative_count as f64,
    );
}

/// Write one `name{labels} value [timestamp]` line.
fn write_sample(
    out: &mut String,
    name: &str,
    suffix: &str,
    metric: &Metric,
    extra: Option<(&str, String)>,
    value: f64,
) {
    out.push_str(name);
    out.push_str(suffix);
    write_labels(out, &metric.label, extra);
    out.push(' ');
    out.push_str(&format_float(value));
    if let Some(ts) = metric.timestamp_ms {
        out.push_str(&format!(" {ts}"));
    }
    out.push('\n');
}

fn write_labels(out: &mut String, labels: &[LabelPair], extra: Option<(&str, String)>) {
    if labels.is_empty() && extra.is_none() {
        return;
    }

    out.push('{');
    let mut first = true;
    let pairs = labels
        .iter()
        .map(|l| (l.name.as_str(), l.value.as_str()))
        .chain(extra.as_ref().map(|(n, v)| (*n, v.as_str())));
    for (label, value) in pairs {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&format!("{label}=\"{}\"", escape_label_value(value)));
    }
    out.push('}');
}

fn format_float(v: f64) -> String {
    if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if v.is_nan() {
        "NaN".to_string()
    } else {
        v.to_string()
    }
}

fn escape_help(s: &str) -> String {
    s.replace('\\', r"\\").replace('\n', r"\n")
}

fn escape_label_value(s: &str) -> String {
    s.replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}
