//! Observations and their mapping to Prometheus exposition text.

use std::collections::BTreeMap;

/// Label set of one sample. Keys are unique and iterate in sorted order.
pub type Labels = BTreeMap<String, String>;

/// Prometheus metric type of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// One metric sample produced by a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Full metric name, prefix included.
    pub name: String,
    pub labels: Labels,
    pub value: f64,
    pub kind: MetricKind,
}

impl Observation {
    /// Value of a label, if set.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Format labels for Prometheus exposition format, merging `extra`
    /// labels that the observation does not already carry.
    pub fn format_labels(&self, extra: &Labels) -> String {
        if extra.is_empty() {
            return format_labels(self.labels.iter());
        }

        let mut merged = self.labels.clone();
        for (k, v) in extra {
            merged.entry(k.clone()).or_insert_with(|| v.clone());
        }
        format_labels(merged.iter())
    }
}

/// Build a label set from `(key, value)` pairs.
pub fn labels<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Labels
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Sanitize a metric name to be Prometheus-compatible.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
/// This function:
/// - Replaces invalid characters with underscores
/// - Ensures the name starts with a letter or underscore
/// - Collapses multiple underscores into one
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;
    let mut chars = name.chars().peekable();

    // A leading digit is kept behind an underscore
    if let Some(&first) = chars.peek() {
        if first.is_ascii_digit() {
            result.push('_');
            last_was_underscore = true;
        }
    }

    for c in chars {
        let is_valid_char = c.is_ascii_alphanumeric() || c == '_' || c == ':';

        if is_valid_char {
            if c == '_' {
                if !last_was_underscore {
                    result.push(c);
                    last_was_underscore = true;
                }
            } else {
                result.push(c);
                last_was_underscore = false;
            }
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("unnamed");
    }

    result
}

/// Sanitize a label name to be Prometheus-compatible.
///
/// Prometheus label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Labels starting with `__` are reserved for internal use.
pub fn sanitize_label_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for (i, c) in name.chars().enumerate() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            result.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "label".to_string();
    }

    // Reserved
    if result.starts_with("__") {
        result.insert(0, 'z');
    }

    result
}

/// Build a full metric name: `{prefix}_{name}`.
pub fn build_metric_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
pub fn format_labels<'a>(labels: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    let parts: Vec<String> = labels
        .into_iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    if parts.is_empty() {
        return String::new();
    }

    format!("{{{}}}", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(labels: Labels) -> Observation {
        Observation {
            name: "mbg_ltos_up".to_string(),
            labels,
            value: 1.0,
            kind: MetricKind::Gauge,
        }
    }

    #[test]
    fn test_sanitize_metric_name_simple() {
        assert_eq!(sanitize_metric_name("mbg_ltos"), "mbg_ltos");
        assert_eq!(sanitize_metric_name("system_uptime"), "system_uptime");
    }

    #[test]
    fn test_sanitize_metric_name_special_chars() {
        assert_eq!(sanitize_metric_name("mbg-ltos"), "mbg_ltos");
        assert_eq!(sanitize_metric_name("lantime.m600%"), "lantime_m600");
        assert_eq!(sanitize_metric_name("a//b//c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_metric_name_leading_number() {
        assert_eq!(sanitize_metric_name("1ltos"), "_1ltos");
    }

    #[test]
    fn test_sanitize_metric_name_empty() {
        assert_eq!(sanitize_metric_name(""), "unnamed");
        assert_eq!(sanitize_metric_name("///"), "unnamed");
    }

    #[test]
    fn test_sanitize_metric_name_colons() {
        assert_eq!(sanitize_metric_name("foo:bar:baz"), "foo:bar:baz");
    }

    #[test]
    fn test_sanitize_label_name() {
        assert_eq!(sanitize_label_name("site"), "site");
        assert_eq!(sanitize_label_name("data-center"), "data_center");
        assert_eq!(sanitize_label_name("rack.row"), "rack_row");
        assert_eq!(sanitize_label_name("__meta"), "z__meta");
    }

    #[test]
    fn test_build_metric_name() {
        assert_eq!(build_metric_name("mbg_ltos", "up"), "mbg_ltos_up");
        assert_eq!(build_metric_name("", "up"), "up");
    }

    #[test]
    fn test_format_labels_sorted() {
        let obs = observation(labels([("target", "http://ltos"), ("host", "ltos01")]));
        assert_eq!(
            obs.format_labels(&Labels::new()),
            "{host=\"ltos01\",target=\"http://ltos\"}"
        );
    }

    #[test]
    fn test_format_labels_merges_extra_without_override() {
        let obs = observation(labels([("host", "ltos01")]));
        let extra = labels([("host", "other"), ("site", "dc1")]);
        assert_eq!(
            obs.format_labels(&extra),
            "{host=\"ltos01\",site=\"dc1\"}"
        );
    }

    #[test]
    fn test_format_labels_empty() {
        let obs = observation(Labels::new());
        assert_eq!(obs.format_labels(&Labels::new()), "");
    }

    #[test]
    fn test_label_lookup() {
        let obs = observation(labels([("host", "ltos01")]));
        assert_eq!(obs.label("host"), Some("ltos01"));
        assert_eq!(obs.label("slot_id"), None);
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(0.48), "0.48");
        assert_eq!(format_value(233_910_272.0), "233910272");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_metric_kind_as_str() {
        assert_eq!(MetricKind::Counter.as_str(), "counter");
        assert_eq!(MetricKind::Gauge.as_str(), "gauge");
    }
}
