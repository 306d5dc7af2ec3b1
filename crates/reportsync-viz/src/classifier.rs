//! Metric name → chart shape and artifact filename

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Metrics charted as paired ATLS/BTLS bars
pub const COMPARATIVE_METRICS: [&str; 5] = [
    "Open ALL RRR Defects",
    "Open Security Defects",
    "All Open Defects (T-1)",
    "All Security Open Defects",
    "Load/Performance",
];

/// Metrics charted as a line over versions
pub const TREND_METRICS: [&str; 3] = [
    "E2E Test Coverage",
    "Automation Test Coverage",
    "Unit Test Coverage",
];

/// Metrics charted as plain bars
pub const COUNT_METRICS: [&str; 2] = ["Defect Closure Rate", "Regression Issues"];

/// The one metric charted as paired pass/fail bars
pub const PASS_FAIL_METRIC: &str = "Customer Specific Testing (UAT)";

pub(crate) const ARTIFACT_EXTENSION: &str = "svg";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// How a metric is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartShape {
    PairedBarAtlsBtls,
    SingleLine,
    SingleBar,
    PairedBarPassFail,
}

impl ChartShape {
    /// Whether the payload carries two series
    #[inline]
    #[must_use]
    pub const fn is_paired(self) -> bool {
        matches!(self, Self::PairedBarAtlsBtls | Self::PairedBarPassFail)
    }

    /// Payload keys of the two series, for paired shapes
    #[must_use]
    pub const fn series_keys(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::PairedBarAtlsBtls => Some(("ATLS", "BTLS")),
            Self::PairedBarPassFail => Some(("Pass", "Fail")),
            Self::SingleLine | Self::SingleBar => None,
        }
    }
}

impl Display for ChartShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PairedBarAtlsBtls => "paired_bar_atls_btls",
            Self::SingleLine => "single_line",
            Self::SingleBar => "single_bar",
            Self::PairedBarPassFail => "paired_bar_pass_fail",
        };
        f.write_str(s)
    }
}

/// Chart shape of a metric
///
/// Names outside the known lists are drawn as plain bars.
#[must_use]
pub fn classify(metric: &str) -> ChartShape {
    if COMPARATIVE_METRICS.contains(&metric) {
        ChartShape::PairedBarAtlsBtls
    } else if TREND_METRICS.contains(&metric) {
        ChartShape::SingleLine
    } else if metric == PASS_FAIL_METRIC {
        ChartShape::PairedBarPassFail
    } else {
        ChartShape::SingleBar
    }
}

/// Artifact filename for a metric drawn as `shape`
#[must_use]
pub fn filename(metric: &str, shape: ChartShape) -> String {
    let stem = match shape {
        ChartShape::PairedBarPassFail => "pass_fail".to_string(),
        ChartShape::PairedBarAtlsBtls => format!("{}_atls_btls", slug(metric)),
        ChartShape::SingleLine | ChartShape::SingleBar => slug(metric),
    };
    format!("{stem}.{ARTIFACT_EXTENSION}")
}

/// Artifact filename for a metric under its own classification
#[inline]
#[must_use]
pub fn artifact_filename(metric: &str) -> String {
    filename(metric, classify(metric))
}

fn slug(metric: &str) -> String {
    let lowered = metric.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        "metric".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_lists_classify() {
        for name in COMPARATIVE_METRICS {
            assert_eq!(classify(name), ChartShape::PairedBarAtlsBtls);
        }
        for name in TREND_METRICS {
            assert_eq!(classify(name), ChartShape::SingleLine);
        }
        for name in COUNT_METRICS {
            assert_eq!(classify(name), ChartShape::SingleBar);
        }
        assert_eq!(classify(PASS_FAIL_METRIC), ChartShape::PairedBarPassFail);
    }

    #[test]
    fn unknown_metric_is_single_bar() {
        assert_eq!(classify("Mean Time To Recovery"), ChartShape::SingleBar);
        assert_eq!(classify("open all rrr defects"), ChartShape::SingleBar);
    }

    #[test]
    fn filenames_follow_shape() {
        assert_eq!(
            artifact_filename("All Open Defects (T-1)"),
            "all_open_defects_t_1_atls_btls.svg"
        );
        assert_eq!(artifact_filename("Load/Performance"), "load_performance_atls_btls.svg");
        assert_eq!(artifact_filename("E2E Test Coverage"), "e2e_test_coverage.svg");
        assert_eq!(artifact_filename("Regression Issues"), "regression_issues.svg");
        assert_eq!(artifact_filename(PASS_FAIL_METRIC), "pass_fail.svg");
    }

    #[test]
    fn degenerate_names_still_get_a_file() {
        assert_eq!(artifact_filename("%%%"), "metric.svg");
        assert_eq!(artifact_filename("  Défauts  ouverts "), "d_fauts_ouverts.svg");
    }

    #[test]
    fn series_keys_only_for_paired() {
        assert_eq!(ChartShape::PairedBarAtlsBtls.series_keys(), Some(("ATLS", "BTLS")));
        assert_eq!(ChartShape::PairedBarPassFail.series_keys(), Some(("Pass", "Fail")));
        assert!(ChartShape::SingleLine.series_keys().is_none());
        assert!(!ChartShape::SingleBar.is_paired());
    }
}
