use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::core::series::{SeriesBinMap, SeriesKind};

/// Which analysis produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Edges,
    Crashes,
    Paths,
}

/// Where a target's campaign start time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StartTimeSource {
    FuzzerStats,
    Config,
    EarliestEntry,
}

/// Per-target figures for `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub start_time: i64,
    pub start_time_source: StartTimeSource,
    pub failed_invocations: u64,
    pub totals: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub signals: BTreeMap<i32, u64>,
}

/// Everything a worker hands back for one target: the sparse cumulative
/// series plus the summary figures derived while building them.
#[derive(Debug)]
pub struct TargetReport {
    pub name: String,
    pub series: BTreeMap<SeriesKind, SeriesBinMap>,
    pub summary: TargetSummary,
}

#[derive(Debug, Serialize)]
pub struct CampaignSummary {
    pub analysis: AnalysisKind,
    pub generated_at: DateTime<Utc>,
    pub bucket: String,
    pub bin_width_secs: i64,
    pub max_bin: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_edges: Option<u64>,
    pub targets: BTreeMap<String, TargetSummary>,
}
