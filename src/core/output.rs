use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::core::series::fill;
use crate::types::{AppError, AppResult, CampaignSummary, TargetReport};

/// Wipes and recreates the output directory. Leftovers from a previous run
/// would silently mix with the new files otherwise.
pub fn prepare_output_dir(dir: &Path) -> AppResult<()> {
    if dir.exists() {
        warn!("Output directory {} exists; clearing it", dir.display());
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Writes one dense series as `<target>_<series>.txt`: one `bin,value` line
/// per bin, bin numbers one-based for the plotting tools downstream.
pub fn write_series(dir: &Path, target: &str, series: &str, dense: &[u64]) -> AppResult<()> {
    let mut contents = String::with_capacity(dense.len() * 8);
    for (index, value) in dense.iter().enumerate() {
        contents.push_str(&format!("{},{value}\n", index + 1));
    }
    fs::write(dir.join(format!("{target}_{series}.txt")), contents)?;
    Ok(())
}

/// Fills and writes every series of one target report.
pub fn write_target_series(dir: &Path, report: &TargetReport, max_bin: i64) -> AppResult<()> {
    for (kind, sparse) in &report.series {
        let dense = fill(sparse, max_bin).map_err(|source| AppError::Series {
            target: report.name.clone(),
            series: kind.to_string(),
            source,
        })?;
        write_series(dir, &report.name, &kind.to_string(), &dense)?;
    }
    Ok(())
}

pub fn write_summary(dir: &Path, summary: &CampaignSummary) -> AppResult<()> {
    let path = dir.join("summary.json");
    fs::write(&path, serde_json::to_string_pretty(summary)?)?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::series::{SeriesBinMap, SeriesKind};
    use crate::types::{AnalysisKind, StartTimeSource, TargetSummary};

    #[test]
    fn prepare_clears_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("stale.txt"), "old").unwrap();

        prepare_output_dir(&out).unwrap();
        assert!(out.exists());
        assert!(!out.join("stale.txt").exists());
    }

    #[test]
    fn series_lines_are_one_based() {
        let dir = tempfile::tempdir().unwrap();
        write_series(dir.path(), "demo", "edges", &[0, 3, 3, 7]).unwrap();

        let text = fs::read_to_string(dir.path().join("demo_edges.txt")).unwrap();
        assert_eq!(text, "1,0\n2,3\n3,3\n4,7\n");
    }

    #[test]
    fn target_series_are_filled_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut series = BTreeMap::new();
        let sparse: SeriesBinMap = [(0, 0), (2, 5)].into_iter().collect();
        series.insert(SeriesKind::Crashes, sparse);

        let report = TargetReport {
            name: "demo".to_string(),
            series,
            summary: TargetSummary {
                start_time: 0,
                start_time_source: StartTimeSource::Config,
                failed_invocations: 0,
                totals: BTreeMap::new(),
                signals: BTreeMap::new(),
            },
        };

        write_target_series(dir.path(), &report, 4).unwrap();
        let text = fs::read_to_string(dir.path().join("demo_crashes.txt")).unwrap();
        assert_eq!(text, "1,0\n2,0\n3,5\n4,5\n5,5\n");
    }

    #[test]
    fn summary_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut targets = BTreeMap::new();
        targets.insert(
            "demo".to_string(),
            TargetSummary {
                start_time: 1700000000,
                start_time_source: StartTimeSource::FuzzerStats,
                failed_invocations: 1,
                totals: [("edges".to_string(), 42)].into_iter().collect(),
                signals: [(6, 2)].into_iter().collect(),
            },
        );
        let summary = CampaignSummary {
            analysis: AnalysisKind::Edges,
            generated_at: Utc::now(),
            bucket: "hour".to_string(),
            bin_width_secs: 3600,
            max_bin: 24,
            baseline_edges: Some(7),
            targets,
        };

        write_summary(dir.path(), &summary).unwrap();
        let text = fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["analysis"], "edges");
        assert_eq!(value["baseline_edges"], 7);
        assert_eq!(value["targets"]["demo"]["totals"]["edges"], 42);
        assert_eq!(value["targets"]["demo"]["start_time_source"], "fuzzer_stats");
        assert_eq!(value["targets"]["demo"]["signals"]["6"], 2);
    }
}
