use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, UNIX_EPOCH};

use covtrail::series::SeriesBinMap;
use covtrail::series::SeriesKind;
use covtrail::types::StartTimeSource;
use covtrail::types::config::ResolvedShowmap;
use covtrail::worker::{EntryFilter, EntryProbe, TargetJob, run_target};
use tempfile::TempDir;

/// Helper to create a corpus file with a fixed mtime
fn write_entry(dir: &Path, name: &str, mtime: i64, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write entry");
    File::options()
        .write(true)
        .open(&path)
        .expect("Failed to open entry")
        .set_modified(UNIX_EPOCH + Duration::from_secs(mtime as u64))
        .expect("Failed to set mtime");
    path
}

/// Helper to create a shell script standing in for an external tool
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    path
}

fn filter(patterns: &[&str], ignore: &[&str]) -> EntryFilter {
    let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
    let ignore: Vec<String> = ignore.iter().map(|s| s.to_string()).collect();
    EntryFilter::new(&patterns, &ignore).expect("Failed to build filter")
}

fn job(name: &str, queue: &Path, probe: EntryProbe, start_time: Option<i64>) -> TargetJob {
    TargetJob {
        name: name.to_string(),
        entry_dirs: vec![queue.display().to_string()],
        filter: filter(&["id:.*"], &["*.cov"]),
        probe,
        start_time,
        bin_width_secs: 60,
        running: Arc::new(AtomicBool::new(true)),
        progress: None,
    }
}

fn sparse(pairs: &[(i64, u64)]) -> SeriesBinMap {
    pairs.iter().copied().collect()
}

#[tokio::test]
async fn coverage_pipeline_builds_all_series() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let queue = dir.path().join("queue");
    fs::create_dir(&queue).expect("Failed to create queue");

    // Each entry has a sibling `.cov` file holding the coverage map the
    // fake showmap copies to the artifact path
    write_entry(&queue, "id:000001", 10_030, "a");
    write_entry(&queue, "id:000001.cov", 10_030, "1:1\n2:1\n");
    write_entry(&queue, "id:000002", 10_090, "b");
    write_entry(&queue, "id:000002.cov", 10_090, "1:1\n");
    write_entry(&queue, "id:000003", 10_125, "c");
    write_entry(&queue, "id:000003.cov", 10_125, "1:5\n3:1\n");
    write_entry(&queue, "id:000004", 10_140, "d");
    write_entry(&queue, "id:000004.cov", 10_140, "1:6\n");

    // cp fails without creating the artifact when the .cov sibling is missing
    let showmap_script = write_script(dir.path(), "showmap.sh", "cp \"$2.cov\" \"$1\"");
    let showmap = ResolvedShowmap {
        command: format!("sh {} ## @@", showmap_script.display()),
        output: dir.path().join("cov").display().to_string(),
        timeout_secs: Some(10),
    };

    let report = run_target(job(
        "demo",
        &queue,
        EntryProbe::Coverage(covtrail::showmap::ShowmapRunner::new(&showmap, "0")),
        Some(10_000),
    ))
    .await
    .expect("Worker failed");

    // Entries land in minute bins 0, 1, 2, 2
    assert_eq!(
        report.series[&SeriesKind::Entries],
        sparse(&[(0, 1), (1, 2), (2, 4)])
    );
    // Edge 3 first appears in bin 2
    assert_eq!(
        report.series[&SeriesKind::Edges],
        sparse(&[(0, 2), (1, 2), (2, 3)])
    );
    // Entry 3 opens bucket 4 on edge 1 and a brand-new edge; entry 4 only
    // repeats known buckets
    assert_eq!(
        report.series[&SeriesKind::NovelPathsBucketed],
        sparse(&[(0, 1), (1, 1), (2, 2)])
    );
    // Raw counts 5 and 6 on edge 1 are distinct, so entry 4 still counts
    assert_eq!(
        report.series[&SeriesKind::NovelPathsRaw],
        sparse(&[(0, 1), (1, 1), (2, 3)])
    );

    assert_eq!(report.summary.totals["entries"], 4);
    assert_eq!(report.summary.totals["edges"], 3);
    assert_eq!(report.summary.totals["novel_paths_bucketed"], 2);
    assert_eq!(report.summary.totals["novel_paths_raw"], 3);
    assert_eq!(report.summary.failed_invocations, 0);
    assert_eq!(report.summary.start_time_source, StartTimeSource::Config);
}

#[tokio::test]
async fn failed_showmap_runs_are_skipped_but_counted() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let queue = dir.path().join("queue");
    fs::create_dir(&queue).expect("Failed to create queue");

    write_entry(&queue, "id:000001", 10_030, "a");
    write_entry(&queue, "id:000001.cov", 10_030, "1:1\n");
    // No .cov sibling: the fake showmap fails and no artifact appears
    write_entry(&queue, "id:000002", 10_150, "b");

    let showmap_script = write_script(dir.path(), "showmap.sh", "cp \"$2.cov\" \"$1\"");
    let showmap = ResolvedShowmap {
        command: format!("sh {} ## @@", showmap_script.display()),
        output: dir.path().join("cov").display().to_string(),
        timeout_secs: Some(10),
    };

    let report = run_target(job(
        "demo",
        &queue,
        EntryProbe::Coverage(covtrail::showmap::ShowmapRunner::new(&showmap, "0")),
        Some(10_000),
    ))
    .await
    .expect("Worker failed");

    // The failed entry still advances the entries series
    assert_eq!(
        report.series[&SeriesKind::Entries],
        sparse(&[(0, 1), (2, 2)])
    );
    // But contributes no coverage
    assert_eq!(
        report.series[&SeriesKind::Edges],
        sparse(&[(0, 1), (2, 1)])
    );
    assert_eq!(report.summary.failed_invocations, 1);
}

#[tokio::test]
async fn crash_classifier_admits_by_signal() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let crashes = dir.path().join("crashes");
    fs::create_dir(&crashes).expect("Failed to create crashes dir");

    // Each crash file holds the signal the fake target dies with; 0 means
    // a clean exit (the crash does not reproduce)
    write_entry(&crashes, "id:000001", 100_010, "6");
    write_entry(&crashes, "id:000002", 100_070, "11");
    write_entry(&crashes, "id:000003", 100_130, "0");
    write_entry(&crashes, "id:000004", 100_190, "11");

    let target_script = write_script(
        dir.path(),
        "crashy.sh",
        "sig=\"$(cat \"$1\")\"\nif [ \"$sig\" -gt 0 ]; then kill \"-$sig\" $$; fi\nexit 0",
    );

    let probe = EntryProbe::Classifier {
        command: Some(covtrail::core::process::EntryCommand::new(
            format!("sh {} @@", target_script.display()),
            Some(10),
        )),
        allow_signals: vec![],
        deny_signals: vec![6],
    };

    let report = run_target(job("demo", &crashes, probe, Some(100_000)))
        .await
        .expect("Worker failed");

    assert_eq!(
        report.series[&SeriesKind::Crashes],
        sparse(&[(0, 1), (1, 2), (2, 3), (3, 4)])
    );
    // SIGABRT is denied, the clean exit does not reproduce, both SIGSEGVs
    // are admitted
    assert_eq!(
        report.series[&SeriesKind::UniqueCrashes],
        sparse(&[(0, 0), (1, 1), (2, 1), (3, 2)])
    );
    assert_eq!(report.summary.totals["crashes"], 4);
    assert_eq!(report.summary.totals["unique_crashes"], 2);
    assert_eq!(report.summary.signals[&6], 1);
    assert_eq!(report.summary.signals[&11], 2);
}

#[tokio::test]
async fn false_paths_are_dismissed_by_stdout_marker() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let queue = dir.path().join("queue");
    fs::create_dir(&queue).expect("Failed to create queue");

    write_entry(&queue, "id:000001", 5_010, "FALSE path here");
    write_entry(&queue, "id:000002", 5_070, "genuine input");
    write_entry(&queue, "id:000003", 5_130, "another one");

    // The fake target echoes the entry, so the marker shows up on stdout
    let target_script = write_script(dir.path(), "echoer.sh", "cat \"$1\"");

    let probe = EntryProbe::Execution {
        command: Some(covtrail::core::process::EntryCommand::new(
            format!("sh {} @@", target_script.display()),
            Some(10),
        )),
        false_path_pattern: "FALSE".to_string(),
    };

    let report = run_target(job("demo", &queue, probe, Some(5_000)))
        .await
        .expect("Worker failed");

    assert_eq!(
        report.series[&SeriesKind::Entries],
        sparse(&[(0, 1), (1, 2), (2, 3)])
    );
    assert_eq!(
        report.series[&SeriesKind::RealPaths],
        sparse(&[(0, 0), (1, 1), (2, 2)])
    );
    assert_eq!(report.summary.totals["real_paths"], 2);
}

#[tokio::test]
async fn stats_file_fixes_the_start_time() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let queue = dir.path().join("queue");
    fs::create_dir(&queue).expect("Failed to create queue");

    // fuzzer_stats sits next to the queue directory, AFL-style
    fs::write(
        dir.path().join("fuzzer_stats"),
        "start_time        : 50000\nexecs_done        : 1\n",
    )
    .expect("Failed to write stats");

    write_entry(&queue, "id:000001", 50_030, "x");
    write_entry(&queue, "id:000002", 50_090, "y");

    let probe = EntryProbe::Classifier {
        command: None,
        allow_signals: vec![],
        deny_signals: vec![],
    };
    // The configured start time loses against the stats file
    let report = run_target(job("demo", &queue, probe, Some(1)))
        .await
        .expect("Worker failed");

    assert_eq!(report.summary.start_time, 50_000);
    assert_eq!(
        report.summary.start_time_source,
        StartTimeSource::FuzzerStats
    );
    assert_eq!(
        report.series[&SeriesKind::Crashes],
        sparse(&[(0, 1), (1, 2)])
    );
}
