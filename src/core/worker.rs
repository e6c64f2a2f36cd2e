use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;

use globset::{Glob, GlobSet, GlobSetBuilder};
use indicatif::ProgressBar;
use log::{info, warn};
use regex::RegexSet;

use crate::core::fuzzer_stats;
use crate::core::novelty::NoveltyTracker;
use crate::core::process::{EntryCommand, termination_signal};
use crate::core::series::{SeriesAggregator, SeriesKind, bin_of};
use crate::core::showmap::ShowmapRunner;
use crate::types::{
    AppError, AppResult, ConfigError, Entry, StartTimeSource, TargetReport, TargetSummary,
};

/// Decides which files in an entry directory are corpus entries: the name
/// must fully match one of the allow patterns and none of the ignore globs.
#[derive(Debug)]
pub struct EntryFilter {
    allow: RegexSet,
    ignore: GlobSet,
}

impl EntryFilter {
    pub fn new(patterns: &[String], ignore: &[String]) -> Result<Self, ConfigError> {
        // Anchor each pattern so `id:.*` cannot match in the middle of a name
        let anchored: Vec<String> = patterns.iter().map(|p| format!("^(?:{p})$")).collect();
        let allow = RegexSet::new(&anchored).map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })?;

        let mut builder = GlobSetBuilder::new();
        for pattern in ignore {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|source| ConfigError::InvalidGlob {
                pattern: ignore.join(", "),
                source,
            })?;

        Ok(Self { allow, ignore })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        !self.ignore.is_match(file_name) && self.allow.is_match(file_name)
    }
}

/// What to do with each corpus entry.
#[derive(Debug)]
pub enum EntryProbe {
    /// Run the coverage tool and classify the observation's novelty.
    Coverage(ShowmapRunner),
    /// Count crashes; when a command is set, re-run the entry and admit it
    /// as a unique crash based on the termination signal.
    Classifier {
        command: Option<EntryCommand>,
        allow_signals: Vec<i32>,
        deny_signals: Vec<i32>,
    },
    /// Count real paths; when a command is set, an entry whose stdout
    /// contains the pattern is dismissed as a false path. Without a command
    /// every entry counts.
    Execution {
        command: Option<EntryCommand>,
        false_path_pattern: String,
    },
}

impl EntryProbe {
    fn series(&self) -> Vec<SeriesKind> {
        match self {
            EntryProbe::Coverage(_) => vec![
                SeriesKind::Entries,
                SeriesKind::Edges,
                SeriesKind::NovelPathsBucketed,
                SeriesKind::NovelPathsRaw,
            ],
            EntryProbe::Classifier { .. } => {
                vec![SeriesKind::Crashes, SeriesKind::UniqueCrashes]
            }
            EntryProbe::Execution { .. } => vec![SeriesKind::Entries, SeriesKind::RealPaths],
        }
    }
}

/// Everything one worker needs to analyze one target. Built up front by the
/// command layer; the worker only reads it.
#[derive(Debug)]
pub struct TargetJob {
    pub name: String,
    /// Directory names or glob patterns, straight from the config.
    pub entry_dirs: Vec<String>,
    pub filter: EntryFilter,
    pub probe: EntryProbe,
    /// Configured start time; stats files discovered on disk take priority.
    pub start_time: Option<i64>,
    pub bin_width_secs: i64,
    pub running: Arc<AtomicBool>,
    pub progress: Option<ProgressBar>,
}

/// Running counters shared by all probes; which ones move depends on the
/// probe.
#[derive(Debug, Default)]
struct Counters {
    entries: u64,
    novel_bucketed: u64,
    novel_raw: u64,
    crashes: u64,
    unique_crashes: u64,
    real_paths: u64,
    failed_invocations: u64,
    signals: BTreeMap<i32, u64>,
}

/// Analyzes one target start to finish: expand its entry directories, scan
/// and order the corpus, resolve the campaign start, then walk the entries
/// chronologically feeding the probe and the series aggregator.
pub async fn run_target(job: TargetJob) -> AppResult<TargetReport> {
    let dirs = expand_entry_dirs(&job.name, &job.entry_dirs)?;
    let mut entries = scan_entries(&job.name, &dirs, &job.filter)?;
    entries.sort_by(|a, b| (a.observed_at, &a.path).cmp(&(b.observed_at, &b.path)));

    let (start_time, start_time_source) =
        resolve_start_time(&job.name, &dirs, job.start_time, &entries)?;
    info!(
        "{}: {} entries, start time {} ({})",
        job.name,
        entries.len(),
        start_time,
        start_time_source
    );

    if let Some(progress) = &job.progress {
        progress.set_length(entries.len() as u64);
    }

    let mut aggregator = SeriesAggregator::new(job.probe.series());
    let mut tracker = NoveltyTracker::new();
    let mut counters = Counters::default();

    for entry in &entries {
        if !job.running.load(Ordering::SeqCst) {
            warn!("{}: interrupted, stopping...", job.name);
            break;
        }

        let bin = bin_of(entry.observed_at, start_time, job.bin_width_secs);

        match &job.probe {
            EntryProbe::Coverage(showmap) => {
                counters.entries += 1;
                aggregator.record(SeriesKind::Entries, bin, counters.entries);

                match showmap.observe(&entry.path).await {
                    Ok(hits) => {
                        let novelty = tracker.observe(&hits);
                        if novelty.new_bucketed {
                            counters.novel_bucketed += 1;
                        }
                        if novelty.new_raw {
                            counters.novel_raw += 1;
                        }
                    }
                    Err(e) => {
                        counters.failed_invocations += 1;
                        warn!(
                            "{}: no coverage for {}: {e}",
                            job.name,
                            entry.path.display()
                        );
                    }
                }
                aggregator.record(SeriesKind::Edges, bin, tracker.covered_edges());
                aggregator.record(
                    SeriesKind::NovelPathsBucketed,
                    bin,
                    counters.novel_bucketed,
                );
                aggregator.record(SeriesKind::NovelPathsRaw, bin, counters.novel_raw);
            }
            EntryProbe::Classifier {
                command,
                allow_signals,
                deny_signals,
            } => {
                counters.crashes += 1;
                aggregator.record(SeriesKind::Crashes, bin, counters.crashes);

                let admitted = match command {
                    None => true,
                    Some(cmd) => match cmd.run(&entry.path).await {
                        Ok(output) => match termination_signal(&output.status) {
                            Some(signal) => {
                                *counters.signals.entry(signal).or_insert(0) += 1;
                                signal_admitted(signal, allow_signals, deny_signals)
                            }
                            // Did not crash under re-execution
                            None => false,
                        },
                        Err(e) => {
                            counters.failed_invocations += 1;
                            warn!(
                                "{}: cannot classify {}: {e}",
                                job.name,
                                entry.path.display()
                            );
                            false
                        }
                    },
                };
                if admitted {
                    counters.unique_crashes += 1;
                }
                aggregator.record(SeriesKind::UniqueCrashes, bin, counters.unique_crashes);
            }
            EntryProbe::Execution {
                command,
                false_path_pattern,
            } => {
                counters.entries += 1;
                aggregator.record(SeriesKind::Entries, bin, counters.entries);

                let admitted = match command {
                    None => true,
                    Some(cmd) => match cmd.run(&entry.path).await {
                        Ok(output) => {
                            !String::from_utf8_lossy(&output.stdout).contains(false_path_pattern)
                        }
                        Err(e) => {
                            counters.failed_invocations += 1;
                            warn!("{}: cannot execute {}: {e}", job.name, entry.path.display());
                            false
                        }
                    },
                };
                if admitted {
                    counters.real_paths += 1;
                }
                aggregator.record(SeriesKind::RealPaths, bin, counters.real_paths);
            }
        }

        if let Some(progress) = &job.progress {
            progress.inc(1);
        }
    }

    if let Some(progress) = &job.progress {
        progress.finish_with_message(format!("{} done", job.name));
    }

    let mut totals = BTreeMap::new();
    match &job.probe {
        EntryProbe::Coverage(_) => {
            totals.insert(SeriesKind::Entries.to_string(), counters.entries);
            totals.insert(SeriesKind::Edges.to_string(), tracker.covered_edges());
            totals.insert(
                SeriesKind::NovelPathsBucketed.to_string(),
                counters.novel_bucketed,
            );
            totals.insert(SeriesKind::NovelPathsRaw.to_string(), counters.novel_raw);
            info!(
                "{}: {} covered edges, {} novel bucketed, {} novel raw",
                job.name,
                tracker.covered_edges(),
                counters.novel_bucketed,
                counters.novel_raw
            );
        }
        EntryProbe::Classifier { .. } => {
            totals.insert(SeriesKind::Crashes.to_string(), counters.crashes);
            totals.insert(
                SeriesKind::UniqueCrashes.to_string(),
                counters.unique_crashes,
            );
            info!(
                "{}: {} crashes, {} unique",
                job.name, counters.crashes, counters.unique_crashes
            );
        }
        EntryProbe::Execution { .. } => {
            totals.insert(SeriesKind::Entries.to_string(), counters.entries);
            totals.insert(SeriesKind::RealPaths.to_string(), counters.real_paths);
            info!(
                "{}: {} real paths out of {} entries",
                job.name, counters.real_paths, counters.entries
            );
        }
    }

    Ok(TargetReport {
        name: job.name,
        series: aggregator.finalize(),
        summary: TargetSummary {
            start_time,
            start_time_source,
            failed_invocations: counters.failed_invocations,
            totals,
            signals: counters.signals,
        },
    })
}

/// Admission policy for crash signals: the deny list always wins, and a
/// non-empty allow list admits nothing outside itself.
fn signal_admitted(signal: i32, allow: &[i32], deny: &[i32]) -> bool {
    if deny.contains(&signal) {
        return false;
    }
    allow.is_empty() || allow.contains(&signal)
}

/// Expands directory names and glob patterns into concrete directories.
/// A pattern that matches nothing gets a warning; matching nothing overall
/// fails the target.
fn expand_entry_dirs(name: &str, patterns: &[String]) -> AppResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for pattern in patterns {
        let paths = glob::glob(pattern)
            .map_err(|e| AppError::target(name, format!("bad entry_dirs pattern '{pattern}': {e}")))?;
        let mut matched = false;
        for path in paths.flatten() {
            if path.is_dir() {
                dirs.push(path);
                matched = true;
            }
        }
        if !matched {
            warn!("{name}: entry_dirs pattern '{pattern}' matched no directories");
        }
    }
    if dirs.is_empty() {
        return Err(AppError::target(name, "no entry directories found"));
    }
    Ok(dirs)
}

/// Collects every qualifying file from the given directories together with
/// its mtime. Files that disappear or cannot be stat'ed are skipped with a
/// warning.
fn scan_entries(name: &str, dirs: &[PathBuf], filter: &EntryFilter) -> AppResult<Vec<Entry>> {
    let mut entries = Vec::new();
    for dir in dirs {
        let listing = fs::read_dir(dir)
            .map_err(|e| AppError::target(name, format!("cannot list {}: {e}", dir.display())))?;
        for dirent in listing {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    warn!("{name}: unreadable directory entry in {}: {e}", dir.display());
                    continue;
                }
            };
            let path = dirent.path();
            let file_name = dirent.file_name().to_string_lossy().into_owned();
            if !filter.matches(&file_name) {
                continue;
            }
            let metadata = match fs::metadata(&path) {
                Ok(md) if md.is_file() => md,
                Ok(_) => continue,
                Err(e) => {
                    warn!("{name}: cannot stat {}: {e}", path.display());
                    continue;
                }
            };
            match mtime_secs(&metadata) {
                Some(observed_at) => entries.push(Entry::new(path, observed_at)),
                None => warn!("{name}: no usable mtime for {}", path.display()),
            }
        }
    }
    Ok(entries)
}

fn mtime_secs(metadata: &fs::Metadata) -> Option<i64> {
    let modified = metadata.modified().ok()?;
    match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => Some(after.as_secs() as i64),
        Err(before) => Some(-(before.duration().as_secs() as i64)),
    }
}

/// Resolves the campaign start time with the same priorities the fuzzers
/// themselves imply: a stats file on disk beats the config, the config
/// beats guessing, and the guess is the earliest entry's mtime.
fn resolve_start_time(
    name: &str,
    dirs: &[PathBuf],
    configured: Option<i64>,
    entries: &[Entry],
) -> AppResult<(i64, StartTimeSource)> {
    if let Some(stats_path) = fuzzer_stats::discover(dirs) {
        let start = fuzzer_stats::parse_start_time(&stats_path)
            .map_err(|e| AppError::target(name, e.to_string()))?;
        if configured.is_some() {
            warn!(
                "{name}: start_time configured but {} exists; using the stats file",
                stats_path.display()
            );
        }
        return Ok((start, StartTimeSource::FuzzerStats));
    }

    if let Some(start) = configured {
        return Ok((start, StartTimeSource::Config));
    }

    if let Some(first) = entries.first() {
        warn!("{name}: no stats file or configured start_time; using the earliest entry mtime");
        return Ok((first.observed_at, StartTimeSource::EarliestEntry));
    }

    Err(AppError::target(
        name,
        "cannot determine the campaign start time (no stats file, no start_time, no entries)",
    ))
}
