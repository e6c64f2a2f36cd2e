use std::fs;
use std::path::PathBuf;

use console::style;
use log::info;
use serde::Serialize;

use crate::core::fuzzer_stats;
use crate::core::worker::EntryFilter;
use crate::types::AppResult;
use crate::types::config::config;

#[derive(Serialize)]
struct TargetStatus {
    name: String,
    entry_dirs: Vec<PathBuf>,
    entries: usize,
    stats_file: Option<PathBuf>,
    start_time: Option<i64>,
}

#[derive(Serialize)]
struct JsonTargets {
    targets: Vec<TargetStatus>,
}

pub async fn execute(format: String) -> AppResult<()> {
    let cfg = config();
    let targets = cfg.targets()?;
    let entries_cfg = cfg.entries();
    let filter = EntryFilter::new(&entries_cfg.patterns(), entries_cfg.ignore())?;

    let mut statuses = Vec::new();
    for (name, target) in targets {
        let mut entry_dirs = Vec::new();
        for pattern in &target.entry_dirs {
            if let Ok(paths) = glob::glob(pattern) {
                entry_dirs.extend(paths.flatten().filter(|p| p.is_dir()));
            }
        }

        let mut entries = 0;
        for dir in &entry_dirs {
            if let Ok(listing) = fs::read_dir(dir) {
                entries += listing
                    .flatten()
                    .filter(|d| filter.matches(&d.file_name().to_string_lossy()))
                    .filter(|d| d.path().is_file())
                    .count();
            }
        }

        statuses.push(TargetStatus {
            name: name.clone(),
            stats_file: fuzzer_stats::discover(&entry_dirs),
            entry_dirs,
            entries,
            start_time: target.start_time,
        });
    }

    if format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonTargets { targets: statuses })?
        );
    } else {
        for status in &statuses {
            info!("Target: {}", status.name);
            if status.entry_dirs.is_empty() {
                info!("  entry_dirs: {}", style("nothing matched").red());
            } else {
                for dir in &status.entry_dirs {
                    info!("  entry_dir: {}", dir.display());
                }
            }
            info!("  entries: {}", status.entries);
            match &status.stats_file {
                Some(path) => info!("  stats file: {}", style(path.display()).green()),
                None => info!("  stats file: {}", style("not found").yellow()),
            }
            if let Some(start_time) = status.start_time {
                info!("  start_time: {start_time}");
            }
            info!(""); // Empty line between targets
        }
    }

    Ok(())
}
