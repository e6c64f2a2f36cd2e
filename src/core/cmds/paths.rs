use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use indicatif::MultiProgress;
use log::warn;

use crate::core::cli::AnalysisArgs;
use crate::core::cmds::{campaign_summary, resolve_context, select_targets};
use crate::core::process::EntryCommand;
use crate::core::worker::{EntryFilter, EntryProbe, TargetJob};
use crate::core::{campaign, output};
use crate::types::config::config;
use crate::types::{AnalysisKind, AppResult, ConfigError};

/// Counts real paths over time: entries whose execution does not print the
/// configured false-path marker. Targets with `needs_execution = false`
/// skip the execution and count every entry.
pub async fn execute_paths(args: AnalysisArgs, running: Arc<AtomicBool>) -> AppResult<i32> {
    let cfg = config();
    let ctx = resolve_context(cfg, &args)?;
    let paths_cfg = cfg.paths();
    let entries_cfg = cfg.entries();
    let selected = select_targets(cfg, &args.targets)?;

    let multi = MultiProgress::new();
    let mut jobs = Vec::new();
    for (name, target) in selected {
        let probe = if target.needs_execution() {
            let template = paths_cfg
                .command
                .clone()
                .ok_or(ConfigError::MissingField("paths.command"))?;
            let pattern = paths_cfg
                .false_path_pattern
                .clone()
                .ok_or(ConfigError::MissingField("paths.false_path_pattern"))?;
            EntryProbe::Execution {
                command: Some(EntryCommand::new(template, paths_cfg.timeout_secs)),
                false_path_pattern: pattern,
            }
        } else {
            EntryProbe::Execution {
                command: None,
                false_path_pattern: String::new(),
            }
        };

        jobs.push(TargetJob {
            filter: EntryFilter::new(&entries_cfg.patterns(), entries_cfg.ignore())?,
            probe,
            entry_dirs: target.entry_dirs.clone(),
            start_time: target.start_time,
            bin_width_secs: ctx.params.bin_width_secs(),
            running: Arc::clone(&running),
            progress: Some(campaign::target_progress(&multi, &name)),
            name,
        });
    }

    let report = campaign::run_campaign(jobs, running).await;
    if report.interrupted {
        warn!("Campaign interrupted; no output written");
        return Ok(2);
    }

    output::prepare_output_dir(&ctx.output_dir)?;
    for target in report.targets.values() {
        output::write_target_series(&ctx.output_dir, target, ctx.params.max_bin())?;
    }
    output::write_summary(
        &ctx.output_dir,
        &campaign_summary(AnalysisKind::Paths, &ctx, None, &report),
    )?;

    Ok(0)
}
