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
use crate::types::{AnalysisKind, AppResult};

/// Builds the crash time series from each target's crash directories. With
/// a triage command configured, entries are re-run and admitted as unique
/// crashes based on the signal that killed them.
pub async fn execute_crashes(args: AnalysisArgs, running: Arc<AtomicBool>) -> AppResult<i32> {
    let cfg = config();
    let ctx = resolve_context(cfg, &args)?;
    let crashes_cfg = cfg.crashes();
    let patterns = cfg.crash_patterns();
    let ignore = cfg.entries().ignore().to_vec();
    let selected = select_targets(cfg, &args.targets)?;

    let multi = MultiProgress::new();
    let mut jobs = Vec::new();
    for (name, target) in selected {
        jobs.push(TargetJob {
            filter: EntryFilter::new(&patterns, &ignore)?,
            probe: EntryProbe::Classifier {
                command: crashes_cfg
                    .command
                    .clone()
                    .map(|template| EntryCommand::new(template, crashes_cfg.timeout_secs)),
                allow_signals: crashes_cfg.allow_signals().to_vec(),
                deny_signals: crashes_cfg.deny_signals().to_vec(),
            },
            entry_dirs: target.crash_dirs().to_vec(),
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
        &campaign_summary(AnalysisKind::Crashes, &ctx, None, &report),
    )?;

    Ok(0)
}
