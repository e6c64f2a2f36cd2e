use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use indicatif::MultiProgress;
use log::{info, warn};

use crate::core::cli::AnalysisArgs;
use crate::core::cmds::{campaign_summary, resolve_context, select_targets};
use crate::core::novelty::EdgeId;
use crate::core::series::{SeriesKind, fill};
use crate::core::showmap::ShowmapRunner;
use crate::core::worker::{EntryFilter, EntryProbe, TargetJob};
use crate::core::{campaign, output};
use crate::types::config::{ResolvedShowmap, config};
use crate::types::{AnalysisKind, AppError, AppResult};

/// Replays every target's corpus through the coverage tool, producing the
/// entries, edges and novelty series, plus edges_found relative to the seed
/// baseline when a seed corpus is configured.
pub async fn execute_edges(args: AnalysisArgs, running: Arc<AtomicBool>) -> AppResult<i32> {
    let cfg = config();
    let ctx = resolve_context(cfg, &args)?;
    let showmap = cfg.resolve_showmap()?;
    let entries_cfg = cfg.entries();
    let selected = select_targets(cfg, &args.targets)?;

    // The seed corpus is replayed first: its edge count is the baseline the
    // edges_found series is measured against.
    let baseline = match &cfg.seeds().dir {
        Some(dir) => Some(seed_baseline(&showmap, dir).await?),
        None => None,
    };

    let multi = MultiProgress::new();
    let mut jobs = Vec::new();
    for (index, (name, target)) in selected.into_iter().enumerate() {
        jobs.push(TargetJob {
            filter: EntryFilter::new(&entries_cfg.patterns(), entries_cfg.ignore())?,
            probe: EntryProbe::Coverage(ShowmapRunner::new(&showmap, &index.to_string())),
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
    let max_bin = ctx.params.max_bin();
    for target in report.targets.values() {
        output::write_target_series(&ctx.output_dir, target, max_bin)?;

        if let Some(baseline) = baseline
            && let Some(edges) = target.series.get(&SeriesKind::Edges)
        {
            let dense = fill(edges, max_bin).map_err(|source| AppError::Series {
                target: target.name.clone(),
                series: SeriesKind::EdgesFound.to_string(),
                source,
            })?;
            let found: Vec<u64> = dense.iter().map(|v| v.saturating_sub(baseline)).collect();
            output::write_series(
                &ctx.output_dir,
                &target.name,
                &SeriesKind::EdgesFound.to_string(),
                &found,
            )?;
        }
    }
    output::write_summary(
        &ctx.output_dir,
        &campaign_summary(AnalysisKind::Edges, &ctx, baseline, &report),
    )?;

    Ok(0)
}

/// Runs the whole seed corpus through the coverage tool and returns the
/// number of distinct edges it covers. Seeds are taken as-is, no name
/// filtering: the directory exists solely to hold them.
async fn seed_baseline(showmap: &ResolvedShowmap, dir: &str) -> AppResult<u64> {
    let runner = ShowmapRunner::new(showmap, "main");
    let listing = fs::read_dir(dir)
        .map_err(|e| AppError::Custom(format!("cannot read seeds dir {dir}: {e}")))?;

    let mut edges: HashSet<EdgeId> = HashSet::new();
    let mut seeds = 0usize;
    for dirent in listing {
        let path = dirent
            .map_err(|e| AppError::Custom(format!("cannot read seeds dir {dir}: {e}")))?
            .path();
        if !path.is_file() {
            continue;
        }
        seeds += 1;
        match runner.observe(&path).await {
            Ok(hits) => edges.extend(hits.iter().map(|&(edge, _)| edge)),
            Err(e) => warn!("No baseline coverage for {}: {e}", path.display()),
        }
    }

    info!("{seeds} seeds cover {} edges", edges.len());
    Ok(edges.len() as u64)
}
