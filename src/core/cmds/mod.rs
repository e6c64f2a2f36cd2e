use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;

use crate::core::campaign::CampaignReport;
use crate::core::cli::AnalysisArgs;
use crate::core::series::SeriesParams;
use crate::types::config::{Config, TargetConfig};
use crate::types::{AnalysisKind, AppError, AppResult, CampaignSummary};

pub mod crashes;
pub mod edges;
pub mod init;
pub mod paths;
pub mod print;

pub use crashes::execute_crashes;
pub use edges::execute_edges;
pub use init::execute_init;
pub use paths::execute_paths;
pub use print::{PrintCommand, execute_print};

/// Settings every analysis command resolves the same way.
pub(crate) struct AnalysisContext {
    pub output_dir: PathBuf,
    pub params: SeriesParams,
}

pub(crate) fn resolve_context(cfg: &Config, args: &AnalysisArgs) -> AppResult<AnalysisContext> {
    let params = SeriesParams::resolve(
        cfg.resolve_bucket(args.bucket.as_deref()),
        cfg.resolve_max_span_hours(args.max_span_hours),
    )?;
    Ok(AnalysisContext {
        output_dir: cfg.resolve_output_dir(args.output_dir.as_deref()),
        params,
    })
}

/// Picks the targets a run covers: all configured ones, or the subset named
/// on the command line. Naming a target the config does not know is an
/// error, not a silent no-op.
pub(crate) fn select_targets(
    cfg: &Config,
    names: &[String],
) -> AppResult<Vec<(String, TargetConfig)>> {
    let configured = cfg.targets()?;
    if names.is_empty() {
        return Ok(configured
            .iter()
            .map(|(name, target)| (name.clone(), target.clone()))
            .collect());
    }

    let mut selected = BTreeMap::new();
    for name in names {
        match configured.get(name) {
            Some(target) => {
                selected.insert(name.clone(), target.clone());
            }
            None => {
                return Err(AppError::Custom(format!(
                    "unknown target '{name}' (not in the config)"
                )));
            }
        }
    }
    Ok(selected.into_iter().collect())
}

pub(crate) fn campaign_summary(
    analysis: AnalysisKind,
    ctx: &AnalysisContext,
    baseline_edges: Option<u64>,
    report: &CampaignReport,
) -> CampaignSummary {
    CampaignSummary {
        analysis,
        generated_at: Utc::now(),
        bucket: ctx.params.granularity.to_string(),
        bin_width_secs: ctx.params.bin_width_secs(),
        max_bin: ctx.params.max_bin(),
        baseline_edges,
        targets: report
            .targets
            .iter()
            .map(|(name, target)| (name.clone(), target.summary.clone()))
            .collect(),
    }
}
