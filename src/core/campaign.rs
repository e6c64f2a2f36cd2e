use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::error;
use tokio::task::JoinSet;

use crate::core::worker::{TargetJob, run_target};
use crate::types::TargetReport;

#[derive(Debug)]
pub struct CampaignReport {
    /// Reports keyed (and therefore ordered) by target name.
    pub targets: BTreeMap<String, TargetReport>,
    pub interrupted: bool,
}

/// Runs every target job on its own task and merges whatever succeeds.
/// A failing target is logged and dropped; the campaign carries on with
/// the rest.
pub async fn run_campaign(jobs: Vec<TargetJob>, running: Arc<AtomicBool>) -> CampaignReport {
    let mut tasks = JoinSet::new();
    for job in jobs {
        tasks.spawn(run_target(job));
    }

    let mut targets = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(report)) => {
                targets.insert(report.name.clone(), report);
            }
            Ok(Err(e)) => error!("{e}"),
            Err(e) => error!("worker task failed: {e}"),
        }
    }

    CampaignReport {
        targets,
        interrupted: !running.load(Ordering::SeqCst),
    }
}

/// One progress bar per target, stacked under a shared `MultiProgress`.
/// The worker sets the real length once it has scanned the corpus.
pub fn target_progress(multi: &MultiProgress, name: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(0));
    let style = ProgressStyle::with_template("{msg:<24} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(name.to_string());
    bar
}
