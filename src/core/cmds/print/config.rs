use log::info;

use crate::types::AppResult;
use crate::types::config::config;

pub async fn execute(format: String) -> AppResult<()> {
    let effective = config().to_effective();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        // Table format
        info!("Effective Configuration:");
        info!("");
        info!("Global:");
        info!("  output_dir: {}", config().output_dir());

        info!("");
        info!("Log:");
        let log = config().log();
        info!("  level: {}", log.level());
        match log.color() {
            Some(true) => info!("  color: on"),
            Some(false) => info!("  color: off"),
            None => info!("  color: auto"),
        }

        info!("");
        info!("Series:");
        let series = config().series();
        info!("  bucket: {}", series.bucket());
        info!("  max_span_hours: {}", series.max_span_hours());

        info!("");
        info!("Showmap:");
        let showmap = config().showmap();
        match &showmap.command {
            Some(command) => info!("  command: {command}"),
            None => info!("  command: (not set)"),
        }
        match &showmap.output {
            Some(output) => info!("  output: {output}"),
            None => info!("  output: (not set)"),
        }
        match showmap.timeout_secs {
            Some(timeout) => info!("  timeout: {timeout}s"),
            None => info!("  timeout: (not set)"),
        }

        info!("");
        info!("Entries:");
        let entries = config().entries();
        info!("  patterns: [{}]", entries.patterns().join(", "));
        if entries.ignore().is_empty() {
            info!("  ignore: []");
        } else {
            info!("  ignore: [{}]", entries.ignore().join(", "));
        }

        info!("");
        info!("Crashes:");
        let crashes = config().crashes();
        info!("  patterns: [{}]", config().crash_patterns().join(", "));
        match &crashes.command {
            Some(command) => info!("  command: {command}"),
            None => info!("  command: (not set; every crash entry is admitted)"),
        }
        if !crashes.allow_signals().is_empty() {
            info!("  allow_signals: {:?}", crashes.allow_signals());
        }
        if !crashes.deny_signals().is_empty() {
            info!("  deny_signals: {:?}", crashes.deny_signals());
        }

        info!("");
        info!("Paths:");
        let paths = config().paths();
        match &paths.command {
            Some(command) => info!("  command: {command}"),
            None => info!("  command: (not set)"),
        }
        match &paths.false_path_pattern {
            Some(pattern) => info!("  false_path_pattern: {pattern}"),
            None => info!("  false_path_pattern: (not set)"),
        }

        info!("");
        info!("Seeds:");
        match &config().seeds().dir {
            Some(dir) => info!("  dir: {dir}"),
            None => info!("  dir: (not set; no baseline subtraction)"),
        }

        info!("");
        info!("Targets:");
        match config().targets() {
            Ok(targets) => {
                for (name, target) in targets {
                    info!("  {name}:");
                    info!("    entry_dirs: [{}]", target.entry_dirs.join(", "));
                    if target.crash_dirs.is_some() {
                        info!("    crash_dirs: [{}]", target.crash_dirs().join(", "));
                    }
                    if let Some(start_time) = target.start_time {
                        info!("    start_time: {start_time}");
                    }
                    if !target.needs_execution() {
                        info!("    needs_execution: false");
                    }
                }
            }
            Err(_) => info!("  (none configured)"),
        }
    }

    Ok(())
}
