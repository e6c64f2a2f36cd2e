use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::types::ConfigError;

pub const CONFIG_FILENAME: &str = "covtrail.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub color: Option<bool>, // None = auto-detect (semantic)
}

impl LogConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn color(&self) -> Option<bool> {
        self.color // None has semantic meaning (auto-detect)
    }

    pub fn to_effective(&self) -> Self {
        Self {
            level: Some(self.level().to_string()),
            color: self.color,
        }
    }
}

/// Coverage tool invocation. `command` is a full command line where `##`
/// stands for the coverage artifact path and `@@` for the corpus entry path.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ShowmapConfig {
    pub command: Option<String>,
    pub output: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ShowmapConfig {
    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    pub fn to_effective(&self) -> Self {
        self.clone()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SeriesConfig {
    pub bucket: Option<String>,
    pub max_span_hours: Option<u32>,
}

impl SeriesConfig {
    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or("hour")
    }

    pub fn max_span_hours(&self) -> u32 {
        self.max_span_hours.unwrap_or(24)
    }

    pub fn to_effective(&self) -> Self {
        Self {
            bucket: Some(self.bucket().to_string()),
            max_span_hours: Some(self.max_span_hours()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EntriesConfig {
    pub patterns: Option<Vec<String>>,
    pub ignore: Option<Vec<String>>,
}

impl EntriesConfig {
    /// File name patterns an entry must fully match. The default covers the
    /// `id:NNNNNN,...` naming AFL-style fuzzers use for queue files.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns
            .clone()
            .unwrap_or_else(|| vec!["id:.*".to_string()])
    }

    pub fn ignore(&self) -> &[String] {
        self.ignore.as_deref().unwrap_or(&[])
    }

    pub fn to_effective(&self) -> Self {
        Self {
            patterns: Some(self.patterns()),
            ignore: Some(self.ignore().to_vec()),
        }
    }
}

/// Crash triage. `command` (with `@@` for the entry path) re-runs an entry
/// to observe the termination signal; the allow/deny lists then decide
/// whether the entry counts as a unique crash.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CrashConfig {
    pub patterns: Option<Vec<String>>,
    pub command: Option<String>,
    pub timeout_secs: Option<u64>,
    pub allow_signals: Option<Vec<i32>>,
    pub deny_signals: Option<Vec<i32>>,
}

impl CrashConfig {
    pub fn allow_signals(&self) -> &[i32] {
        self.allow_signals.as_deref().unwrap_or(&[])
    }

    pub fn deny_signals(&self) -> &[i32] {
        self.deny_signals.as_deref().unwrap_or(&[])
    }

    pub fn to_effective(&self) -> Self {
        Self {
            patterns: self.patterns.clone(),
            command: self.command.clone(),
            timeout_secs: self.timeout_secs,
            allow_signals: Some(self.allow_signals().to_vec()),
            deny_signals: Some(self.deny_signals().to_vec()),
        }
    }
}

/// Real-path counting. An entry counts as a real path unless running it
/// through `command` prints `false_path_pattern` on stdout.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PathsConfig {
    pub command: Option<String>,
    pub timeout_secs: Option<u64>,
    pub false_path_pattern: Option<String>,
}

impl PathsConfig {
    pub fn to_effective(&self) -> Self {
        self.clone()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SeedsConfig {
    pub dir: Option<String>,
}

impl SeedsConfig {
    pub fn to_effective(&self) -> Self {
        self.clone()
    }
}

/// One fuzzing target under analysis. `entry_dirs` accepts glob patterns so
/// a single line can cover parallel fuzzer instances (`findings/t*/queue`).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TargetConfig {
    pub entry_dirs: Vec<String>,
    pub crash_dirs: Option<Vec<String>>,
    pub start_time: Option<i64>,
    pub needs_execution: Option<bool>,
}

impl TargetConfig {
    /// Directories scanned by the crashes command. Falls back to the entry
    /// directories for fuzzers that keep crashes in the main corpus.
    pub fn crash_dirs(&self) -> &[String] {
        self.crash_dirs.as_deref().unwrap_or(&self.entry_dirs)
    }

    pub fn needs_execution(&self) -> bool {
        self.needs_execution.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    // Top-level fields
    pub output_dir: Option<String>,

    // Nested sections
    pub log: Option<LogConfig>,
    pub showmap: Option<ShowmapConfig>,
    pub series: Option<SeriesConfig>,
    pub entries: Option<EntriesConfig>,
    pub crashes: Option<CrashConfig>,
    pub paths: Option<PathsConfig>,
    pub seeds: Option<SeedsConfig>,
    pub targets: Option<BTreeMap<String, TargetConfig>>,
}

impl Config {
    pub fn output_dir(&self) -> &str {
        self.output_dir.as_deref().unwrap_or("covtrail_out")
    }

    pub fn log(&self) -> LogConfig {
        self.log.clone().unwrap_or_default()
    }

    pub fn showmap(&self) -> ShowmapConfig {
        self.showmap.clone().unwrap_or_default()
    }

    pub fn series(&self) -> SeriesConfig {
        self.series.clone().unwrap_or_default()
    }

    pub fn entries(&self) -> EntriesConfig {
        self.entries.clone().unwrap_or_default()
    }

    pub fn crashes(&self) -> CrashConfig {
        self.crashes.clone().unwrap_or_default()
    }

    pub fn paths(&self) -> PathsConfig {
        self.paths.clone().unwrap_or_default()
    }

    pub fn seeds(&self) -> SeedsConfig {
        self.seeds.clone().unwrap_or_default()
    }

    /// Configured targets, name-sorted. Analysis commands refuse to run
    /// without at least one.
    pub fn targets(&self) -> Result<&BTreeMap<String, TargetConfig>, ConfigError> {
        match &self.targets {
            Some(map) if !map.is_empty() => Ok(map),
            _ => Err(ConfigError::NoTargets),
        }
    }

    /// Crash file name patterns; defaults to the entry patterns when the
    /// crashes section does not set its own.
    pub fn crash_patterns(&self) -> Vec<String> {
        self.crashes()
            .patterns
            .unwrap_or_else(|| self.entries().patterns())
    }

    pub fn resolve_output_dir(&self, cli: Option<&str>) -> PathBuf {
        match cli {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(self.output_dir()),
        }
    }

    pub fn resolve_bucket<'a>(&'a self, cli: Option<&'a str>) -> &'a str {
        match cli {
            Some(bucket) if !bucket.trim().is_empty() => bucket,
            _ => self.bucket_or_default(),
        }
    }

    fn bucket_or_default(&self) -> &str {
        match &self.series {
            Some(series) => match &series.bucket {
                Some(bucket) => bucket.as_str(),
                None => "hour",
            },
            None => "hour",
        }
    }

    pub fn resolve_max_span_hours(&self, cli: Option<u32>) -> u32 {
        cli.unwrap_or_else(|| self.series().max_span_hours())
    }

    pub fn resolve_showmap(&self) -> Result<ResolvedShowmap, ConfigError> {
        let showmap = self.showmap();
        let command = showmap
            .command
            .clone()
            .ok_or(ConfigError::MissingField("showmap.command"))?;
        let output = showmap
            .output
            .clone()
            .ok_or(ConfigError::MissingField("showmap.output"))?;
        Ok(ResolvedShowmap {
            command,
            output,
            timeout_secs: showmap.timeout_secs,
        })
    }

    pub fn to_effective(&self) -> Self {
        Self {
            output_dir: Some(self.output_dir().to_string()),
            log: Some(self.log().to_effective()),
            showmap: Some(self.showmap().to_effective()),
            series: Some(self.series().to_effective()),
            entries: Some(self.entries().to_effective()),
            crashes: Some(self.crashes().to_effective()),
            paths: Some(self.paths().to_effective()),
            seeds: Some(self.seeds().to_effective()),
            targets: self.targets.clone(),
        }
    }
}

/// Showmap settings with the required fields checked up front.
#[derive(Debug, Clone)]
pub struct ResolvedShowmap {
    pub command: String,
    pub output: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub log_color: Option<String>, // "on" | "off"
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

/// Load the config file (explicit path, or the nearest `covtrail.toml`
/// walking up from cwd), apply CLI overrides and freeze the result.
/// A file that exists but cannot be read or parsed is a hard error.
pub fn init_with_overrides(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    let mut cfg = Config::default();

    let file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_nearest_config_file(),
    };
    if let Some(path) = file {
        cfg = read_config_file(&path)?;
    }

    // CLI arguments have the highest priority
    apply_cli_overrides(&mut cfg, overrides);

    let _ = CONFIG.set(cfg);
    Ok(())
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_cli_overrides(cfg: &mut Config, overrides: &CliOverrides) {
    let mut log = cfg.log.clone().unwrap_or_default();
    if let Some(level) = &overrides.log_level
        && !level.trim().is_empty()
    {
        log.level = Some(level.trim().to_string());
    }
    if let Some(color_str) = &overrides.log_color {
        match color_str.to_lowercase().as_str() {
            "on" => log.color = Some(true),
            "off" => log.color = Some(false),
            _ => {}
        }
    }
    if overrides.log_level.is_some() || overrides.log_color.is_some() {
        cfg.log = Some(log);
    }
}

fn find_nearest_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

pub fn colors_enabled() -> bool {
    match config().log().color() {
        Some(force) => force,
        None => console::colors_enabled(),
    }
}
