use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::core::novelty::EdgeId;
use crate::core::process::{ARTIFACT_PLACEHOLDER, EntryCommand};
use crate::types::config::ResolvedShowmap;

/// Parses a coverage artifact in the `edge_id:hit_count` line format that
/// afl-showmap and compatible tools emit. Lines that do not parse are
/// logged and skipped; whatever remains still counts as an observation.
pub fn parse_coverage(text: &str) -> Vec<(EdgeId, u32)> {
    let mut hits = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(pair) => hits.push(pair),
            None => warn!("Skipping malformed coverage line: {line}"),
        }
    }
    hits
}

fn parse_line(line: &str) -> Option<(EdgeId, u32)> {
    let (edge, count) = line.split_once(':')?;
    Some((edge.trim().parse().ok()?, count.trim().parse().ok()?))
}

/// Drives the coverage tool for one worker. Each worker appends its own
/// label to the configured artifact path, so concurrently analyzed targets
/// never read each other's maps.
#[derive(Debug)]
pub struct ShowmapRunner {
    command: EntryCommand,
    artifact: PathBuf,
}

impl ShowmapRunner {
    pub fn new(showmap: &ResolvedShowmap, label: &str) -> Self {
        let artifact = format!("{}_{}", showmap.output, label);
        let command = EntryCommand::new(
            showmap.command.replace(ARTIFACT_PLACEHOLDER, &artifact),
            showmap.timeout_secs,
        );
        Self {
            command,
            artifact: PathBuf::from(artifact),
        }
    }

    /// Runs the tool on one entry and parses the artifact it wrote. The
    /// tool's exit status is ignored on purpose: showmap exits non-zero for
    /// crashing inputs, and those still produce a usable map.
    pub async fn observe(&self, entry: &Path) -> io::Result<Vec<(EdgeId, u32)>> {
        // Drop any stale artifact so a failed invocation cannot hand us the
        // previous entry's coverage.
        match std::fs::remove_file(&self.artifact) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        self.command.run(entry).await?;
        let text = std::fs::read_to_string(&self.artifact)?;
        Ok(parse_coverage(&text))
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_showmap_lines() {
        let text = "000123:1\n004096:74\n262143:128\n";
        assert_eq!(
            parse_coverage(text),
            vec![(123, 1), (4096, 74), (262143, 128)]
        );
    }

    #[test]
    fn tolerates_blank_lines_and_padding() {
        let text = "\n  17 : 3  \n\n42:1\n";
        assert_eq!(parse_coverage(text), vec![(17, 3), (42, 1)]);
    }

    #[test]
    fn skips_malformed_lines() {
        let text = "garbage\n12:\n:9\nedge:count\n7:2\n-3:1\n8:-1\n";
        assert_eq!(parse_coverage(text), vec![(7, 2)]);
    }

    #[test]
    fn empty_artifact_yields_no_hits() {
        assert!(parse_coverage("").is_empty());
    }

    #[cfg(unix)]
    mod runner {
        use std::io::Write;

        use pretty_assertions::assert_eq;

        use super::super::*;

        fn fake_showmap(dir: &Path) -> PathBuf {
            // Copies the entry (a prebaked artifact) to the artifact path,
            // standing in for the real coverage tool
            let script = dir.join("showmap.sh");
            let mut f = std::fs::File::create(&script).unwrap();
            writeln!(f, "#!/bin/sh\ncp \"$2\" \"$1\"").unwrap();
            script
        }

        #[tokio::test]
        async fn observes_coverage_through_the_artifact() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_showmap(dir.path());
            let entry = dir.path().join("entry");
            std::fs::write(&entry, "5:1\n9:3\n").unwrap();

            let showmap = ResolvedShowmap {
                command: format!("sh {} ## @@", script.display()),
                output: dir.path().join("cov").display().to_string(),
                timeout_secs: Some(5),
            };
            let runner = ShowmapRunner::new(&showmap, "0");
            assert_eq!(runner.artifact(), dir.path().join("cov_0"));

            let hits = runner.observe(&entry).await.unwrap();
            assert_eq!(hits, vec![(5, 1), (9, 3)]);
        }

        #[tokio::test]
        async fn missing_artifact_is_an_error() {
            let dir = tempfile::tempdir().unwrap();
            let entry = dir.path().join("entry");
            std::fs::write(&entry, "").unwrap();

            let showmap = ResolvedShowmap {
                command: "true".to_string(),
                output: dir.path().join("cov").display().to_string(),
                timeout_secs: None,
            };
            let runner = ShowmapRunner::new(&showmap, "0");
            let err = runner.observe(&entry).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }

        #[tokio::test]
        async fn stale_artifacts_are_not_reused() {
            let dir = tempfile::tempdir().unwrap();
            let entry = dir.path().join("entry");
            std::fs::write(&entry, "").unwrap();

            let showmap = ResolvedShowmap {
                command: "true".to_string(),
                output: dir.path().join("cov").display().to_string(),
                timeout_secs: None,
            };
            let runner = ShowmapRunner::new(&showmap, "7");
            std::fs::write(runner.artifact(), "1:1\n").unwrap();

            // The tool writes nothing, so the leftover map must not count
            let err = runner.observe(&entry).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }
    }
}
