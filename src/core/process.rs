use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Placeholder in command templates for the corpus entry path.
pub const ENTRY_PLACEHOLDER: &str = "@@";
/// Placeholder in command templates for the coverage artifact path.
pub const ARTIFACT_PLACEHOLDER: &str = "##";

/// A command template run once per corpus entry. `@@` is replaced with the
/// entry path at invocation time. The rendered line is split on whitespace
/// and executed directly, no shell is involved, so paths with spaces need a
/// wrapper script.
#[derive(Debug, Clone)]
pub struct EntryCommand {
    template: String,
    timeout: Option<Duration>,
}

impl EntryCommand {
    pub fn new(template: impl Into<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            template: template.into(),
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    /// Runs the command for one entry and captures its output. The exit
    /// status is reported, not checked: crashing targets are business as
    /// usual here.
    pub async fn run(&self, entry: &Path) -> io::Result<Output> {
        let rendered = self
            .template
            .replace(ENTRY_PLACEHOLDER, &entry.to_string_lossy());
        let mut parts = rendered.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty command template")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("command timed out after {}s", limit.as_secs()),
                )),
            },
            None => cmd.output().await,
        }
    }
}

/// Signal that terminated the process, if any.
#[cfg(unix)]
pub fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
