use super::config::Config;
use super::errors::{Result, ScanError};
use super::vcs::{IncomingCommand, Repository, VcsKind};
use log::debug;
use std::process::Stdio;
use tokio::process::Command;

/// Number of incoming changesets in the output of an incoming command.
pub fn count_changes(kind: VcsKind, output: &str) -> usize {
    kind.marker_pattern()
        .find_iter(output)
        .count()
        .saturating_sub(kind.baseline_entries())
}

/// Run each step of `command` inside the checkout and return the stdout of
/// the last one. Output is decoded lossily; markers are plain ASCII.
pub async fn run_incoming(repo: &Repository, command: &IncomingCommand) -> Result<String> {
    let binary = repo.kind.binary();
    let mut stdout = String::new();
    if command.is_empty() {
        debug!("No incoming command configured for {}", repo.kind);
    }

    for args in command.steps() {
        let command_line = format!("{binary} {}", args.join(" "));
        debug!("Running `{}` in {}", command_line, repo.root.display());

        let output = Command::new(binary)
            .args(args)
            .current_dir(&repo.root)
            .stdin(Stdio::null())
            .output()
            .await?;

        let accepted = output
            .status
            .code()
            .is_some_and(|code| repo.kind.accepts_exit_code(code));
        if !accepted {
            return Err(ScanError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    }

    Ok(stdout)
}

/// Count incoming changesets for a discovered checkout.
pub async fn check(repo: &Repository, config: &Config) -> Result<usize> {
    let output = run_incoming(repo, config.incoming(repo.kind)).await?;
    Ok(count_changes(repo.kind, &output))
}
