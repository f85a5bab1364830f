use super::vcs::Repository;
use log::{debug, info};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

const APP_NAME: &str = "code-notify";

/// Hosts we know a notification command for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
}

impl Platform {
    /// Accepts `std::env::consts::OS` values, plus `darwin`.
    pub fn from_os(os: &str) -> Option<Platform> {
        match os {
            "macos" | "darwin" => Some(Platform::MacOs),
            "linux" => Some(Platform::Linux),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    pub fn current() -> Option<Platform> {
        Self::from_os(std::env::consts::OS)
    }
}

/// Program and arguments for a notification, empty when the platform is
/// unknown.
pub fn notification_args(
    platform: Option<Platform>,
    name: &str,
    count: usize,
    root: &Path,
) -> Vec<String> {
    let title = format!("{name}: incoming changeset(s)");
    let body = format!("{count} changesets upstream\n\nDirectory:\n{}", root.display());

    let head: &[&str] = match platform {
        Some(Platform::MacOs) => &["growlnotify", "-n", APP_NAME, "-m"],
        Some(Platform::Linux) => &["notify-send", "-a", APP_NAME],
        Some(Platform::Windows) => &["growlnotify", "/t:"],
        None => return Vec::new(),
    };

    head.iter()
        .map(|arg| arg.to_string())
        .chain([title, body])
        .collect()
}

pub trait Notifier: Send + Sync {
    fn notify(&self, repo: &Repository, count: usize);
}

/// Posts notifications through the host's notification program.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    platform: Option<Platform>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self { platform: Platform::current() }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, repo: &Repository, count: usize) {
        let args = notification_args(self.platform, &repo.name(), count, &repo.root);
        let Some((program, rest)) = args.split_first() else {
            debug!("No notification command for this platform");
            return;
        };

        if let Err(error) = spawn_detached(program, rest) {
            debug!("Could not run {program}: {error}");
        }
    }
}

/// Start `program` without waiting for it. A reaper thread waits on the
/// child so it never lingers as a zombie.
pub fn spawn_detached(program: &str, args: &[String]) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    thread::Builder::new()
        .name("notify-reaper".to_string())
        .spawn(move || child.wait())
}

/// Notify once when there is something to pull. Returns whether a
/// notification was sent.
pub fn report(notifier: &dyn Notifier, repo: &Repository, count: usize) -> bool {
    if count == 0 {
        debug!("No incoming changes for {}", repo.root.display());
        return false;
    }

    info!(
        "Repository found at {} with {} incoming changes",
        repo.name(),
        count
    );
    notifier.notify(repo, count);
    true
}
