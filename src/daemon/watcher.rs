use super::checker;
use super::config::Config;
use super::discovery::spawn_discovery;
use super::errors::Result;
use super::notifier::{report, Notifier};
use log::{info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Tally of one scan cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub discovered: usize,
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
}

pub async fn start_watching(config: &Config, notifier: &dyn Notifier) -> Result<()> {
    if config.once {
        scan_once(config, notifier).await?;
        return Ok(());
    }

    info!("Execution scheduled every {:?}", config.interval);
    every(config.interval, move || async move {
        if let Err(error) = scan_once(config, notifier).await {
            warn!("scan of {} failed: {error}", config.root.display());
        }
    })
    .await;
    Ok(())
}

/// Run `cycle` now and then once per `period`, forever. A cycle that
/// overruns pushes the schedule back instead of bursting to catch up.
async fn every<F, Fut>(period: Duration, mut cycle: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        cycle().await;
    }
}

/// Walk the tree once and check every checkout found, one at a time.
pub async fn scan_once(config: &Config, notifier: &dyn Notifier) -> Result<ScanSummary> {
    info!("Scanning {} for incoming changesets...", config.root.display());

    let (mut found, walker) = spawn_discovery(config.root.clone());
    let mut summary = ScanSummary::default();

    while let Some(item) = found.recv().await {
        let repo = match item {
            Ok(repo) => repo,
            Err(error) => {
                warn!("walk error under {}: {error}", config.root.display());
                summary.failed += 1;
                continue;
            }
        };

        summary.discovered += 1;
        info!("Found {} repository at {}", repo.kind, repo.metadata_dir.display());

        match checker::check(&repo, config).await {
            Ok(count) => {
                summary.checked += 1;
                if report(notifier, &repo, count) {
                    summary.notified += 1;
                }
            }
            Err(error) => {
                warn!("check failed for {}: {error}", repo.root.display());
                summary.failed += 1;
            }
        }
    }

    walker.await?;
    info!(
        "Scan finished: {} repositories, {} checked, {} with incoming changes, {} failures",
        summary.discovered, summary.checked, summary.notified, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::checker::tests::{git, git_available};
    use crate::daemon::config::{CliOverrides, FileConfig};
    use crate::daemon::notifier::tests::RecordingNotifier;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};

    /// A bare remote, a seed clone for pushing, and `scan/clone` to watch.
    fn upstream_with_clone(tmp: &Path) -> std::path::PathBuf {
        git(tmp, &["init", "--quiet", "--bare", "remote.git"]);
        let remote = tmp.join("remote.git");
        let remote = remote.to_str().unwrap();
        git(tmp, &["clone", "--quiet", remote, "seed"]);
        let seed = tmp.join("seed");
        git(&seed, &["commit", "--quiet", "--allow-empty", "-m", "first"]);
        git(&seed, &["push", "--quiet", "origin", "HEAD:main"]);

        fs::create_dir(tmp.join("scan")).unwrap();
        git(&tmp.join("scan"), &["clone", "--quiet", remote, "clone"]);
        tmp.join("scan")
    }

    fn push_upstream_commit(tmp: &Path, message: &str) {
        let seed = tmp.join("seed");
        git(&seed, &["commit", "--quiet", "--allow-empty", "-m", message]);
        git(&seed, &["push", "--quiet", "origin", "HEAD:main"]);
    }

    fn config_for(root: &Path, env: &'static [(&'static str, &'static str)]) -> Config {
        let lookup = |name: &str| {
            env.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        };
        Config::resolve(
            FileConfig::default(),
            lookup,
            CliOverrides {
                root: Some(root.to_path_buf()),
                once: true,
                ..CliOverrides::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_tree_finds_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("plain/dir")).unwrap();

        let notifier = RecordingNotifier::default();
        let summary = scan_once(&config_for(tmp.path(), &[]), &notifier).await.unwrap();

        assert_eq!(summary, ScanSummary::default());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_checks_are_counted_not_notified() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/.git")).unwrap();
        fs::create_dir_all(tmp.path().join("b/.git")).unwrap();

        let config = config_for(tmp.path(), &[("GIT_INCOMING", "definitely-not-a-git-subcommand")]);
        let notifier = RecordingNotifier::default();
        let summary = scan_once(&config, &notifier).await.unwrap();

        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.notified, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_root_counts_as_a_failure() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("gone"), &[]);

        let summary = scan_once(&config, &RecordingNotifier::default()).await.unwrap();
        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn clone_behind_upstream_is_notified_once() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let scan_root = upstream_with_clone(tmp.path());
        push_upstream_commit(tmp.path(), "second");

        let notifier = RecordingNotifier::default();
        let summary = scan_once(&config_for(&scan_root, &[]), &notifier).await.unwrap();

        assert_eq!(
            summary,
            ScanSummary { discovered: 1, checked: 1, notified: 1, failed: 0 }
        );
        assert_eq!(*notifier.sent.lock().unwrap(), vec![("clone".to_string(), 1)]);
    }

    #[tokio::test]
    async fn up_to_date_clone_sends_nothing() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let scan_root = upstream_with_clone(tmp.path());

        let notifier = RecordingNotifier::default();
        let summary = scan_once(&config_for(&scan_root, &[]), &notifier).await.unwrap();

        assert_eq!(
            summary,
            ScanSummary { discovered: 1, checked: 1, notified: 0, failed: 0 }
        );
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_runs_immediately_then_per_period() {
        let starts = AtomicUsize::new(0);
        let counter = &starts;

        let run = every(Duration::from_secs(60), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timeout(Duration::from_secs(90), run).await.is_err());

        // t=0 and t=60
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_delays_instead_of_bursting() {
        let starts = AtomicUsize::new(0);
        let counter = &starts;

        let run = every(Duration::from_secs(60), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                sleep(Duration::from_secs(150)).await;
            }
        });
        assert!(timeout(Duration::from_secs(250), run).await.is_err());

        // t=0 (runs until 150), t=150, t=210
        assert_eq!(starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn once_mode_returns_after_a_single_scan() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path(), &[]);
        start_watching(&config, &RecordingNotifier::default()).await.unwrap();
    }
}
