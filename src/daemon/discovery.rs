use super::errors::{Result, ScanError};
use super::vcs::{Repository, VcsKind};
use log::debug;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use walkdir::{DirEntry, FilterEntry, IntoIter, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn is_marker_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .and_then(VcsKind::from_marker)
            .is_some()
}

/// Hidden entries survive the filter only when they are VCS metadata dirs.
fn keep_entry(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !is_hidden(entry) || is_marker_dir(entry)
}

/// Lazy walk over a tree, yielding every VCS metadata directory under it.
pub struct Discovery {
    walker: FilterEntry<IntoIter, fn(&DirEntry) -> bool>,
}

impl Iterator for Discovery {
    type Item = Result<Repository>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(error) => return Some(Err(ScanError::Walk(error))),
            };

            if entry.depth() == 0 || !is_marker_dir(&entry) {
                continue;
            }

            // Never descend into the metadata itself.
            self.walker.skip_current_dir();
            if let Some(repo) = Repository::from_metadata_dir(entry.path()) {
                return Some(Ok(repo));
            }
        }
    }
}

pub fn discover(root: &Path) -> Discovery {
    let keep: fn(&DirEntry) -> bool = keep_entry;
    Discovery {
        walker: WalkDir::new(root).follow_links(false).into_iter().filter_entry(keep),
    }
}

/// Run the walk on a blocking thread, handing results over one at a time.
/// The receiver closes once the walk is done.
pub fn spawn_discovery(root: PathBuf) -> (mpsc::Receiver<Result<Repository>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = task::spawn_blocking(move || {
        debug!("Walking {}", root.display());
        for item in discover(&root) {
            if tx.blocking_send(item).is_err() {
                debug!("Discovery consumer went away, stopping walk of {}", root.display());
                break;
            }
        }
    });

    (rx, handle)
}
