use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// The version-control systems we know how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Mercurial,
    Bazaar,
    TeamFoundation,
}

impl VcsKind {
    pub const ALL: [VcsKind; 4] = [
        VcsKind::Git,
        VcsKind::Mercurial,
        VcsKind::Bazaar,
        VcsKind::TeamFoundation,
    ];

    /// Map a metadata directory name (`.git`, `.hg`, ...) to its kind.
    pub fn from_marker(name: &str) -> Option<VcsKind> {
        Self::ALL.into_iter().find(|kind| kind.marker() == name)
    }

    pub fn marker(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
            VcsKind::Bazaar => ".bzr",
            VcsKind::TeamFoundation => ".tf",
        }
    }

    pub fn binary(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
            VcsKind::Bazaar => "bzr",
            VcsKind::TeamFoundation => "tf",
        }
    }

    /// Environment variable that overrides the incoming command.
    pub fn env_var(self) -> &'static str {
        match self {
            VcsKind::Git => "GIT_INCOMING",
            VcsKind::Mercurial => "HG_INCOMING",
            VcsKind::Bazaar => "BZR_INCOMING",
            VcsKind::TeamFoundation => "TF_INCOMING",
        }
    }

    pub fn default_incoming(self) -> &'static str {
        match self {
            VcsKind::Git => "fetch --quiet && log --format=commit:%h HEAD..@{upstream}",
            VcsKind::Mercurial => "incoming",
            VcsKind::Bazaar => "missing --theirs-only",
            VcsKind::TeamFoundation => {
                "history . /recursive /noprompt /format:detailed /version:W~T"
            }
        }
    }

    /// `hg incoming` exits 1 when there is nothing to pull and `bzr missing`
    /// exits 1 when there is, so both accept it.
    pub fn accepts_exit_code(self, code: i32) -> bool {
        match self {
            VcsKind::Mercurial | VcsKind::Bazaar => code == 0 || code == 1,
            VcsKind::Git | VcsKind::TeamFoundation => code == 0,
        }
    }

    /// Entries the incoming command prints even when nothing is pending.
    /// TF version ranges are inclusive, so `W~T` always lists the
    /// workspace's own changeset.
    pub fn baseline_entries(self) -> usize {
        match self {
            VcsKind::TeamFoundation => 1,
            VcsKind::Git | VcsKind::Mercurial | VcsKind::Bazaar => 0,
        }
    }

    /// Pattern counted once per incoming changeset.
    pub fn marker_pattern(self) -> &'static Regex {
        static COMMIT: OnceLock<Regex> = OnceLock::new();
        static CHANGESET: OnceLock<Regex> = OnceLock::new();
        static REVNO: OnceLock<Regex> = OnceLock::new();
        static TF_CHANGESET: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            VcsKind::Git => (&COMMIT, r"\bcommit\b"),
            VcsKind::Mercurial => (&CHANGESET, r"\bchangeset\b"),
            VcsKind::Bazaar => (&REVNO, r"\brevno\b"),
            VcsKind::TeamFoundation => (&TF_CHANGESET, r"(?i)\bchangeset\b"),
        };
        cell.get_or_init(|| Regex::new(pattern).expect("marker pattern is valid"))
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// The steps of an incoming command, each one a list of arguments to the
/// kind's binary. Parsed from `"fetch --quiet && log ..."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand {
    steps: Vec<Vec<String>>,
}

impl IncomingCommand {
    pub fn parse(text: &str) -> IncomingCommand {
        let steps = text
            .split("&&")
            .map(|step| step.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|step| !step.is_empty())
            .collect();
        IncomingCommand { steps }
    }

    pub fn steps(&self) -> &[Vec<String>] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A discovered checkout, identified by its metadata directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// The metadata directory itself, e.g. `~/src/foo/.git`
    pub metadata_dir: PathBuf,
    /// The checkout the metadata belongs to
    pub root: PathBuf,
    pub kind: VcsKind,
}

impl Repository {
    /// Returns `None` when the directory name is not a known marker.
    pub fn from_metadata_dir(path: &Path) -> Option<Repository> {
        let kind = VcsKind::from_marker(path.file_name()?.to_str()?)?;
        let root = path.parent()?.to_path_buf();
        Some(Repository {
            metadata_dir: path.to_path_buf(),
            root,
            kind,
        })
    }

    /// Base name of the checkout, used in notifications.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_map_back_to_their_kind() {
        for kind in VcsKind::ALL {
            assert_eq!(VcsKind::from_marker(kind.marker()), Some(kind));
        }
        assert_eq!(VcsKind::from_marker(".svn"), None);
        assert_eq!(VcsKind::from_marker("git"), None);
    }

    #[test]
    fn parse_splits_steps_and_args() {
        let cmd = IncomingCommand::parse("fetch --quiet && log HEAD..@{upstream}");
        assert_eq!(
            cmd.steps(),
            &[
                vec!["fetch".to_string(), "--quiet".to_string()],
                vec!["log".to_string(), "HEAD..@{upstream}".to_string()],
            ]
        );
    }

    #[test]
    fn parse_drops_empty_steps() {
        let cmd = IncomingCommand::parse("  && incoming &&  ");
        assert_eq!(cmd.steps(), &[vec!["incoming".to_string()]]);
        assert!(IncomingCommand::parse("   ").is_empty());
    }

    #[test]
    fn defaults_parse_to_non_empty_commands() {
        for kind in VcsKind::ALL {
            assert!(!IncomingCommand::parse(kind.default_incoming()).is_empty());
        }
    }

    #[test]
    fn exit_codes_per_kind() {
        assert!(VcsKind::Git.accepts_exit_code(0));
        assert!(!VcsKind::Git.accepts_exit_code(1));
        assert!(VcsKind::Mercurial.accepts_exit_code(1));
        assert!(VcsKind::Bazaar.accepts_exit_code(1));
        assert!(!VcsKind::Bazaar.accepts_exit_code(3));
        assert!(!VcsKind::TeamFoundation.accepts_exit_code(1));
    }

    #[test]
    fn only_tf_lists_a_baseline_entry() {
        assert_eq!(VcsKind::TeamFoundation.baseline_entries(), 1);
        assert_eq!(VcsKind::Git.baseline_entries(), 0);
        assert_eq!(VcsKind::Mercurial.baseline_entries(), 0);
        assert_eq!(VcsKind::Bazaar.baseline_entries(), 0);
    }

    #[test]
    fn repository_derives_root_and_name() {
        let repo = Repository::from_metadata_dir(Path::new("/home/me/src/widget/.hg")).unwrap();
        assert_eq!(repo.kind, VcsKind::Mercurial);
        assert_eq!(repo.root, PathBuf::from("/home/me/src/widget"));
        assert_eq!(repo.name(), "widget");
    }

    #[test]
    fn repository_rejects_unknown_marker() {
        assert!(Repository::from_metadata_dir(Path::new("/src/widget/.idea")).is_none());
    }
}
