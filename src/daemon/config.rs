use super::errors::{Result, ScanError};
use super::vcs::{IncomingCommand, VcsKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_interval() -> u64 { 15 * 60 /* 15 minutes in seconds */ }

/// Per-VCS incoming command overrides, the `[incoming]` table.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct IncomingOverrides {
    pub git: Option<String>,
    pub hg: Option<String>,
    pub bzr: Option<String>,
    pub tf: Option<String>,
}

impl IncomingOverrides {
    fn get(&self, kind: VcsKind) -> Option<&str> {
        let value = match kind {
            VcsKind::Git => &self.git,
            VcsKind::Mercurial => &self.hg,
            VcsKind::Bazaar => &self.bzr,
            VcsKind::TeamFoundation => &self.tf,
        };
        value.as_deref()
    }
}

/// The on-disk TOML config. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory to scan
    pub root: Option<PathBuf>,
    /// Scan interval in seconds
    pub interval: Option<u64>,
    /// Run a single scan and exit
    pub once: Option<bool>,
    #[serde(default)]
    pub incoming: IncomingOverrides,
}

impl FileConfig {
    pub fn load_config(path: &Path) -> Result<FileConfig> {
        let file_text = std::fs::read_to_string(path).map_err(|source| ScanError::Config {
            path: path.display().to_string(),
            source,
        })?;
        let config: FileConfig = toml::from_str(&file_text)?;
        Ok(config)
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub interval: Option<u64>,
    pub once: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub interval: Duration,
    pub once: bool,
    commands: HashMap<VcsKind, IncomingCommand>,
}

impl Config {
    /// Layer defaults, the config file, the environment (through `env`) and
    /// the command line, in that order.
    pub fn resolve<F>(file: FileConfig, env: F, cli: CliOverrides) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = match cli.root.or(file.root) {
            Some(root) => root,
            None => std::env::current_dir()?,
        };

        let interval = cli.interval.or(file.interval).unwrap_or_else(default_interval);
        if interval == 0 {
            return Err(ScanError::InvalidInterval);
        }

        let mut commands = HashMap::new();
        for kind in VcsKind::ALL {
            let from_env = env(kind.env_var()).filter(|value| !value.trim().is_empty());
            let text = from_env
                .as_deref()
                .or_else(|| file.incoming.get(kind).filter(|value| !value.trim().is_empty()))
                .unwrap_or(kind.default_incoming());
            commands.insert(kind, IncomingCommand::parse(text));
        }

        Ok(Config {
            root,
            interval: Duration::from_secs(interval),
            once: cli.once || file.once.unwrap_or(false),
            commands,
        })
    }

    /// Resolve against the real process environment.
    pub fn from_env(file: FileConfig, cli: CliOverrides) -> Result<Config> {
        Self::resolve(file, |name| std::env::var(name).ok(), cli)
    }

    pub fn incoming(&self, kind: VcsKind) -> &IncomingCommand {
        &self.commands[&kind]
    }
}
