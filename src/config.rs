//! Host configuration.
//!
//! Values are resolved once at startup (defaults, then TOML file, then
//! environment) and handed to the dispatcher by value. Handlers never look at
//! the environment themselves, which is what lets tests swap in a temp dir.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::host::frame::MAX_FROM_BROWSER;

/// Port the local HTTP daemon listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 17381;

pub const ENV_CONFIG: &str = "NM_BRIDGE_CONFIG";
pub const ENV_PORT: &str = "NM_BRIDGE_PORT";
pub const ENV_SECRET: &str = "NM_BRIDGE_SECRET";
pub const ENV_OUTPUT_DIR: &str = "NM_BRIDGE_OUTPUT_DIR";

static HOME: Lazy<PathBuf> = Lazy::new(|| {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
});

fn config_home() -> PathBuf {
    HOME.join(".config").join("nm-bridge")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Reported to the extension alongside the token.
    pub port: u16,
    /// File holding the bootstrap token. Read on every request.
    pub secret_path: PathBuf,
    /// Where storage-backed handlers write when a message has no `outputDir`.
    pub output_dir: PathBuf,
    /// Cap on the declared length of incoming frames. `None` disables it.
    pub max_message_len: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            secret_path: config_home().join("secret"),
            output_dir: HOME.join("Downloads").join("nm-bridge"),
            max_message_len: Some(MAX_FROM_BROWSER),
        }
    }
}

/// On-disk shape. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    secret_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    /// `0` disables the cap.
    max_message_len: Option<usize>,
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        env::var_os(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|| config_home().join("config.toml"))
    }

    /// Parse TOML, filling absent keys from [`Config::default`].
    pub fn from_toml_str(s: &str) -> io::Result<Self> {
        let file: FileConfig =
            toml::from_str(s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut cfg = Self::default();
        if let Some(port) = file.port {
            cfg.port = port;
        }
        if let Some(p) = file.secret_path {
            cfg.secret_path = p;
        }
        if let Some(p) = file.output_dir {
            cfg.output_dir = p;
        }
        if let Some(max) = file.max_message_len {
            cfg.max_message_len = (max > 0).then_some(max);
        }
        Ok(cfg)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> io::Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Override fields from `NM_BRIDGE_*` environment variables.
    pub fn apply_env(mut self) -> io::Result<Self> {
        if let Ok(port) = env::var(ENV_PORT) {
            self.port = port.trim().parse().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{ENV_PORT}={port:?}: {e}"),
                )
            })?;
        }
        if let Some(p) = env::var_os(ENV_SECRET) {
            self.secret_path = PathBuf::from(p);
        }
        if let Some(p) = env::var_os(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(p);
        }
        Ok(self)
    }

    /// Defaults, then the file at `path` (or [`Config::default_path`]), then env.
    pub fn resolve(path: Option<&Path>) -> io::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        Self::load(&path)?.apply_env()
    }
}
