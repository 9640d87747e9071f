//! Where the bootstrap token comes from.

use std::{fs, io, path::PathBuf};

/// A single-value secret store, read on demand.
pub trait SecretSource {
    fn read_secret(&self) -> io::Result<String>;
}

/// Token kept in a file. The file is read on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct FileSecret {
    path: PathBuf,
}

impl FileSecret {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretSource for FileSecret {
    fn read_secret(&self) -> io::Result<String> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(raw.trim_end().to_string())
    }
}

/// Fixed in-memory secret.
impl SecretSource for String {
    fn read_secret(&self) -> io::Result<String> {
        Ok(self.clone())
    }
}
