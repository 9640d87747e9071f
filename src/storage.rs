//! Output storage used by the file-writing handlers.
//!
//! Only handlers that actually write call [`Storage::init_dir`]. Token
//! requests never touch this trait.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

pub trait Storage {
    /// Make sure `dir` exists (creating parents as needed).
    fn init_dir(&self, dir: &Path) -> io::Result<()>;

    /// Append `bytes` to `path`, creating the file if needed.
    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Create or truncate `path` and write `bytes`.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn init_dir(&self, dir: &Path) -> io::Result<()> {
        (**self).init_dir(dir)
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).append(path, bytes)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write(path, bytes)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        (**self).remove(path)
    }
}

/// `std::fs` backed storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn init_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        f.write_all(bytes)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
