#![allow(dead_code)]

use nm_bridge::{config::Config, storage::Storage};
use serde_json::{Map, Value};
use std::{
    cell::Cell,
    collections::HashMap,
    env,
    io::{self, Read},
    path::Path,
};
use tempfile::TempDir;

/// Byte reader that returns data in fixed-size chunks to simulate pipe fragmentation.
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        assert!(chunk > 0);
        Self {
            data,
            pos: 0,
            chunk,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Frame `body` by hand, independent of the crate's encoder.
pub fn raw_frame(body: &[u8]) -> Vec<u8> {
    let mut v = (body.len() as u32).to_le_bytes().to_vec();
    v.extend_from_slice(body);
    v
}

pub fn obj(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}

/// Storage that refuses everything and counts how often it was asked.
#[derive(Default)]
pub struct FailingStorage {
    pub calls: Cell<usize>,
}

impl FailingStorage {
    fn refuse(&self) -> io::Result<()> {
        self.calls.set(self.calls.get() + 1);
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "no access"))
    }
}

impl Storage for FailingStorage {
    fn init_dir(&self, _dir: &Path) -> io::Result<()> {
        self.refuse()
    }

    fn append(&self, _path: &Path, _bytes: &[u8]) -> io::Result<()> {
        self.refuse()
    }

    fn write(&self, _path: &Path, _bytes: &[u8]) -> io::Result<()> {
        self.refuse()
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        self.refuse()
    }
}

/// Config rooted in a temp dir: secret at `<root>/secret`, output under
/// `<root>/out`, port 9999.
pub fn test_config(root: &Path) -> Config {
    Config {
        port: 9999,
        secret_path: root.join("secret"),
        output_dir: root.join("out"),
        max_message_len: None,
    }
}

/// Env guard that restores previous env vars on drop.
pub struct EnvGuard {
    old: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, String)]) -> Self {
        let mut old = HashMap::new();
        for (k, v) in vars {
            old.insert((*k).to_string(), env::var(k).ok());
            env::set_var(k, v);
        }
        Self { old }
    }

    pub fn unset(keys: &[&str]) -> Self {
        let mut old = HashMap::new();
        for k in keys {
            old.insert((*k).to_string(), env::var(k).ok());
            env::remove_var(k);
        }
        Self { old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, prev) in self.old.drain() {
            match prev {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
    }
}

/// Temp dir standing in for every base directory `install::manifest_dir`
/// reads (`HOME` on Unix, `LOCALAPPDATA`/`PROGRAMDATA` on Windows).
pub fn sandbox_env() -> (TempDir, EnvGuard) {
    let td = TempDir::new().expect("tempdir");
    let vars: Vec<(&str, String)> = ["HOME", "LOCALAPPDATA", "PROGRAMDATA"]
        .into_iter()
        .map(|k| {
            let dir = td.path().join(k.to_ascii_lowercase());
            std::fs::create_dir_all(&dir).unwrap();
            (k, dir.to_string_lossy().into_owned())
        })
        .collect();
    let guard = EnvGuard::set(&vars);
    (td, guard)
}
