use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::{debug, info};

use super::paths::{manifest_path, Browser, Scope};
use crate::error::InstallError;

/// A native-messaging host manifest as browsers read it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
}

impl Manifest {
    /// Manifest for one browser: only the allow-list that family understands.
    pub fn for_browser(
        browser: Browser,
        name: &str,
        description: &str,
        exe_path: &Path,
        allowed_origins: &[String],
        allowed_extensions: &[String],
    ) -> Self {
        let (origins, extensions) = if browser.is_firefox_family() {
            (None, Some(allowed_extensions.to_vec()))
        } else {
            (Some(allowed_origins.to_vec()), None)
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            path: exe_path.to_string_lossy().into_owned(),
            kind: "stdio".to_string(),
            allowed_origins: origins,
            allowed_extensions: extensions,
        }
    }
}

/// Browsers accept lowercase alphanumerics, `_` and `.` (no leading/trailing
/// or doubled dots).
fn check_host_name(name: &str) -> Result<(), InstallError> {
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.');
    let dots_ok = !name.starts_with('.') && !name.ends_with('.') && !name.contains("..");
    if name.is_empty() || !chars_ok || !dots_ok {
        return Err(InstallError::InvalidHostName(name.to_string()));
    }
    Ok(())
}

/// Installs the manifest for each of `browsers`.
///
/// # Examples
///
/// ```no_run
/// use nm_bridge::install::{install, Browser, Scope};
/// use std::path::Path;
///
/// install(
///     "com.example.bridge",
///     "Example bridge host",
///     Path::new("/usr/local/bin/nm-bridge-host"),
///     &["chrome-extension://aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/".to_string()],
///     &["bridge@example.org".to_string()],
///     &[Browser::Chrome, Browser::Firefox],
///     Scope::User,
/// )
/// .expect("install failed");
/// ```
pub fn install(
    name: &str,
    description: &str,
    exe_path: &Path,
    allowed_origins: &[String],
    allowed_extensions: &[String],
    browsers: &[Browser],
    scope: Scope,
) -> Result<(), InstallError> {
    check_host_name(name)?;
    if !exe_path.is_absolute() {
        return Err(InstallError::RelativeExePath(exe_path.to_path_buf()));
    }

    for &browser in browsers {
        let file = manifest_path(browser, scope, name)?;
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }
        let manifest = Manifest::for_browser(
            browser,
            name,
            description,
            exe_path,
            allowed_origins,
            allowed_extensions,
        );
        fs::write(&file, serde_json::to_string_pretty(&manifest)?)?;
        register(browser, scope, name, &file)?;
        info!(%browser, %scope, path = %file.display(), "manifest installed");
    }
    Ok(())
}

/// True when every browser in `browsers` (all known browsers if `None`) has a
/// manifest for `name` at `scope`. An empty set is never "installed".
pub fn verify_installed(
    name: &str,
    browsers: Option<&[Browser]>,
    scope: Scope,
) -> Result<bool, InstallError> {
    let targets = browsers.unwrap_or(&Browser::ALL);
    if targets.is_empty() {
        return Ok(false);
    }
    for &browser in targets {
        let file = match manifest_path(browser, scope, name) {
            Ok(f) => f,
            Err(InstallError::Unsupported { .. }) if browsers.is_none() => continue,
            Err(e) => return Err(e),
        };
        if !file.is_file() {
            debug!(%browser, path = %file.display(), "manifest missing");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Removes the manifest for each of `browsers`. Already-absent files are fine.
pub fn remove(name: &str, browsers: &[Browser], scope: Scope) -> Result<(), InstallError> {
    for &browser in browsers {
        let file = manifest_path(browser, scope, name)?;
        match fs::remove_file(&file) {
            Ok(()) => info!(%browser, path = %file.display(), "manifest removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        unregister(browser, scope, name)?;
    }
    Ok(())
}

#[cfg(all(windows, feature = "windows-registry"))]
fn register(browser: Browser, scope: Scope, name: &str, file: &Path) -> Result<(), InstallError> {
    super::winreg::write_manifest_key(browser, scope, name, file).map_err(Into::into)
}

#[cfg(not(all(windows, feature = "windows-registry")))]
fn register(_: Browser, _: Scope, _: &str, _: &Path) -> Result<(), InstallError> {
    Ok(())
}

#[cfg(all(windows, feature = "windows-registry"))]
fn unregister(browser: Browser, scope: Scope, name: &str) -> Result<(), InstallError> {
    super::winreg::remove_manifest_key(browser, scope, name).map_err(Into::into)
}

#[cfg(not(all(windows, feature = "windows-registry")))]
fn unregister(_: Browser, _: Scope, _: &str) -> Result<(), InstallError> {
    Ok(())
}
