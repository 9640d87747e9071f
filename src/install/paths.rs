//! Where each browser looks for native-messaging host manifests.

use std::{env, fmt, path::PathBuf, str::FromStr};

use crate::error::InstallError;

/// Browsers the installer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Chromium,
    Edge,
    Brave,
    Firefox,
}

impl Browser {
    pub const ALL: [Browser; 5] = [
        Browser::Chrome,
        Browser::Chromium,
        Browser::Edge,
        Browser::Brave,
        Browser::Firefox,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Chromium => "chromium",
            Browser::Edge => "edge",
            Browser::Brave => "brave",
            Browser::Firefox => "firefox",
        }
    }

    /// Firefox takes `allowed_extensions`; everything else `allowed_origins`.
    pub fn is_firefox_family(self) -> bool {
        matches!(self, Browser::Firefox)
    }

    /// HKCU/HKLM subkey under which Windows builds look up the manifest.
    pub fn registry_key(self, host_name: &str) -> String {
        let vendor = match self {
            Browser::Chrome => r"Google\Chrome",
            Browser::Chromium => "Chromium",
            Browser::Edge => r"Microsoft\Edge",
            Browser::Brave => r"BraveSoftware\Brave-Browser",
            Browser::Firefox => "Mozilla",
        };
        format!(r"Software\{vendor}\NativeMessagingHosts\{host_name}")
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Browser {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Browser::ALL
            .into_iter()
            .find(|b| b.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| InstallError::UnknownBrowser(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Current user's profile. No elevation needed.
    User,
    /// Machine-wide. Usually needs root / admin.
    System,
}

impl Scope {
    pub fn label(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::System => "system",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(unix)]
fn home() -> Result<PathBuf, InstallError> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or(InstallError::NoHome)
}

/// Directory holding manifests for `browser` at `scope`.
#[cfg(target_os = "linux")]
pub fn manifest_dir(browser: Browser, scope: Scope) -> Result<PathBuf, InstallError> {
    let rel = match (browser, scope) {
        (Browser::Chrome, Scope::User) => ".config/google-chrome/NativeMessagingHosts",
        (Browser::Chromium, Scope::User) => ".config/chromium/NativeMessagingHosts",
        (Browser::Edge, Scope::User) => ".config/microsoft-edge/NativeMessagingHosts",
        (Browser::Brave, Scope::User) => {
            ".config/BraveSoftware/Brave-Browser/NativeMessagingHosts"
        }
        (Browser::Firefox, Scope::User) => ".mozilla/native-messaging-hosts",
        (Browser::Chrome, Scope::System) => {
            return Ok("/etc/opt/chrome/native-messaging-hosts".into())
        }
        (Browser::Chromium, Scope::System) => {
            return Ok("/etc/chromium/native-messaging-hosts".into())
        }
        (Browser::Edge, Scope::System) => return Ok("/etc/opt/edge/native-messaging-hosts".into()),
        (Browser::Firefox, Scope::System) => {
            return Ok("/usr/lib/mozilla/native-messaging-hosts".into())
        }
        (Browser::Brave, Scope::System) => {
            return Err(InstallError::Unsupported {
                browser: browser.key(),
                scope: scope.label(),
            })
        }
    };
    Ok(home()?.join(rel))
}

#[cfg(target_os = "macos")]
pub fn manifest_dir(browser: Browser, scope: Scope) -> Result<PathBuf, InstallError> {
    let user = match browser {
        Browser::Chrome => "Google/Chrome/NativeMessagingHosts",
        Browser::Chromium => "Chromium/NativeMessagingHosts",
        Browser::Edge => "Microsoft Edge/NativeMessagingHosts",
        Browser::Brave => "BraveSoftware/Brave-Browser/NativeMessagingHosts",
        Browser::Firefox => "Mozilla/NativeMessagingHosts",
    };
    match scope {
        Scope::User => Ok(home()?.join("Library/Application Support").join(user)),
        // Machine-wide locations do not mirror the per-user layout.
        Scope::System => Ok(PathBuf::from(match browser {
            Browser::Chrome => "/Library/Google/Chrome/NativeMessagingHosts",
            Browser::Chromium => "/Library/Application Support/Chromium/NativeMessagingHosts",
            Browser::Edge => "/Library/Microsoft/Edge/NativeMessagingHosts",
            Browser::Brave => "/Library/BraveSoftware/Brave-Browser/NativeMessagingHosts",
            Browser::Firefox => "/Library/Application Support/Mozilla/NativeMessagingHosts",
        })),
    }
}

// Windows browsers find manifests through the registry; the file itself can
// live anywhere, so keep it next to the other per-user app data.
#[cfg(windows)]
pub fn manifest_dir(browser: Browser, scope: Scope) -> Result<PathBuf, InstallError> {
    let (var, fallback) = match scope {
        Scope::User => ("LOCALAPPDATA", r"C:\Users\Default\AppData\Local"),
        Scope::System => ("PROGRAMDATA", r"C:\ProgramData"),
    };
    let base = env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(fallback));
    Ok(base
        .join("nm-bridge")
        .join("NativeMessagingHosts")
        .join(browser.key()))
}

/// Full path of `<host_name>.json` for `browser` at `scope`.
pub fn manifest_path(
    browser: Browser,
    scope: Scope,
    host_name: &str,
) -> Result<PathBuf, InstallError> {
    Ok(manifest_dir(browser, scope)?.join(format!("{host_name}.json")))
}
