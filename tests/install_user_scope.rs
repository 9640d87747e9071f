#![cfg(feature = "install")]

mod common;

use nm_bridge::install::{install, manifest_path, remove, verify_installed, Browser, Scope};
use nm_bridge::error::InstallError;
use serial_test::serial;
use std::path::{Path, PathBuf};

fn dummy_exe_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/usr/local/bin/nm-bridge-host")
    }
    #[cfg(windows)]
    {
        PathBuf::from(r"C:\Program Files\nm-bridge\nm-bridge-host.exe")
    }
}

#[test]
#[serial]
fn install_verify_remove_user_scope() {
    let (_td, _env) = common::sandbox_env();

    let host = "com.example.bridge";
    let browsers = [Browser::Chrome, Browser::Firefox, Browser::Edge];
    let origin = "chrome-extension://aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa/".to_string();
    let addon = "bridge@example.org".to_string();

    assert!(!verify_installed(host, Some(&browsers[..]), Scope::User).unwrap());

    install(
        host,
        "test host",
        &dummy_exe_path(),
        &[origin.clone()],
        &[addon.clone()],
        &browsers,
        Scope::User,
    )
    .expect("install");

    for b in browsers {
        let p = manifest_path(b, Scope::User, host).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&p).unwrap()).unwrap();
        assert_eq!(v["name"], host);
        assert_eq!(v["type"], "stdio");
        assert_eq!(v["path"], &*dummy_exe_path().to_string_lossy());
        if b == Browser::Firefox {
            assert_eq!(v["allowed_extensions"][0], &*addon);
            assert!(v.get("allowed_origins").is_none());
        } else {
            assert_eq!(v["allowed_origins"][0], &*origin);
            assert!(v.get("allowed_extensions").is_none());
        }
    }

    assert!(verify_installed(host, Some(&browsers[..]), Scope::User).unwrap());
    // Not installed for Brave.
    assert!(!verify_installed(host, Some(&[Browser::Brave][..]), Scope::User).unwrap());

    remove(host, &browsers, Scope::User).expect("remove");
    assert!(!verify_installed(host, Some(&browsers[..]), Scope::User).unwrap());
    // Removing again is harmless.
    remove(host, &browsers, Scope::User).expect("second remove");
}

#[test]
#[serial]
#[cfg(unix)]
fn manifests_land_under_sandboxed_home() {
    let (td, _env) = common::sandbox_env();
    let p = manifest_path(Browser::Chrome, Scope::User, "com.example.bridge").unwrap();
    assert!(p.starts_with(td.path().join("home")));
    assert!(p.to_string_lossy().ends_with("com.example.bridge.json"));
}

#[test]
#[serial]
fn install_rejects_relative_exe_path() {
    let (_td, _env) = common::sandbox_env();
    let err = install(
        "com.example.bad",
        "desc",
        Path::new("relative/path/to/host"),
        &[],
        &[],
        &[Browser::Chrome],
        Scope::User,
    )
    .expect_err("relative exe_path must be rejected");
    assert!(matches!(err, InstallError::RelativeExePath(_)));
}

#[test]
fn install_rejects_bad_host_name() {
    let err = install(
        "Com.Example/Host",
        "desc",
        &dummy_exe_path(),
        &[],
        &[],
        &[Browser::Chrome],
        Scope::User,
    )
    .expect_err("host name must be validated");
    assert!(matches!(err, InstallError::InvalidHostName(_)));
}
